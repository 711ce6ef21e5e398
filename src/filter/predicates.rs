use crate::filter::{BoxedAlignmentFilter, Filter};
use crate::{Alignment, Header, Tag};

/// Removes alignments with the unmapped FLAG bit set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterUnmappedReads;

impl Filter for FilterUnmappedReads {
    fn apply(&self, _header: &mut Header) -> Option<BoxedAlignmentFilter> {
        Some(Box::new(|aln: &mut Alignment| !aln.is_unmapped()))
    }
}

/// Removes alignments that are unmapped by FLAG, or have `POS` 0, or `RNAME` `*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterUnmappedReadsStrict;

impl Filter for FilterUnmappedReadsStrict {
    fn apply(&self, _header: &mut Header) -> Option<BoxedAlignmentFilter> {
        Some(Box::new(|aln: &mut Alignment| {
            !aln.is_unmapped() && aln.pos != 0 && aln.rname != "*"
        }))
    }
}

/// Removes alignments whose CIGAR has anything besides `M` and `S`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterNonExactMappingReads;

const INEXACT_CIGAR_OPS: &[char] = &['I', 'D', 'N', 'H', 'P', 'X', '='];

impl Filter for FilterNonExactMappingReads {
    fn apply(&self, _header: &mut Header) -> Option<BoxedAlignmentFilter> {
        Some(Box::new(|aln: &mut Alignment| {
            !aln.cigar.contains(INEXACT_CIGAR_OPS)
        }))
    }
}

/// Keeps only unique, mismatch-free, gap-free alignments according to the
/// aligner's `X0`, `X1`, `XM`, `XO` and `XG` tags. Missing tags count as failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterNonExactMappingReadsStrict;

const EXACT_MATCH_TAGS: [(Tag, i64); 5] = [
    (Tag::X0, 1),
    (Tag::X1, 0),
    (Tag::XM, 0),
    (Tag::XO, 0),
    (Tag::XG, 0),
];

impl Filter for FilterNonExactMappingReadsStrict {
    fn apply(&self, _header: &mut Header) -> Option<BoxedAlignmentFilter> {
        Some(Box::new(|aln: &mut Alignment| {
            EXACT_MATCH_TAGS.iter().all(|(tag, expected)| {
                aln.tags.get(*tag).and_then(|v| v.as_int()) == Some(*expected)
            })
        }))
    }
}

/// Removes alignments with the duplicate FLAG bit set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterDuplicateReads;

impl Filter for FilterDuplicateReads {
    fn apply(&self, _header: &mut Header) -> Option<BoxedAlignmentFilter> {
        Some(Box::new(|aln: &mut Alignment| !aln.is_duplicate()))
    }
}

/// Header record type that marks a file as carrying optional `sr` records.
pub const OPTIONAL_READS_MARKER: &str = "@sr";

/// Removes alignments tagged `sr`, but only in files that carry the `@sr`
/// header marker. The marker is removed from the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptionalReads;

impl Filter for FilterOptionalReads {
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter> {
        header.remove_user_records(OPTIONAL_READS_MARKER)?;
        Some(Box::new(|aln: &mut Alignment| !aln.tags.contains(Tag::SR)))
    }
}
