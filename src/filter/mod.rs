//! Two-phase filter composition.
//!
//! A [`Filter`] runs once against the shared [`Header`] and may hand back an
//! [`AlignmentFilter`] that decides, per record, whether to keep it. The
//! [`Pipeline`] runs every header phase in order and freezes the collected
//! record filters into a [`RecordFilter`].
//!
//! Any table a record filter reads must be built during the header phase and
//! never mutated afterwards; the record phase may run on many threads at once.

mod annotate;
mod dictionary;
mod predicates;
mod program;

use std::sync::Arc;

use crate::{Alignment, Header, Result};

pub use annotate::{AddOrReplaceReadGroup, AddRefId, RenameChromosomes};
pub use dictionary::ReplaceReferenceSequenceDictionary;
pub use predicates::{
    FilterDuplicateReads, FilterNonExactMappingReads, FilterNonExactMappingReadsStrict,
    FilterOptionalReads, FilterUnmappedReads, FilterUnmappedReadsStrict,
};
pub use program::AddPgLine;

/// Record-phase half of a filter.
///
/// May mutate the alignment it is given; returns `true` to keep it.
pub trait AlignmentFilter: Send + Sync {
    fn keep(&self, aln: &mut Alignment) -> bool;
}

impl<F> AlignmentFilter for F
where
    F: Fn(&mut Alignment) -> bool + Send + Sync,
{
    fn keep(&self, aln: &mut Alignment) -> bool {
        self(aln)
    }
}

pub type BoxedAlignmentFilter = Box<dyn AlignmentFilter>;

/// Header-phase half of a filter.
///
/// Returns `None` when the filter has nothing to do per record.
pub trait Filter {
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter>;
}

impl<F> Filter for F
where
    F: Fn(&mut Header) -> Option<BoxedAlignmentFilter>,
{
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter> {
        self(header)
    }
}

/// Ordered chain of filters.
///
/// # Examples
///
/// ```rust
/// use samsieve::{Alignment, FilterUnmappedReads, Header, Pipeline, RenameChromosomes};
///
/// let mut header = Header::new();
/// header.parse_line("@SQ\tSN:1\tLN:100").unwrap();
///
/// let records = Pipeline::new()
///     .with(FilterUnmappedReads)
///     .with(RenameChromosomes::default())
///     .apply(&mut header);
/// assert_eq!(header.sq[0].get("SN"), Some("chr1"));
///
/// let mut aln: Alignment = "r1\t0\t1\t5\t60\t4M\t*\t0\t0\tACGT\t*".parse().unwrap();
/// assert!(records.keep(&mut aln));
/// assert_eq!(aln.rname, "chr1");
/// ```
#[derive(Default)]
pub struct Pipeline {
    filters: Vec<Box<dyn Filter>>,
}
impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `filter`; its header phase runs after every filter already added.
    ///
    /// # Arguments
    ///
    /// * `filter` - Any [`Filter`], including a closure over `&mut Header`
    pub fn push<F: Filter + 'static>(&mut self, filter: F) {
        self.filters.push(Box::new(filter));
    }

    /// Builder form of [`Pipeline::push`].
    pub fn with<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.push(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs every header phase in order and returns the frozen record phase.
    ///
    /// Consumes the pipeline: each filter sees the header exactly once.
    pub fn apply(self, header: &mut Header) -> RecordFilter {
        let filters: Vec<BoxedAlignmentFilter> = self
            .filters
            .iter()
            .filter_map(|filter| filter.apply(header))
            .collect();
        log::debug!(
            "Header phase done: {} filters, {} with a record phase",
            self.filters.len(),
            filters.len()
        );
        RecordFilter {
            filters: filters.into(),
        }
    }
}

/// Record phase of an applied [`Pipeline`].
///
/// Cheap to clone; clones share the same frozen filters.
#[derive(Clone)]
pub struct RecordFilter {
    filters: Arc<[BoxedAlignmentFilter]>,
}
impl RecordFilter {
    /// Evaluates each record filter in order, stopping at the first rejection.
    ///
    /// Mutations from filters that ran before the rejection stay on the record.
    pub fn keep(&self, aln: &mut Alignment) -> bool {
        self.filters.iter().all(|filter| filter.keep(aln))
    }

    /// Number of filters with a record phase.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filters a fallible alignment stream, passing errors through unchanged.
    pub fn filter_stream<'a, I>(
        &'a self,
        alignments: I,
    ) -> impl Iterator<Item = Result<Alignment>> + 'a
    where
        I: IntoIterator<Item = Result<Alignment>>,
        I::IntoIter: 'a,
    {
        alignments.into_iter().filter_map(move |item| match item {
            Ok(mut aln) => self.keep(&mut aln).then_some(Ok(aln)),
            Err(e) => Some(Err(e)),
        })
    }
}
