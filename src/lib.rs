//! # samsieve - Header-Consistent Filtering of SAM Alignment Streams
//!
//! `samsieve` filters and annotates SAM alignment records as they stream through
//! a processing pipeline, while keeping the file header consistent with what
//! happened to the records.
//!
//! ## Filter Model
//!
//! Every filter has two phases:
//!
//! 1. **Header phase** - runs once, in pipeline order, with exclusive write
//!    access to the shared [`Header`]. Later filters see the changes made by
//!    earlier ones.
//! 2. **Record phase** - an optional [`AlignmentFilter`] returned by the header
//!    phase. It runs once per [`Alignment`], may modify it, and decides whether
//!    to keep it. The first filter that rejects a record ends its evaluation.
//!
//! Tables used by the record phase are frozen at the end of the header phase,
//! so records may be filtered on any number of threads.
//!
//! ## Header Consistency
//!
//! - [`ReplaceReferenceSequenceDictionary`] downgrades a `coordinate` sort order
//!   to `unknown` when the new dictionary reorders known references.
//! - [`AddPgLine`] appends to the `@PG` chain with a collision-free `ID`.
//! - [`RenameChromosomes`] prefixes names but never touches `*` or `=`.
//! - [`AddRefId`] annotates each record with its reference index.
//!
//! ## Basic Usage
//!
//! ```rust
//! use samsieve::{
//!     AddPgLine, FilterDuplicateReads, FilterUnmappedReads, HeaderRecord, Pipeline, Reader,
//!     Writer,
//! };
//! use std::io::Cursor;
//!
//! # fn main() -> samsieve::Result<()> {
//! let text = "@HD\tVN:1.6\tSO:coordinate\n\
//!             @SQ\tSN:chr1\tLN:1000\n\
//!             @PG\tID:bwa\tPN:bwa\n\
//!             r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
//!             r2\t1024\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
//!             r3\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII\n";
//!
//! let mut reader = Reader::new(Cursor::new(text))?;
//! let mut header = reader.take_header();
//!
//! let pg: HeaderRecord = [("ID", "samsieve"), ("PN", "samsieve")].into_iter().collect();
//! let records = Pipeline::new()
//!     .with(FilterUnmappedReads)
//!     .with(FilterDuplicateReads)
//!     .with(AddPgLine::new(pg))
//!     .apply(&mut header);
//! assert_eq!(header.pg[1].get("PP"), Some("bwa"));
//!
//! let mut writer = Writer::new(Vec::new(), &header)?;
//! for aln in records.filter_stream(reader) {
//!     writer.write_alignment(&aln?)?;
//! }
//! writer.finish()?;
//! assert_eq!(writer.records_written(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Parallel Record Phase
//!
//! ```rust
//! use samsieve::{Alignment, AddRefId, Header, Pipeline};
//!
//! # fn main() -> samsieve::Result<()> {
//! let mut header = Header::new();
//! header.parse_line("@SQ\tSN:chrA\tLN:10")?;
//! header.parse_line("@SQ\tSN:chrB\tLN:10")?;
//! let records = Pipeline::new().with(AddRefId).apply(&mut header);
//!
//! let alignments: Vec<Alignment> = ["chrB", "chrA", "chrC"]
//!     .iter()
//!     .map(|name| Alignment { rname: name.to_string(), ..Default::default() })
//!     .collect();
//! let kept = records.filter_parallel(alignments, 0)?; // 0 = all available cores
//! let refids: Vec<_> = kept.iter().map(|a| a.refid).collect();
//! assert_eq!(refids, vec![Some(1), Some(0), Some(-1)]);
//! # Ok(())
//! # }
//! ```

mod constructs;
mod error;
mod filter;
mod io;
mod parallel;

pub use constructs::{
    flag, Alignment, Header, HeaderRecord, Tag, TagValue, Tags, SORT_ORDER_COORDINATE,
    SORT_ORDER_UNKNOWN,
};
pub use error::{IntoSieveError, Result, SieveError};
pub use filter::{
    AddOrReplaceReadGroup, AddPgLine, AddRefId, AlignmentFilter, BoxedAlignmentFilter, Filter,
    FilterDuplicateReads, FilterNonExactMappingReads, FilterNonExactMappingReadsStrict,
    FilterOptionalReads, FilterUnmappedReads, FilterUnmappedReadsStrict, Pipeline, RecordFilter,
    RenameChromosomes, ReplaceReferenceSequenceDictionary,
};
pub use io::{
    read_header, split_file_per_chromosome, BoxedWriter, OutputFormat, Reader, Writer,
    UNMAPPED_SUFFIX,
};
pub use parallel::{resolve_threads, ParallelProcessor, BATCH_SIZE};
