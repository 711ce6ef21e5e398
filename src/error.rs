//! Error handling for the samsieve library.
//!
//! This module defines all error types that can occur while reading SAM text,
//! validating header metadata, and running the record phase of a filter pipeline.

use std::error::Error as StdError;
use thiserror::Error;

/// A specialized `Result` type for samsieve operations.
///
/// It's equivalent to `std::result::Result<T, SieveError>`.
///
/// # Examples
///
/// ```rust
/// use samsieve::{Header, Result};
///
/// fn checked_header(text: &str) -> Result<Header> {
///     let mut header = Header::new();
///     for line in text.lines() {
///         header.parse_line(line)?;
///     }
///     header.validate()?;
///     Ok(header)
/// }
///
/// assert!(checked_header("@SQ\tSN:chr1\tLN:10\n@SQ\tSN:chr1\tLN:20").is_err());
/// ```
pub type Result<T> = std::result::Result<T, SieveError>;

/// Error types for samsieve operations.
///
/// Data conditions that the filters handle on their own (missing optional tags,
/// identifier collisions in the program chain, a dictionary that breaks the
/// coordinate sort order) never show up here.
#[derive(Error, Debug)]
pub enum SieveError {
    /// I/O error from the underlying reader or writer.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Compression/decompression error from niffler.
    #[cfg(feature = "niffler")]
    #[error("Niffler error")]
    Niffler(#[from] niffler::Error),

    /// A header line that is not `@XX` followed by `TG:value` fields.
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    /// An alignment line with missing or unparsable mandatory fields.
    #[error("Malformed alignment record: {0}")]
    MalformedRecord(String),

    /// An optional field that is not `TG:TYPE:VALUE`.
    #[error("Invalid optional field: {0}")]
    InvalidTag(String),

    /// A reference sequence entry without an `SN` tag.
    #[error("Reference sequence entry {index} has no SN tag")]
    MissingSequenceName { index: usize },

    /// Two reference sequence entries share the same `SN`.
    #[error("Duplicate reference sequence name: {0}")]
    DuplicateReference(String),

    /// An alignment refers to a sequence that is not in the dictionary.
    #[error("Reference sequence {0} is not in the sequence dictionary")]
    UnknownReference(String),

    /// Output format that this crate does not encode.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// A reference name that cannot be used as part of an output file name.
    #[error("Reference sequence name {0} cannot be used in an output file name")]
    InvalidOutputName(String),

    /// Two split targets would write to the same file.
    #[error("Several outputs would be written to {0}")]
    OutputCollision(String),

    /// A worker thread panicked during the record phase.
    #[error("Worker thread panicked")]
    ThreadPanic,

    /// Error occurred during parallel processing.
    ///
    /// This wraps errors raised by user-defined parallel processors.
    #[error("Processing error: {0}")]
    Process(Box<dyn StdError + Send + Sync>),
}

/// Trait for converting errors into `SieveError::Process` variants.
///
/// # Examples
///
/// ```rust
/// use samsieve::{IntoSieveError, SieveError};
///
/// let err = std::fmt::Error;
/// match err.into_sieve_error() {
///     SieveError::Process(_) => {}
///     _ => unreachable!(),
/// }
/// ```
pub trait IntoSieveError {
    /// Converts the error into a `SieveError`.
    fn into_sieve_error(self) -> SieveError;
}

impl<E> IntoSieveError for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_sieve_error(self) -> SieveError {
        SieveError::Process(self.into())
    }
}
