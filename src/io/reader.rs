//! Reader implementations for SAM text.
//!
//! The header is parsed when the reader is built; alignments are then streamed
//! one line at a time through the `Iterator` interface.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use crate::{Alignment, Header, Result, SieveError};

const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
type BoxedReader = BufReader<Box<dyn Read + Send>>;

/// Streaming reader for SAM text.
///
/// # Examples
///
/// ```rust
/// use samsieve::Reader;
/// use std::io::Cursor;
///
/// # fn main() -> samsieve::Result<()> {
/// let text = "@HD\tVN:1.6\tSO:coordinate\n\
///             @SQ\tSN:chr1\tLN:100\n\
///             r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n";
/// let reader = Reader::new(Cursor::new(text))?;
/// assert_eq!(reader.header().sort_order(), Some("coordinate"));
///
/// let records = reader.collect::<samsieve::Result<Vec<_>>>()?;
/// assert_eq!(records[0].pos, 10);
/// # Ok(())
/// # }
/// ```
pub struct Reader<R: BufRead> {
    /// Inner reader providing the data stream
    inner: R,

    /// Header parsed from the leading `@` lines
    header: Header,

    /// Reusable line buffer
    line: String,

    /// First alignment line, read while looking for the end of the header
    pending: Option<String>,

    /// Number of lines consumed so far
    line_no: usize,

    /// Flag indicating end of file has been reached
    eof: bool,
}
impl<R: BufRead> Reader<R> {
    /// Creates a new reader, parsing and validating the header immediately.
    pub fn new(inner: R) -> Result<Self> {
        let mut reader = Self {
            inner,
            header: Header::new(),
            line: String::new(),
            pending: None,
            line_no: 0,
            eof: false,
        };
        reader.read_header()?;
        reader.header.validate()?;
        Ok(reader)
    }

    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        if self.inner.read_line(&mut self.line)? == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.line_no += 1;
        let trimmed = self.line.trim_end_matches(['\n', '\r']).len();
        self.line.truncate(trimmed);
        Ok(true)
    }

    fn read_header(&mut self) -> Result<()> {
        while self.read_line()? {
            if self.line.is_empty() {
                continue;
            }
            if !self.line.starts_with('@') {
                self.pending = Some(std::mem::take(&mut self.line));
                break;
            }
            self.header.parse_line(&self.line)?;
        }
        Ok(())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Hands the header over, e.g. to run a pipeline on it, keeping the stream.
    pub fn take_header(&mut self) -> Header {
        std::mem::take(&mut self.header)
    }

    /// Number of lines consumed so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    fn parse_current(&self, line: &str) -> Result<Alignment> {
        line.parse().map_err(|e| match e {
            SieveError::MalformedRecord(msg) => {
                SieveError::MalformedRecord(format!("line {}: {}", self.line_no, msg))
            }
            other => other,
        })
    }
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Alignment>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.pending.take() {
            return Some(self.parse_current(&line));
        }
        loop {
            if self.eof {
                return None;
            }
            match self.read_line() {
                Ok(true) if self.line.is_empty() => continue,
                Ok(true) => return Some(self.parse_current(&self.line)),
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Reader<BoxedReader> {
    /// Creates a reader from a file path.
    ///
    /// Compressed files (gzip, bgzip, zstd) are decompressed transparently when
    /// the `niffler` feature is enabled.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rdr: Box<dyn Read + Send> = Box::new(File::open(path)?);
        Self::from_boxed(rdr)
    }

    /// Creates a reader from standard input.
    pub fn from_stdin() -> Result<Self> {
        Self::from_boxed(Box::new(std::io::stdin()))
    }

    /// Reads from `path` if given, otherwise from standard input.
    pub fn from_optional_path<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::from_stdin(),
        }
    }

    fn from_boxed(rdr: Box<dyn Read + Send>) -> Result<Self> {
        #[cfg(feature = "niffler")]
        let rdr = niffler::send::get_reader(rdr)?.0;
        Self::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, rdr))
    }
}

/// Reads only the header of a SAM file (or `.dict` sequence dictionary).
///
/// The file is closed before this returns, on success and on error.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Header> {
    let mut reader = Reader::from_path(path)?;
    Ok(reader.take_header())
}
