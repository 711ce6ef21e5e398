//! Writer implementations for SAM text.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{Alignment, Header, Result};

const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
pub type BoxedWriter = Box<dyn Write + Send>;

/// Buffered SAM text writer.
///
/// The header is written on construction; alignments follow one per line.
///
/// # Examples
///
/// ```rust
/// use samsieve::{Alignment, Header, Writer};
///
/// # fn main() -> samsieve::Result<()> {
/// let mut header = Header::new();
/// header.parse_line("@SQ\tSN:chr1\tLN:100")?;
///
/// let mut writer = Writer::new(Vec::new(), &header)?;
/// let aln: Alignment = "r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII".parse()?;
/// writer.write_alignment(&aln)?;
/// writer.finish()?;
/// assert_eq!(writer.records_written(), 1);
///
/// let text = String::from_utf8(writer.into_inner()).unwrap();
/// assert_eq!(text, "@SQ\tSN:chr1\tLN:100\nr1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n");
/// # Ok(())
/// # }
/// ```
pub struct Writer<W: Write> {
    /// Inner writer providing the data sink
    inner: W,

    /// Number of records written so far
    records_written: u64,
}

impl<W: Write> Writer<W> {
    /// Creates a writer and writes `header` to it right away.
    ///
    /// # Arguments
    ///
    /// * `inner` - The sink to write SAM text to
    /// * `header` - Header written before any alignment
    ///
    /// # Errors
    ///
    /// Returns an error if writing the header fails.
    pub fn new(mut inner: W, header: &Header) -> Result<Self> {
        write!(inner, "{}", header)?;
        Ok(Self {
            inner,
            records_written: 0,
        })
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn write_alignment(&mut self, aln: &Alignment) -> Result<()> {
        writeln!(self.inner, "{}", aln)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn write_batch(&mut self, alignments: &[Alignment]) -> Result<()> {
        for aln in alignments {
            self.write_alignment(aln)?;
        }
        Ok(())
    }

    /// Flushes everything written so far to the underlying sink.
    pub fn finish(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl Writer<BufWriter<File>> {
    /// Creates (or truncates) the file at `path` and writes `header` to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or the header cannot be
    /// written.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use samsieve::{Header, Writer};
    ///
    /// # fn main() -> samsieve::Result<()> {
    /// let mut writer = Writer::from_path("filtered.sam", &Header::new())?;
    /// writer.finish()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P, header: &Header) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file), header)
    }
}

impl Writer<BoxedWriter> {
    pub fn from_stdout(header: &Header) -> Result<Self> {
        let out: BoxedWriter = Box::new(BufWriter::new(std::io::stdout()));
        Self::new(out, header)
    }

    /// Writes to `path` if given, otherwise to standard output.
    pub fn from_optional_path<P: AsRef<Path>>(path: Option<P>, header: &Header) -> Result<Self> {
        let out: BoxedWriter = match path {
            Some(path) => Box::new(BufWriter::with_capacity(
                DEFAULT_BUFFER_SIZE,
                File::create(path)?,
            )),
            None => Box::new(BufWriter::new(std::io::stdout())),
        };
        Self::new(out, header)
    }
}
