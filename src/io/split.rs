//! Per-chromosome splitting of an alignment file.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{Reader, Result, SieveError, Writer};

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Sam,
    Bam,
    Cram,
}
impl OutputFormat {
    /// File extension used for outputs of this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Sam => "sam",
            OutputFormat::Bam => "bam",
            OutputFormat::Cram => "cram",
        }
    }

    /// Format implied by a file extension, if it names one.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}
impl FromStr for OutputFormat {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sam" => Ok(OutputFormat::Sam),
            "bam" => Ok(OutputFormat::Bam),
            "cram" => Ok(OutputFormat::Cram),
            other => Err(SieveError::UnsupportedFormat(other.to_string())),
        }
    }
}
impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Name of the file collecting alignments without a reference (`RNAME` `*`).
pub const UNMAPPED_SUFFIX: &str = "unmapped";

fn output_path(dir: &Path, prefix: &str, name: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}-{}.{}", prefix, name, format.extension()))
}

/// One output path per reference, in dictionary order, then the unmapped one.
///
/// Names holding a path separator are rejected, as is any pair of targets
/// that lands on the same file.
fn output_paths<'a>(
    dir: &Path,
    prefix: &str,
    names: impl Iterator<Item = &'a str>,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut seen = HashSet::new();
    for name in names.chain(std::iter::once(UNMAPPED_SUFFIX)) {
        if name.chars().any(std::path::is_separator) {
            return Err(SieveError::InvalidOutputName(name.to_string()));
        }
        let path = output_path(dir, prefix, name, format);
        if !seen.insert(path.clone()) {
            return Err(SieveError::OutputCollision(path.display().to_string()));
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Writes one file per `@SQ` entry into `output_dir`, plus one for unplaced
/// alignments. Every file carries the input header unchanged.
///
/// Only SAM output is encoded; the reference arguments exist for CRAM and are
/// only validated by callers.
///
/// # Errors
///
/// * [`SieveError::UnsupportedFormat`] for BAM or CRAM output
/// * [`SieveError::InvalidOutputName`] if a reference name holds a path separator
/// * [`SieveError::OutputCollision`] if a reference is named like the unmapped output
/// * [`SieveError::UnknownReference`] for an alignment whose `RNAME` is not in `@SQ`
///
/// All names are checked before any file is created.
pub fn split_file_per_chromosome<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
    prefix: &str,
    format: OutputFormat,
    reference_fai: Option<&Path>,
    reference_fasta: Option<&Path>,
) -> Result<()> {
    if format != OutputFormat::Sam {
        return Err(SieveError::UnsupportedFormat(format.to_string()));
    }
    if let Some(path) = reference_fai.or(reference_fasta) {
        log::debug!("Reference {} not needed for {} output", path.display(), format);
    }

    let output_dir = output_dir.as_ref();
    let mut reader = Reader::from_path(input)?;
    let header = reader.header().clone();

    let paths = output_paths(output_dir, prefix, header.reference_names(), format)?;
    let targets: HashMap<&str, usize> = header
        .reference_names()
        .enumerate()
        .map(|(index, name)| (name, index))
        .collect();
    let unmapped = targets.len();
    let mut writers = paths
        .iter()
        .map(|path| Writer::from_path(path, &header))
        .collect::<Result<Vec<Writer<BufWriter<File>>>>>()?;
    log::info!(
        "Splitting into {} files under {}",
        writers.len(),
        output_dir.display()
    );

    for aln in reader.by_ref() {
        let aln = aln?;
        let target = if aln.rname == "*" {
            unmapped
        } else {
            *targets
                .get(aln.rname.as_str())
                .ok_or_else(|| SieveError::UnknownReference(aln.rname.clone()))?
        };
        writers[target].write_alignment(&aln)?;
    }

    for writer in writers.iter_mut() {
        writer.finish()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAM: &str = "@HD\tVN:1.6\tSO:coordinate\n\
                       @SQ\tSN:chr1\tLN:1000\n\
                       @SQ\tSN:chr2\tLN:2000\n\
                       r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                       r2\t0\tchr2\t20\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                       r3\t0\tchr1\t30\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
                       r4\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII\n";

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn names_in(path: &Path) -> (crate::Header, Vec<String>) {
        let reader = Reader::from_path(path).unwrap();
        let header = reader.header().clone();
        let names = reader.map(|a| a.unwrap().qname).collect();
        (header, names)
    }

    #[test]
    fn test_output_format() {
        assert_eq!("bam".parse::<OutputFormat>().unwrap(), OutputFormat::Bam);
        assert!("fastq".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::from_path("x/in.cram"), Some(OutputFormat::Cram));
        assert_eq!(OutputFormat::from_path("x/in.txt"), None);
        assert_eq!(OutputFormat::Sam.to_string(), "sam");
    }

    #[test]
    fn test_split_per_chromosome() {
        let dir = scratch("samsieve_test_split");
        let input = dir.join("in.sam");
        fs::write(&input, SAM).unwrap();

        split_file_per_chromosome(&input, &dir, "out", OutputFormat::Sam, None, None).unwrap();

        let (header, chr1) = names_in(&dir.join("out-chr1.sam"));
        assert_eq!(chr1, vec!["r1", "r3"]);
        let names: Vec<_> = header.reference_names().collect();
        assert_eq!(names, vec!["chr1", "chr2"]);
        assert_eq!(header.sort_order(), Some("coordinate"));

        let (_, chr2) = names_in(&dir.join("out-chr2.sam"));
        assert_eq!(chr2, vec!["r2"]);
        let (_, unmapped) = names_in(&dir.join("out-unmapped.sam"));
        assert_eq!(unmapped, vec!["r4"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_split_unknown_reference() {
        let dir = scratch("samsieve_test_split_unknown");
        let input = dir.join("in.sam");
        fs::write(
            &input,
            "@SQ\tSN:chr1\tLN:1000\nr1\t0\tchrZ\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n",
        )
        .unwrap();

        let result = split_file_per_chromosome(&input, &dir, "out", OutputFormat::Sam, None, None);
        assert!(matches!(result, Err(SieveError::UnknownReference(name)) if name == "chrZ"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_split_rejects_reference_named_unmapped() {
        let dir = scratch("samsieve_test_split_collision");
        let input = dir.join("in.sam");
        fs::write(
            &input,
            "@SQ\tSN:unmapped\tLN:100\n\
             r1\t0\tunmapped\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n\
             r2\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII\n",
        )
        .unwrap();

        let result = split_file_per_chromosome(&input, &dir, "out", OutputFormat::Sam, None, None);
        assert!(matches!(result, Err(SieveError::OutputCollision(path)) if path.ends_with("out-unmapped.sam")));
        assert!(!dir.join("out-unmapped.sam").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_split_rejects_names_with_separators() {
        let dir = scratch("samsieve_test_split_separator");
        let input = dir.join("in.sam");
        fs::write(
            &input,
            "@SQ\tSN:chr1\tLN:100\n@SQ\tSN:../x\tLN:100\n\
             r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII\n",
        )
        .unwrap();

        let result = split_file_per_chromosome(&input, &dir, "out", OutputFormat::Sam, None, None);
        assert!(matches!(result, Err(SieveError::InvalidOutputName(name)) if name == "../x"));
        assert!(!dir.join("out-chr1.sam").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_split_rejects_binary_formats() {
        let result = split_file_per_chromosome(
            "missing.sam",
            "out/",
            "out",
            OutputFormat::Cram,
            None,
            Some(Path::new("ref.fa")),
        );
        assert!(matches!(result, Err(SieveError::UnsupportedFormat(f)) if f == "cram"));
    }
}
