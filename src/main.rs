use std::{
    fs,
    path::{Path, PathBuf, MAIN_SEPARATOR},
    process,
};

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use samsieve::{
    resolve_threads, split_file_per_chromosome, AddOrReplaceReadGroup, AddPgLine, Alignment,
    FilterDuplicateReads, FilterNonExactMappingReads, FilterNonExactMappingReadsStrict,
    FilterOptionalReads, FilterUnmappedReads, FilterUnmappedReadsStrict, HeaderRecord,
    OutputFormat, Pipeline, Reader, RenameChromosomes, ReplaceReferenceSequenceDictionary, Writer,
};

const SPLIT_HELP: &str = "Split parameters:\n\
samsieve split (sam-file | /path/to/input/) /path/to/output/\n\
[--output-prefix name]\n\
[--output-type [sam | bam | cram]]\n\
[--nr-of-threads nr]\n\
[--reference-t fai-file]\n\
[--reference-T fasta-file]\n";

/// Alignments read per parallel batch in `filter`.
const FILTER_BATCH: usize = 256 * 1024;

#[derive(Parser)]
#[command(name = "samsieve", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a SAM file into one file per reference sequence
    Split(SplitArgs),
    /// Filter and annotate a SAM file
    Filter(FilterArgs),
}

#[derive(Args)]
struct SplitArgs {
    /// Input SAM file
    input: PathBuf,
    /// Output directory, ending in a path separator
    output: String,
    /// Prefix for the output files [default: input file stem]
    #[arg(long)]
    output_prefix: Option<String>,
    /// Format of the output files [default: input extension, else sam]
    #[arg(long)]
    output_type: Option<String>,
    /// Accepted for command-line compatibility; has no effect, split runs on one thread
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    nr_of_threads: i64,
    /// .fai file for cram output
    #[arg(long = "reference-t")]
    reference_fai: Option<PathBuf>,
    /// .fasta file for cram output
    #[arg(long = "reference-T")]
    reference_fasta: Option<PathBuf>,
}

#[derive(Args)]
struct FilterArgs {
    /// Input SAM file
    input: PathBuf,
    /// Output SAM file
    output: PathBuf,
    /// Replace the sequence dictionary with the one in this SAM/.dict file
    #[arg(long)]
    replace_reference_sequences: Option<PathBuf>,
    /// Remove alignments flagged as unmapped
    #[arg(long, conflicts_with = "filter_unmapped_reads_strict")]
    filter_unmapped_reads: bool,
    /// Also remove alignments with POS 0 or RNAME *
    #[arg(long)]
    filter_unmapped_reads_strict: bool,
    /// Remove alignments whose CIGAR has operations other than M and S
    #[arg(long)]
    filter_non_exact_mapping_reads: bool,
    /// Keep only alignments with X0=1, X1=0, XM=0, XO=0, XG=0
    #[arg(long)]
    filter_non_exact_mapping_reads_strict: bool,
    /// Remove alignments flagged as duplicates
    #[arg(long)]
    remove_duplicates: bool,
    /// Remove optional `sr` records from marked files
    #[arg(long)]
    remove_optional_reads: bool,
    /// Replace all read groups, e.g. "ID:group1 SM:sample1 PL:illumina"
    #[arg(long)]
    replace_read_group: Option<String>,
    /// Prefix reference names with "chr"
    #[arg(long)]
    rename_chromosomes: bool,
    /// Number of worker threads (0 = all cores)
    #[arg(long, default_value_t = 1)]
    nr_of_threads: usize,
}

fn command_line() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_directory_path(path: &str) -> bool {
    path.ends_with('/') || path.ends_with(MAIN_SEPARATOR)
}

/// CRAM needs exactly one reference; other formats ignore them.
fn check_cram_output_options(
    format: OutputFormat,
    reference_fai: Option<PathBuf>,
    reference_fasta: Option<PathBuf>,
) -> (Option<PathBuf>, Option<PathBuf>, bool) {
    match (format, reference_fai, reference_fasta) {
        (OutputFormat::Cram, None, None) => {
            log::error!("Cram output requires --reference-t or --reference-T");
            (None, None, false)
        }
        (OutputFormat::Cram, Some(_), Some(_)) => {
            log::error!("Specify only one of --reference-t and --reference-T");
            (None, None, false)
        }
        (OutputFormat::Cram, fai, fasta) => (fai, fasta, true),
        (_, None, None) => (None, None, true),
        (format, _, _) => {
            log::warn!("Reference options are ignored for {} output", format);
            (None, None, true)
        }
    }
}

fn split(args: SplitArgs) -> Result<()> {
    let prefix = args
        .output_prefix
        .clone()
        .unwrap_or_else(|| file_stem(&args.input));

    let mut failed = false;

    let format = match args.output_type.as_deref() {
        Some(name) => name.parse::<OutputFormat>().unwrap_or_else(|_| {
            log::error!("Invalid output type: {}", name);
            failed = true;
            OutputFormat::Sam
        }),
        None => OutputFormat::from_path(&args.input).unwrap_or(OutputFormat::Sam),
    };

    let (reference_fai, reference_fasta, ok) =
        check_cram_output_options(format, args.reference_fai, args.reference_fasta);
    failed |= !ok;

    if !is_directory_path(&args.output) {
        log::error!("Given output path is not a path: {}", args.output);
        failed = true;
    }

    if args.nr_of_threads < 0 {
        log::error!("Invalid nr-of-threads: {}", args.nr_of_threads);
        failed = true;
    }

    if failed {
        eprint!("{}", SPLIT_HELP);
        process::exit(1);
    }

    let mut command = format!(
        "samsieve split {} {} --output-prefix {} --output-type {}",
        args.input.display(),
        args.output,
        prefix,
        format
    );
    if args.nr_of_threads > 0 {
        log::warn!("--nr-of-threads has no effect on split");
    }
    if let Some(path) = &reference_fai {
        command.push_str(&format!(" --reference-t {}", path.display()));
    }
    if let Some(path) = &reference_fasta {
        command.push_str(&format!(" --reference-T {}", path.display()));
    }
    log::info!("Executing command:\n {}", command);

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {}", args.output))?;
    split_file_per_chromosome(
        &args.input,
        &args.output,
        &prefix,
        format,
        reference_fai.as_deref(),
        reference_fasta.as_deref(),
    )?;
    Ok(())
}

fn program_record() -> HeaderRecord {
    [
        ("ID", "samsieve".to_string()),
        ("PN", "samsieve".to_string()),
        ("VN", env!("CARGO_PKG_VERSION").to_string()),
        ("CL", command_line()),
    ]
    .into_iter()
    .collect()
}

fn build_pipeline(args: &FilterArgs) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new();
    if let Some(path) = &args.replace_reference_sequences {
        let filter = ReplaceReferenceSequenceDictionary::from_sam_file(path).with_context(|| {
            format!("Failed to read sequence dictionary from {}", path.display())
        })?;
        pipeline.push(filter);
    }
    if args.filter_unmapped_reads {
        pipeline.push(FilterUnmappedReads);
    }
    if args.filter_unmapped_reads_strict {
        pipeline.push(FilterUnmappedReadsStrict);
    }
    if args.filter_non_exact_mapping_reads {
        pipeline.push(FilterNonExactMappingReads);
    }
    if args.filter_non_exact_mapping_reads_strict {
        pipeline.push(FilterNonExactMappingReadsStrict);
    }
    if args.remove_duplicates {
        pipeline.push(FilterDuplicateReads);
    }
    if args.remove_optional_reads {
        pipeline.push(FilterOptionalReads);
    }
    if let Some(text) = &args.replace_read_group {
        let read_group = HeaderRecord::parse(text, ' ')
            .with_context(|| format!("Invalid read group: {}", text))?;
        ensure!(read_group.contains("ID"), "Read group has no ID: {}", text);
        pipeline.push(AddOrReplaceReadGroup::new(read_group));
    }
    if args.rename_chromosomes {
        pipeline.push(RenameChromosomes::default());
    }
    pipeline.push(AddPgLine::new(program_record()));
    Ok(pipeline)
}

fn filter(args: FilterArgs) -> Result<()> {
    let pipeline = build_pipeline(&args)?;
    log::info!("Executing command:\n {}", command_line());

    let mut reader = Reader::from_path(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let mut header = reader.take_header();
    let records = pipeline.apply(&mut header);

    let mut writer = Writer::from_path(&args.output, &header)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let threads = resolve_threads(args.nr_of_threads);
    if threads == 1 {
        for aln in records.filter_stream(reader) {
            writer.write_alignment(&aln?)?;
        }
    } else {
        loop {
            let batch = reader
                .by_ref()
                .take(FILTER_BATCH)
                .collect::<samsieve::Result<Vec<Alignment>>>()?;
            if batch.is_empty() {
                break;
            }
            let kept = records.filter_parallel(batch, threads)?;
            writer.write_batch(&kept)?;
        }
    }
    writer.finish()?;

    log::info!(
        "Wrote {} alignments to {}",
        writer.records_written(),
        args.output.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Split(args) => split(args),
        Commands::Filter(args) => filter(args),
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        process::exit(1);
    }
}
