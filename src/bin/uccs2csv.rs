use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uccs_tables::{
    CsvTableDir, ExtractWarning, ExtractionReport, PageSelection, PdfSource, PipelineOptions,
    consolidate, extract_to_sink, normalize_tables, process_documents,
};

#[derive(Debug, Parser)]
#[command(
    name = "uccs2csv",
    version,
    about = "Extract consumer confidence survey tables from PDFs into a long-format CSV dataset"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the titled tables of one PDF into a directory of CSV tables.
    Extract(ExtractArgs),
    /// Normalize one or more extracted table directories into a dataset CSV.
    Consolidate(ConsolidateArgs),
    /// Extract and normalize PDFs in one go, writing the dataset CSV.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Minimum cells required per candidate table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// Output delimiter character for the dataset CSV.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the extracted tables.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct ConsolidateArgs {
    /// Extracted table directory. Repeatable; processed in the given order.
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Output dataset CSV path.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Input PDF path. Repeatable; processed in the given order.
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Output dataset CSV path.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn parse_options(args: &CommonArgs) -> Result<PipelineOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    Ok(PipelineOptions {
        pages,
        min_cols: args.min_cols,
        delimiter: u8::try_from(args.delimiter).context("delimiter must be ASCII")?,
        ..PipelineOptions::default()
    })
}

fn log_warnings(source: &Path, warnings: &[ExtractWarning], verbose: bool) {
    if warnings.is_empty() {
        return;
    }

    eprintln!(
        "warning: {} issue(s) detected in '{}'",
        warnings.len(),
        source.display()
    );
    if verbose {
        for warning in warnings {
            eprintln!(
                "  - {:?} page={:?} table={:?}: {}",
                warning.code, warning.page, warning.table, warning.message
            );
        }
    }
}

fn run_extract(args: &ExtractArgs) -> Result<usize> {
    let options = parse_options(&args.common)?;
    let mut sink = CsvTableDir::create(&args.output)
        .with_context(|| format!("failed to create '{}'", args.output.display()))?;
    let report: ExtractionReport =
        extract_to_sink(&PdfSource::Path(&args.input), &mut sink, &options)
            .with_context(|| format!("failed to extract tables from '{}'", args.input.display()))?;

    log_warnings(&args.input, &report.warnings, args.common.verbose);
    Ok(report.row_count)
}

fn run_consolidate(args: &ConsolidateArgs) -> Result<usize> {
    let options = parse_options(&args.common)?;
    let mut parts = Vec::new();

    for input in &args.inputs {
        let source = CsvTableDir::open(input)
            .with_context(|| format!("failed to open table directory '{}'", input.display()))?;
        let (document_parts, report) = normalize_tables(&source, &options)
            .with_context(|| format!("failed to normalize '{}'", input.display()))?;
        log_warnings(input, &report.warnings, args.common.verbose);
        parts.extend(document_parts);
    }

    let dataset = consolidate(parts);
    dataset
        .write_csv_file(&args.output, options.delimiter)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    Ok(dataset.len())
}

fn run_batch(args: &RunArgs) -> Result<usize> {
    let options = parse_options(&args.common)?;
    let documents = args
        .inputs
        .iter()
        .map(|input| (input.display().to_string(), PdfSource::Path(input)));
    let outcome = process_documents(documents, &options);

    for (label, report) in &outcome.reports {
        log_warnings(Path::new(label), &report.warnings, args.common.verbose);
    }
    for failure in &outcome.failures {
        eprintln!("error: '{}' skipped: {}", failure.source, failure.error);
    }

    outcome
        .dataset
        .write_csv_file(&args.output, options.delimiter)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    Ok(outcome.dataset.len())
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("uccs_tables=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Consolidate(args) => run_consolidate(args),
        Commands::Run(args) => run_batch(args),
    };

    match result {
        Ok(0) => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
