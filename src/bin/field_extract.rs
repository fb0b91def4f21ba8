//! field-extract binary entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use field_extract::tables::load_table;
use field_extract::{BatchItem, BatchRunner, CsvSink, EngineConfig, HtmlFileSource, RecordStatus};

const DEFAULT_OUTPUT: &str = "Eligibility_Results.csv";

/// Extract eligibility fields from saved result pages into a CSV file
#[derive(Debug, Parser)]
#[command(name = "field-extract", version)]
struct Cli {
    /// Built-in table (noridian, uhc) or path to a JSON spec table
    #[arg(short, long)]
    table: Option<String>,

    /// CSV file rewritten after every record
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// JSON engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Readiness timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Log every strategy attempt
    #[arg(short, long)]
    verbose: bool,

    /// HTML snapshots, processed in order
    #[arg(required = true)]
    snapshots: Vec<PathBuf>,
}

/// `--timeout` seconds; negative, non-finite and overflowing values are
/// rejected instead of panicking
fn timeout_from_secs(secs: f64) -> anyhow::Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) => Ok(timeout),
        Err(e) => bail!("--timeout {secs} is not a usable number of seconds: {e}"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("field_extract=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    // Flags win over the config file
    if let Some(secs) = cli.timeout {
        config.readiness = config.readiness.with_timeout(timeout_from_secs(secs)?);
    }
    let table_arg = cli
        .table
        .or(config.table.clone())
        .context("no table given (use --table or set \"table\" in the config)")?;
    let output = cli
        .out
        .or(config.output.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let table = load_table(&table_arg).with_context(|| format!("loading table {table_arg}"))?;

    let items = cli.snapshots.iter().map(|path| {
        BatchItem::new(path.display().to_string(), HtmlFileSource::new(path))
            .with_context("Snapshot", path.display().to_string())
    });

    let mut sink = CsvSink::new(&output, table.columns());
    let summary = BatchRunner::new(&table, config.readiness.clone())
        .run(items, &mut sink)
        .with_context(|| format!("writing {}", output.display()))?;

    for outcome in &summary.outcomes {
        if let RecordStatus::Failed(e) = &outcome.status {
            eprintln!("{}: {}", outcome.id, e);
        }
    }
    println!("{summary}");
    println!("Results saved to {}", output.display());
    Ok(())
}
