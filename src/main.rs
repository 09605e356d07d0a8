use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::fs::File;

use rippled_log_analyzer::analyzer::{LogLoader, Pipeline};
use rippled_log_analyzer::report::Report;

/// Parses rippled ledger build, consensus and validation log lines to
/// calculate local ledger build latency, ledger close latency and UNL
/// validator latencies. Assumes the LedgerConsensus and NetworkOPs components
/// are logging at debug level and LedgerMaster at info level.
#[derive(Parser, Debug)]
#[command(name = "rippled-log-analyzer")]
struct Args {
    /// Path to the node log file
    file: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Ledger close time (seconds) above which a ledger is reported individually
    #[arg(short, long, default_value_t = 10.0)]
    threshold: f64,

    /// Write the raw per-ledger records to this file as JSON
    #[arg(short = 'R', long)]
    raw_output: Option<String>,

    /// Skip the summary report
    #[arg(long)]
    no_report: bool,
}

fn main() -> anyhow::Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("rippled_log_analyzer"), LevelFilter::Debug)
        .init();

    let args = Args::parse();

    let mut loader = LogLoader::new(&args.file)
        .with_context(|| format!("Failed to open log file: {}", args.file))?;

    let mut pipeline = Pipeline::new(args.threshold);
    while let Some(line) = loader
        .next_line()
        .with_context(|| format!("Failed to read log file: {}", args.file))?
    {
        pipeline.process_line(&line);
    }
    let analysis = pipeline.finish();
    info!("Finalized {} ledgers", analysis.records.len());

    if let Some(path) = &args.raw_output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create raw output file: {}", path))?;
        serde_json::to_writer_pretty(file, &analysis.records)
            .context("Failed to serialize raw records")?;
    }

    if !args.no_report {
        info!("Generating statistics");
        let report = Report::build(&analysis);
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        match &args.output {
            Some(path) => std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to: {}", path))?,
            None => println!("{}", json),
        }
    }

    Ok(())
}
