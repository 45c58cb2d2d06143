//! # Latency Rollup - Main Entry Point
//!
//! Turns a file of normalized load-test samples into a chart and summary
//! report.
//!
//! ## Steps
//!
//! 1. **Initialize logging**: colored console output, optional log file
//! 2. **Parse arguments**: input file, granularities, batch size, output
//! 3. **Load samples**: parse a JTL or JSON results file and order it by time
//! 4. **Aggregate**: one counting pass plus one bucketing pass per extra granularity
//! 5. **Write results**: batched chart rows and summary rows to the JSON report
//!
//! ## Error Handling
//!
//! Every failure propagates as `anyhow::Error` to `main`, which prints the
//! error chain and exits non-zero.

use anyhow::{Context, Result};
use clap::Parser;
use latency_rollup::{
    aggregate,
    cli::Args,
    input, logging,
    results::{self, ResultsManager},
    AggregationConfig,
};
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();

    // The guard flushes the log file on drop, so hold it until exit.
    let _log_guard = logging::init(args.verbose, args.log_file.as_deref())?;

    info!("Starting Latency Rollup {}", latency_rollup::VERSION);
    info!("Configuration: {:?}", args);

    let config = AggregationConfig::from_args(&args);
    config.validate()?;

    // Validate the output settings before doing any work.
    let results_manager =
        ResultsManager::new(&args.output, args.batch_size)?.with_scenario(args.scenario.clone());

    let samples = input::load_samples_as(&args.file, args.format)?;
    if samples.first().map(|s| s.timestamp) == samples.last().map(|s| s.timestamp) {
        warn!("All samples share one timestamp; every granularity yields a single bucket");
    }

    let report = aggregate(&samples, &config)
        .with_context(|| format!("aggregation failed for {}", args.file.display()))?;

    let written = results_manager.finalize(&report, &config)?;
    info!(
        "Published {} chart metric rows in {} batches",
        written.chart_row_count(),
        written.chart_metric_batches.len()
    );
    info!(
        "Published {} summary metric rows",
        written.summary_metrics.len()
    );

    results::print_summary_table(&report);

    info!("Report written to {:?}", results_manager.output_file());
    Ok(())
}
