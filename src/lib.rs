//! # Latency Rollup Library
//!
//! Windowed aggregation of load-test results. Normalized request samples
//! are grouped into time buckets at several resolutions for charting, and
//! rolled up into overall and per-operation summaries with exact percentile
//! latencies for reporting.
//!
//! ## Architecture Overview
//!
//! The library is organized into several key modules:
//!
//! - `sample`: Normalized sample record and the fixed set of bucket granularities
//! - `stats`: Latency summary calculator (mean, min, max, interpolated percentiles)
//! - `counter`: Running counters behind the overall and per-label summaries
//! - `window`: Window builder that buckets samples at one granularity
//! - `aggregator`: Multi-granularity orchestration and summary accessors
//! - `input`: Loader for normalized sample files
//! - `results`: Publishable rows, batching and report output
//! - `utils`: Formatting, validation and table helpers
//!
//! ## Usage Example
//!
//! ```rust
//! use latency_rollup::{aggregate, AggregationConfig, Sample};
//!
//! # fn main() -> Result<(), latency_rollup::AggregationError> {
//! let samples = vec![
//!     Sample::new(1000, 10, "login"),
//!     Sample::new(1001, 20, "search"),
//!     Sample::new(1006, 30, "login"),
//! ];
//!
//! let report = aggregate(&samples, &AggregationConfig::default())?;
//! assert_eq!(report.overall.total_requests, 3);
//! assert_eq!(report.by_label["login"].total_requests, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Counting Once
//!
//! Every granularity pass walks the same samples, but the summary counters
//! only accept the first pass. Overall and per-label totals are identical
//! whether one granularity or all five are configured.

/// Multi-granularity orchestration
///
/// Runs one counting pass followed by bucketing-only passes and exposes the
/// overall and per-label summaries of the run.
pub mod aggregator;

/// Command-line interface
pub mod cli;

/// Running counters for summary statistics
pub mod counter;

/// Normalized sample loading
///
/// Reads JSON or JSON-lines sample files, enforces the file size limit and
/// orders samples by timestamp.
pub mod input;

/// Console log formatting and subscriber setup
pub mod logging;

/// Report rows, batching and output
///
/// Flattens buckets and summaries into the publishable row layout, splits
/// chart rows into fixed-size batches and writes the JSON report.
pub mod results;

/// Samples and granularities
pub mod sample;

/// Latency statistics
pub mod stats;

pub mod utils;

/// Time-bucket construction at a single granularity
pub mod window;

pub use aggregator::{aggregate, AggregationConfig, AggregationError, AggregationReport, Aggregator};
pub use counter::{CounterSet, MetricSummary, RunningCounter};
pub use sample::{AnchorMode, FloorMode, Granularity, Sample};
pub use stats::{LatencySummary, StatsError};
pub use window::{GroupedResult, MetricDataPoint, WindowBuilder};

/// The current version of the tool, recorded in report metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Chart rows per published batch
    pub const BATCH_SIZE: usize = 500;

    /// Default report file name
    pub const OUTPUT_FILE: &str = "rollup_report.json";

    /// Scenario name used when none is given
    pub const SCENARIO_NAME: &str = "unnamed";

    /// Published operation name for samples whose label is empty. The empty
    /// name is reserved for rows covering every label.
    pub const UNLABELED_OPERATION: &str = "(unlabeled)";

    /// Largest sample file accepted by the loader, in bytes (100 MB)
    pub const MAX_FILE_SIZE: u64 = 1000 * 1000 * 100;
}
