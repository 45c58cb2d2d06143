//! # Utility Functions and Helper Module
//!
//! This module provides helpers used by the binary and the report writer:
//! formatters for human-readable console output, validation of user-supplied
//! parameters, run identifiers, and simple table printing.
//!
//! ## Key Functionality Categories
//!
//! - **Formatting**: Human-readable display of latencies, durations, and rates
//! - **Validation**: Input parameter validation with clear error messages
//! - **Identification**: Unique run identifiers for reports
//! - **Display Helpers**: Table formatting for the console summary
//!
//! ## Usage Examples
//!
//! ```rust
//! use latency_rollup::utils::*;
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Format latencies for display
//! assert_eq!(format_latency_ms(12.5), "12.50ms");
//!
//! // Format run durations
//! assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
//!
//! // Validate configuration parameters
//! validate_batch_size(500)?; // OK
//! assert!(validate_batch_size(0).is_err());
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::time::Duration;
use uuid::Uuid;

/// Largest accepted publish batch
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Generate a unique identifier for an aggregation run
///
/// Creates a UUID v4 string recorded in the report metadata so that
/// reports written from the same input can still be told apart.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format a latency given in milliseconds
///
/// Sub-second values keep millisecond units with 2 decimal places, longer
/// values switch to seconds, and anything past a minute uses the compound
/// form of [`format_duration`].
///
/// ## Examples
///
/// ```rust
/// # use latency_rollup::utils::format_latency_ms;
/// assert_eq!(format_latency_ms(0.5), "0.50ms");
/// assert_eq!(format_latency_ms(850.0), "850.00ms");
/// assert_eq!(format_latency_ms(1250.0), "1.25s");
/// assert_eq!(format_latency_ms(125_000.0), "2m 5s");
/// ```
pub fn format_latency_ms(latency_ms: f64) -> String {
    if latency_ms < 1_000.0 {
        format!("{:.2}ms", latency_ms)
    } else if latency_ms < 60_000.0 {
        format!("{:.2}s", latency_ms / 1_000.0)
    } else {
        format_duration(Duration::from_millis(latency_ms as u64))
    }
}

/// Format a duration in a human-readable way
///
/// Used for test run lengths, which are measured in whole seconds.
///
/// ## Unit Selection Logic
///
/// - **Seconds**: < 60 seconds (e.g., "45s")
/// - **Minutes**: < 1 hour (e.g., "5m 30s")
/// - **Hours**: longer runs (e.g., "2h 15m 30s")
///
/// ## Examples
///
/// ```rust
/// # use latency_rollup::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_secs(8130)), "2h 15m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let minutes = seconds / 60;
    let remaining_seconds = seconds % 60;

    if minutes == 0 {
        format!("{}s", seconds)
    } else if minutes < 60 {
        format!("{}m {}s", minutes, remaining_seconds)
    } else {
        let hours = minutes / 60;
        let remaining_minutes = minutes % 60;
        format!("{}h {}m {}s", hours, remaining_minutes, remaining_seconds)
    }
}

/// Format a request rate in a human-readable way
///
/// Uses decimal scaling (powers of 1000):
/// - Requests/sec: < 1,000 (e.g., "750 req/s")
/// - Thousands: < 1,000,000 (e.g., "15.50K req/s")
/// - Millions: ≥ 1,000,000 (e.g., "2.30M req/s")
///
/// ## Examples
///
/// ```rust
/// # use latency_rollup::utils::format_request_rate;
/// assert_eq!(format_request_rate(750.0), "750 req/s");
/// assert_eq!(format_request_rate(15500.0), "15.50K req/s");
/// ```
pub fn format_request_rate(requests_per_second: f64) -> String {
    if requests_per_second < 1000.0 {
        format!("{:.0} req/s", requests_per_second)
    } else if requests_per_second < 1_000_000.0 {
        format!("{:.2}K req/s", requests_per_second / 1000.0)
    } else {
        format!("{:.2}M req/s", requests_per_second / 1_000_000.0)
    }
}

/// Average request rate over a run spanning `[started_at, stopped_at]`
///
/// The span is inclusive, so a run whose samples all share one timestamp
/// counts as one second long.
pub fn request_rate(total_requests: u64, started_at: u64, stopped_at: u64) -> f64 {
    let seconds = stopped_at.saturating_sub(started_at) + 1;
    total_requests as f64 / seconds as f64
}

/// Failure percentage, 0.0 when nothing was requested
pub fn error_rate_percent(failures: u64, requests: u64) -> f64 {
    if requests == 0 {
        0.0
    } else {
        failures as f64 * 100.0 / requests as f64
    }
}

/// Validate the number of rows per publish batch
///
/// ## Validation Rules
///
/// - **Minimum**: 1 row (a zero-sized batch would never make progress)
/// - **Maximum**: [`MAX_BATCH_SIZE`] rows to keep request bodies bounded
pub fn validate_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        anyhow::bail!("Batch size cannot be zero");
    }
    if batch_size > MAX_BATCH_SIZE {
        anyhow::bail!(
            "Batch size {} is too large (maximum {})",
            batch_size,
            MAX_BATCH_SIZE
        );
    }
    Ok(())
}

/// Get the number of CPU cores available
///
/// Recorded in report metadata alongside the rest of the system
/// information.
pub fn get_cpu_cores() -> usize {
    num_cpus::get()
}

/// Print a table row with proper formatting
///
/// Columns are left-aligned and padded to the given widths; a missing width
/// defaults to 10 characters.
///
/// ## Examples
///
/// ```rust
/// # use latency_rollup::utils::{print_table_row, print_table_separator};
/// let widths = [15, 10, 12];
/// print_table_separator(&widths);
/// print_table_row(&["Operation", "Requests", "P95"], &widths);
/// print_table_separator(&widths);
/// print_table_row(&["login", "1200", "85.00ms"], &widths);
/// print_table_separator(&widths);
/// ```
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    println!("{}", format_table_row(columns, widths));
}

/// Print a table separator
///
/// ```text
/// +-----------------+------------+--------------+
/// | Operation       | Requests   | P95          |
/// +-----------------+------------+--------------+
/// ```
pub fn print_table_separator(widths: &[usize]) {
    println!("{}", format_table_separator(widths));
}

fn format_table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        line.push_str(&format!(" {:width$} |", column, width = width));
    }
    line
}

fn format_table_separator(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_latency_ms() {
        assert_eq!(format_latency_ms(0.0), "0.00ms");
        assert_eq!(format_latency_ms(999.99), "999.99ms");
        assert_eq!(format_latency_ms(1500.0), "1.50s");
        assert_eq!(format_latency_ms(61_000.0), "1m 1s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h 0m 0s");
    }

    #[test]
    fn test_format_request_rate() {
        assert_eq!(format_request_rate(500.0), "500 req/s");
        assert_eq!(format_request_rate(1500.0), "1.50K req/s");
        assert_eq!(format_request_rate(1500000.0), "1.50M req/s");
    }

    #[test]
    fn test_request_rate() {
        assert_eq!(request_rate(10, 100, 100), 10.0);
        assert_eq!(request_rate(10, 100, 109), 1.0);
        // Out-of-order bounds do not underflow.
        assert_eq!(request_rate(10, 200, 100), 10.0);
    }

    #[test]
    fn test_error_rate_percent() {
        assert_eq!(error_rate_percent(0, 0), 0.0);
        assert_eq!(error_rate_percent(1, 4), 25.0);
    }

    #[test]
    fn test_validate_batch_size() {
        assert!(validate_batch_size(1).is_ok());
        assert!(validate_batch_size(500).is_ok());
        assert!(validate_batch_size(0).is_err());
        assert!(validate_batch_size(MAX_BATCH_SIZE + 1).is_err());
    }

    #[test]
    fn test_generate_run_id_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
    }

    #[test]
    fn test_get_cpu_cores() {
        assert!(get_cpu_cores() > 0);
    }

    #[test]
    fn test_table_formatting() {
        assert_eq!(format_table_separator(&[3, 1]), "+-----+---+");
        assert_eq!(format_table_row(&["ab", "c"], &[3, 1]), "| ab  | c |");
    }
}
