//! # Latency Summary Calculator
//!
//! Computes the fixed set of latency statistics published for every bucket
//! and every overall/per-label summary: mean, min, max and the
//! P50/P75/P90/P95/P99 percentiles.
//!
//! ## Percentile Method
//!
//! Percentiles use linear interpolation between order statistics. For
//! percentile `p` over `n` ascending values the fractional index is
//! `(p / 100) * (n - 1)`; the result interpolates between the values at the
//! floor and ceiling of that index. Nearest-rank methods give visibly
//! different numbers in reports, so this must not change.
//!
//! ## Rounding
//!
//! Every reported value is rounded to 2 decimal places, half away from zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Percentile levels reported in every summary
pub const REPORTED_PERCENTILES: [f64; 5] = [50.0, 75.0, 90.0, 95.0, 99.0];

/// Errors raised when a latency summary cannot be computed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("cannot summarize an empty latency set")]
    EmptyInput,

    #[error("latency set contains a non-finite value: {0}")]
    NonFinite(f64),
}

/// Latency statistics in milliseconds, rounded to 2 decimal places
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySummary {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p75_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencySummary {
    /// Summarize a set of latency observations
    ///
    /// The input does not need to be sorted. An empty slice is a contract
    /// violation and is reported as [`StatsError::EmptyInput`] rather than
    /// defaulted to zeros.
    pub fn from_latencies(latencies: &[f64]) -> Result<Self, StatsError> {
        if latencies.is_empty() {
            return Err(StatsError::EmptyInput);
        }
        if let Some(&bad) = latencies.iter().find(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite(bad));
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        let at = |p: f64| {
            percentile_of_sorted(&sorted, p)
                .map(round2)
                .ok_or(StatsError::EmptyInput)
        };

        Ok(Self {
            avg_ms: round2(mean),
            min_ms: round2(sorted[0]),
            max_ms: round2(sorted[sorted.len() - 1]),
            p50_ms: at(50.0)?,
            p75_ms: at(75.0)?,
            p90_ms: at(90.0)?,
            p95_ms: at(95.0)?,
            p99_ms: at(99.0)?,
        })
    }

    /// Percentile values in [`REPORTED_PERCENTILES`] order
    pub fn percentiles(&self) -> [f64; 5] {
        [self.p50_ms, self.p75_ms, self.p90_ms, self.p95_ms, self.p99_ms]
    }
}

/// Interpolated percentile of an ascending slice
///
/// `p` is clamped to `[0, 100]`. Returns `None` for an empty slice.
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 100.0);
    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower_index = index.floor() as usize;
    let upper_index = index.ceil() as usize;

    if lower_index == upper_index {
        Some(sorted[lower_index])
    } else {
        let lower_value = sorted[lower_index];
        let upper_value = sorted[upper_index];
        let weight = index - lower_index as f64;
        Some(lower_value + weight * (upper_value - lower_value))
    }
}

/// Round to 2 decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        let summary = LatencySummary::from_latencies(&[42.0]).unwrap();
        assert_eq!(
            summary,
            LatencySummary {
                avg_ms: 42.0,
                min_ms: 42.0,
                max_ms: 42.0,
                p50_ms: 42.0,
                p75_ms: 42.0,
                p90_ms: 42.0,
                p95_ms: 42.0,
                p99_ms: 42.0,
            }
        );
    }

    #[test]
    fn test_interpolated_percentiles() {
        // Unsorted on purpose.
        let summary = LatencySummary::from_latencies(&[5.0, 1.0, 4.0, 2.0, 3.0]).unwrap();
        assert_eq!(summary.avg_ms, 3.0);
        assert_eq!(summary.min_ms, 1.0);
        assert_eq!(summary.max_ms, 5.0);
        assert_eq!(summary.p50_ms, 3.0);
        assert_eq!(summary.p75_ms, 4.0);
        assert_eq!(summary.p90_ms, 4.6);
        assert_eq!(summary.p95_ms, 4.8);
        assert_eq!(summary.p99_ms, 4.96);
    }

    #[test]
    fn test_two_values() {
        let summary = LatencySummary::from_latencies(&[10.0, 20.0]).unwrap();
        assert_eq!(summary.p50_ms, 15.0);
        assert_eq!(summary.p75_ms, 17.5);
        assert_eq!(summary.p99_ms, 19.9);
    }

    #[test]
    fn test_rounding() {
        let summary = LatencySummary::from_latencies(&[1.0, 1.0, 2.0]).unwrap();
        assert_eq!(summary.avg_ms, 1.33);
        assert_eq!(round2(2.675_000_1), 2.68);
        assert_eq!(round2(-1.005_000_1), -1.01);
        assert_eq!(round2(0.125), 0.13);
    }

    #[test]
    fn test_percentiles_monotonic() {
        let latencies: Vec<f64> = (0..257).map(|i| ((i * 7919) % 1009) as f64).collect();
        let summary = LatencySummary::from_latencies(&latencies).unwrap();
        let ps = summary.percentiles();
        assert!(ps.windows(2).all(|w| w[0] <= w[1]), "{:?}", ps);
        assert!(summary.min_ms <= ps[0]);
        assert!(ps[4] <= summary.max_ms);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert_eq!(
            LatencySummary::from_latencies(&[]),
            Err(StatsError::EmptyInput)
        );
    }

    #[test]
    fn test_non_finite_is_error() {
        assert!(matches!(
            LatencySummary::from_latencies(&[1.0, f64::NAN]),
            Err(StatsError::NonFinite(_))
        ));
    }

    #[test]
    fn test_percentile_clamps() {
        let sorted = [1.0, 2.0, 3.0];
        assert_eq!(percentile_of_sorted(&sorted, -5.0), Some(1.0));
        assert_eq!(percentile_of_sorted(&sorted, 150.0), Some(3.0));
    }

    #[test]
    fn test_percentile_of_empty_slice() {
        assert_eq!(percentile_of_sorted(&[], 50.0), None);
        assert_eq!(percentile_of_sorted(&[], 0.0), None);
    }
}
