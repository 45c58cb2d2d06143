//! # Running Counters
//!
//! Counters accumulate the run-wide totals behind the summary rows of a
//! report: request and failure counts, peak concurrency, and every raw
//! latency value. Raw values are kept so that summary percentiles are exact
//! rather than approximated from a histogram.
//!
//! One [`CounterSet`] holds the overall counter plus one counter per label.
//! It is owned by a single aggregation run; nothing here is global.

use crate::stats::{LatencySummary, StatsError};
use crate::window::{ClosedBatch, WindowObserver};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Final totals and latency statistics for the whole run or one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub label: Option<String>,
    pub latencies: LatencySummary,
    pub total_requests: u64,
    pub total_failures: u64,
    #[serde(rename = "maxVirtualUsers")]
    pub max_concurrency: u64,
}

/// Mutable accumulator for one summary scope
#[derive(Debug, Clone, Default)]
pub struct RunningCounter {
    label: Option<String>,
    total_requests: u64,
    total_failures: u64,
    max_concurrency: u64,
    raw_latencies: Vec<f64>,
    sealed: bool,
}

impl RunningCounter {
    /// Counter for the whole run
    pub fn overall() -> Self {
        Self::default()
    }

    /// Counter for a single operation label
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Accept contributions again. Totals are kept.
    pub fn open(&mut self) {
        self.sealed = false;
    }

    /// Add one closed batch worth of totals and latencies
    ///
    /// Ignored once the counter is sealed. Totals saturate at `u64::MAX`.
    pub fn record(&mut self, requests: u64, failures: u64, concurrency: u64, latencies: &[f64]) {
        if self.sealed {
            trace!(label = ?self.label, "ignoring contribution to sealed counter");
            return;
        }

        self.total_requests = self.total_requests.saturating_add(requests);
        self.total_failures = self.total_failures.saturating_add(failures);
        self.max_concurrency = self.max_concurrency.max(concurrency);
        self.raw_latencies.extend_from_slice(latencies);
    }

    /// No-op: counters are gated by [`RunningCounter::seal`], never closed
    pub fn close(&mut self) {}

    /// Reject all further contributions
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    pub fn max_concurrency(&self) -> u64 {
        self.max_concurrency
    }

    /// Number of latency values retained so far
    pub fn sample_count(&self) -> usize {
        self.raw_latencies.len()
    }

    /// Summarize everything recorded so far
    ///
    /// Recomputes the latency statistics over all retained values on every
    /// call. Do not call this in a hot loop.
    pub fn snapshot(&self) -> Result<MetricSummary, StatsError> {
        Ok(MetricSummary {
            label: self.label.clone(),
            latencies: LatencySummary::from_latencies(&self.raw_latencies)?,
            total_requests: self.total_requests,
            total_failures: self.total_failures,
            max_concurrency: self.max_concurrency,
        })
    }
}

/// The overall counter plus one counter per label seen
#[derive(Debug, Clone, Default)]
pub struct CounterSet {
    overall: RunningCounter,
    by_label: BTreeMap<String, RunningCounter>,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.overall.open();
        for counter in self.by_label.values_mut() {
            counter.open();
        }
    }

    /// Seal every counter, including ones for labels not yet seen
    pub fn seal(&mut self) {
        self.overall.seal();
        for counter in self.by_label.values_mut() {
            counter.seal();
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.overall.is_sealed()
    }

    pub fn overall(&self) -> &RunningCounter {
        &self.overall
    }

    pub fn label(&self, label: &str) -> Option<&RunningCounter> {
        self.by_label.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.by_label.keys().map(String::as_str)
    }

    /// Record a batch of samples that all share `label`
    pub fn record_label_batch(
        &mut self,
        label: &str,
        requests: u64,
        failures: u64,
        concurrency: u64,
        latencies: &[f64],
    ) {
        if self.is_sealed() {
            trace!(label, "counter set sealed, batch not counted");
            return;
        }

        self.overall.record(requests, failures, concurrency, latencies);
        self.by_label
            .entry(label.to_string())
            .or_insert_with(|| RunningCounter::labeled(label))
            .record(requests, failures, concurrency, latencies);
    }

    pub fn overall_summary(&self) -> Result<MetricSummary, StatsError> {
        self.overall.snapshot()
    }

    pub fn summary_by_label(&self) -> Result<BTreeMap<String, MetricSummary>, StatsError> {
        self.by_label
            .iter()
            .map(|(label, counter)| Ok((label.clone(), counter.snapshot()?)))
            .collect()
    }
}

impl WindowObserver for CounterSet {
    fn on_label_batch(&mut self, batch: &ClosedBatch<'_>) {
        self.record_label_batch(
            batch.label,
            batch.requests,
            batch.failures,
            batch.max_concurrency,
            batch.latencies,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let mut counter = RunningCounter::labeled("checkout");
        counter.record(2, 1, 5, &[10.0, 30.0]);
        counter.record(1, 0, 3, &[20.0]);

        let summary = counter.snapshot().unwrap();
        assert_eq!(summary.label.as_deref(), Some("checkout"));
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.total_failures, 1);
        assert_eq!(summary.max_concurrency, 5);
        assert_eq!(summary.latencies.avg_ms, 20.0);
        assert_eq!(summary.latencies.p50_ms, 20.0);
    }

    #[test]
    fn test_sealed_counter_ignores_records() {
        let mut counter = RunningCounter::overall();
        counter.record(1, 0, 1, &[5.0]);
        counter.seal();
        counter.record(100, 100, 100, &[500.0]);
        counter.close();

        assert!(counter.is_sealed());
        assert_eq!(counter.total_requests(), 1);
        assert_eq!(counter.total_failures(), 0);
        assert_eq!(counter.max_concurrency(), 1);
        assert_eq!(counter.sample_count(), 1);
    }

    #[test]
    fn test_totals_saturate() {
        let mut counter = RunningCounter::overall();
        counter.record(u64::MAX, u64::MAX - 1, 0, &[1.0]);
        counter.record(5, 5, 0, &[1.0]);
        assert_eq!(counter.total_requests(), u64::MAX);
        assert_eq!(counter.total_failures(), u64::MAX);
    }

    #[test]
    fn test_open_keeps_totals() {
        let mut counter = RunningCounter::overall();
        counter.record(1, 0, 0, &[5.0]);
        counter.seal();
        counter.open();
        counter.record(1, 0, 0, &[7.0]);
        assert_eq!(counter.total_requests(), 2);
    }

    #[test]
    fn test_empty_counter_snapshot_is_error() {
        assert_eq!(
            RunningCounter::overall().snapshot(),
            Err(StatsError::EmptyInput)
        );
    }

    #[test]
    fn test_counter_set_routes_labels() {
        let mut set = CounterSet::new();
        set.record_label_batch("a", 2, 0, 4, &[1.0, 3.0]);
        set.record_label_batch("b", 1, 1, 9, &[10.0]);
        set.record_label_batch("a", 1, 0, 2, &[2.0]);

        let overall = set.overall_summary().unwrap();
        assert_eq!(overall.label, None);
        assert_eq!(overall.total_requests, 4);
        assert_eq!(overall.total_failures, 1);
        assert_eq!(overall.max_concurrency, 9);

        let by_label = set.summary_by_label().unwrap();
        assert_eq!(by_label.len(), 2);
        assert_eq!(by_label["a"].total_requests, 3);
        assert_eq!(by_label["a"].latencies.avg_ms, 2.0);
        assert_eq!(by_label["b"].total_failures, 1);
        assert_eq!(set.labels().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_sealed_set_ignores_new_labels() {
        let mut set = CounterSet::new();
        set.record_label_batch("a", 1, 0, 0, &[1.0]);
        set.seal();
        set.record_label_batch("late", 1, 0, 0, &[1.0]);

        assert!(set.label("late").is_none());
        assert_eq!(set.overall().total_requests(), 1);
    }
}
