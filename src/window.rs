//! # Window Builder
//!
//! Partitions a timestamp-ordered sample sequence into contiguous time
//! buckets at one [`Granularity`], producing one overall [`MetricDataPoint`]
//! per bucket plus one per (bucket, label) pair.
//!
//! ## Window Boundaries
//!
//! A window is anchored at the floor of the first timestamp it sees while
//! unanchored. It closes when a sample arrives whose timestamp is
//! *strictly* more than one bucket width past the anchor. The closing
//! sample is the first member of the next batch, but by default the anchor
//! is cleared and the next arriving sample sets it ([`AnchorMode::NextSample`]).
//! With [`AnchorMode::ClosingSample`] the closing sample anchors the next
//! window itself.
//!
//! Because closing is driven by arriving samples, a gap in the data can make
//! a bucket span more than its nominal width. Closed buckets are never
//! reopened. A batch still open at the end of the input is closed at the
//! floor of its first sample.
//!
//! ## Observers
//!
//! Each closed per-label batch is reported to a [`WindowObserver`]. The
//! aggregator passes its counters as the observer on the counting pass and
//! [`NoopObserver`] on every other pass, so the builder itself carries no
//! counting state.

use crate::sample::{AnchorMode, FloorMode, Granularity, Sample};
use crate::stats::{LatencySummary, StatsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Aggregate of every sample (optionally one label's subset) in one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDataPoint {
    #[serde(rename = "timeStamp")]
    pub bucket_start: u64,
    #[serde(rename = "timeAggregationLevel")]
    pub granularity: Granularity,
    pub label: Option<String>,
    pub requests: u64,
    pub failures: u64,
    #[serde(rename = "virtualUsers")]
    pub max_concurrency: u64,
    pub latencies: LatencySummary,
}

/// Buckets produced by one or more aggregation passes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedResult {
    pub data_points: Vec<MetricDataPoint>,
    pub data_points_by_label: BTreeMap<String, Vec<MetricDataPoint>>,
}

impl GroupedResult {
    /// Append another result, keeping pass order within each list
    pub fn extend(&mut self, other: GroupedResult) {
        self.data_points.extend(other.data_points);
        for (label, points) in other.data_points_by_label {
            self.data_points_by_label
                .entry(label)
                .or_default()
                .extend(points);
        }
    }

    /// Total number of rows, overall and labeled
    pub fn len(&self) -> usize {
        self.data_points.len() + self.labeled_len()
    }

    pub fn labeled_len(&self) -> usize {
        self.data_points_by_label.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overall buckets produced at one granularity
    pub fn overall_at(&self, granularity: Granularity) -> impl Iterator<Item = &MetricDataPoint> {
        self.data_points
            .iter()
            .filter(move |dp| dp.granularity == granularity)
    }

    /// Buckets for one label at one granularity
    pub fn label_at<'a>(
        &'a self,
        label: &str,
        granularity: Granularity,
    ) -> impl Iterator<Item = &'a MetricDataPoint> {
        self.data_points_by_label
            .get(label)
            .into_iter()
            .flatten()
            .filter(move |dp| dp.granularity == granularity)
    }
}

/// One label's share of a window that just closed
#[derive(Debug, Clone, Copy)]
pub struct ClosedBatch<'a> {
    pub granularity: Granularity,
    pub bucket_start: u64,
    pub label: &'a str,
    pub requests: u64,
    pub failures: u64,
    pub max_concurrency: u64,
    pub latencies: &'a [f64],
}

/// Receives every per-label batch as its window closes
pub trait WindowObserver {
    fn on_label_batch(&mut self, batch: &ClosedBatch<'_>);
}

/// Observer for bucketing-only passes
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl WindowObserver for NoopObserver {
    fn on_label_batch(&mut self, _batch: &ClosedBatch<'_>) {}
}

/// Builds buckets at a single granularity
#[derive(Debug, Clone, Copy)]
pub struct WindowBuilder {
    granularity: Granularity,
    floor_mode: FloorMode,
    anchor_mode: AnchorMode,
}

impl WindowBuilder {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            floor_mode: FloorMode::default(),
            anchor_mode: AnchorMode::default(),
        }
    }

    pub fn with_floor_mode(mut self, floor_mode: FloorMode) -> Self {
        self.floor_mode = floor_mode;
        self
    }

    pub fn with_anchor_mode(mut self, anchor_mode: AnchorMode) -> Self {
        self.anchor_mode = anchor_mode;
        self
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Group `samples` into buckets without reporting to any observer
    pub fn group_only(&self, samples: &[Sample]) -> Result<GroupedResult, StatsError> {
        self.group(samples, &mut NoopObserver)
    }

    /// Group `samples` into buckets, reporting each closed label batch
    ///
    /// `samples` must be sorted non-decreasing by timestamp; they are not
    /// re-sorted here.
    pub fn group(
        &self,
        samples: &[Sample],
        observer: &mut dyn WindowObserver,
    ) -> Result<GroupedResult, StatsError> {
        let width = self.granularity.seconds();
        let mut result = GroupedResult::default();
        let mut window_start: Option<u64> = None;
        let mut batch: Vec<&Sample> = Vec::new();
        let mut batch_by_label: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();

        for sample in samples {
            let start = *window_start.get_or_insert_with(|| self.floor(sample.timestamp));

            if sample.timestamp.saturating_sub(start) > width {
                self.close_window(start, &batch, &batch_by_label, &mut result, observer)?;
                batch.clear();
                batch_by_label.clear();
                window_start = match self.anchor_mode {
                    AnchorMode::NextSample => None,
                    AnchorMode::ClosingSample => Some(self.floor(sample.timestamp)),
                };
            }

            batch.push(sample);
            batch_by_label
                .entry(sample.label.as_str())
                .or_default()
                .push(sample);
        }

        if let Some(first) = batch.first() {
            let start = self.floor(first.timestamp);
            self.close_window(start, &batch, &batch_by_label, &mut result, observer)?;
        }

        Ok(result)
    }

    fn floor(&self, timestamp: u64) -> u64 {
        self.granularity.floor(timestamp, self.floor_mode)
    }

    fn close_window(
        &self,
        start: u64,
        batch: &[&Sample],
        batch_by_label: &BTreeMap<&str, Vec<&Sample>>,
        result: &mut GroupedResult,
        observer: &mut dyn WindowObserver,
    ) -> Result<(), StatsError> {
        debug!(
            granularity = %self.granularity,
            bucket_start = start,
            samples = batch.len(),
            labels = batch_by_label.len(),
            "closing window"
        );

        let (overall, _) = self.aggregate(start, None, batch)?;
        result.data_points.push(overall);

        for (&label, samples) in batch_by_label {
            let (point, latencies) = self.aggregate(start, Some(label), samples)?;
            observer.on_label_batch(&ClosedBatch {
                granularity: self.granularity,
                bucket_start: start,
                label,
                requests: point.requests,
                failures: point.failures,
                max_concurrency: point.max_concurrency,
                latencies: &latencies,
            });
            result
                .data_points_by_label
                .entry(label.to_string())
                .or_default()
                .push(point);
        }

        Ok(())
    }

    fn aggregate(
        &self,
        start: u64,
        label: Option<&str>,
        samples: &[&Sample],
    ) -> Result<(MetricDataPoint, Vec<f64>), StatsError> {
        let mut requests = 0u64;
        let mut failures = 0u64;
        let mut max_concurrency = 0u64;
        let mut latencies = Vec::with_capacity(samples.len());

        for sample in samples {
            requests = requests.saturating_add(sample.requests);
            failures = failures.saturating_add(sample.failures);
            max_concurrency = max_concurrency.max(sample.concurrency);
            latencies.push(sample.latency as f64);
        }

        let point = MetricDataPoint {
            bucket_start: start,
            granularity: self.granularity,
            label: label.map(str::to_string),
            requests,
            failures,
            max_concurrency,
            latencies: LatencySummary::from_latencies(&latencies)?,
        };

        Ok((point, latencies))
    }
}
