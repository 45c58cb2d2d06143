//! # Multi-Granularity Aggregator
//!
//! Runs the [`WindowBuilder`] once per configured granularity over the same
//! sample set and concatenates the resulting buckets, so that charts can be
//! drawn at several resolutions from one input.
//!
//! ## Counting Protocol
//!
//! Every pass walks the identical sample set, so feeding the running
//! counters from all of them would multiply totals by the number of
//! granularities. Each run therefore has two phases:
//!
//! 1. **Counting pass**: the first granularity is grouped with the
//!    [`CounterSet`] attached as the window observer.
//! 2. **Bucketing-only passes**: the counters are sealed and every further
//!    granularity is grouped with no observer at all.
//!
//! ## State Ownership
//!
//! All counters belong to one [`Aggregator`] value. Independent runs should
//! use independent aggregators, or the one-shot [`aggregate`] function.
//! Calling [`Aggregator::run`] twice on the same value re-opens its counters
//! and accumulates the second run on top of the first; that is not a
//! supported way to reuse an aggregator.

use crate::cli::Args;
use crate::counter::{CounterSet, MetricSummary};
use crate::sample::{AnchorMode, FloorMode, Granularity, Sample};
use crate::stats::StatsError;
use crate::window::{GroupedResult, WindowBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by an aggregation run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("at least one granularity must be configured")]
    NoGranularities,

    #[error("granularity {0} is configured more than once")]
    DuplicateGranularity(Granularity),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Which passes to run and how buckets are anchored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Passes to run, in order. The first one is the counting pass.
    pub granularities: Vec<Granularity>,
    pub floor_mode: FloorMode,
    #[serde(default)]
    pub anchor_mode: AnchorMode,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            granularities: Granularity::ALL.to_vec(),
            floor_mode: FloorMode::default(),
            anchor_mode: AnchorMode::default(),
        }
    }
}

impl AggregationConfig {
    pub fn from_args(args: &Args) -> Self {
        let granularities = if args.granularities.is_empty() {
            Granularity::ALL.to_vec()
        } else {
            args.granularities.clone()
        };

        Self {
            granularities,
            floor_mode: args.floor_mode,
            anchor_mode: args.anchor_mode,
        }
    }

    /// Single-pass configuration
    pub fn single(granularity: Granularity) -> Self {
        Self {
            granularities: vec![granularity],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.granularities.is_empty() {
            return Err(AggregationError::NoGranularities);
        }
        for (i, granularity) in self.granularities.iter().enumerate() {
            if self.granularities[..i].contains(granularity) {
                return Err(AggregationError::DuplicateGranularity(*granularity));
            }
        }
        Ok(())
    }
}

/// Owns the running counters for one aggregation run
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregationConfig,
    counters: CounterSet,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self {
            config,
            counters: CounterSet::new(),
        }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn counters(&self) -> &CounterSet {
        &self.counters
    }

    /// Bucket `samples` at every configured granularity
    ///
    /// `samples` must be sorted non-decreasing by timestamp. Counters are
    /// fed by the first pass only and are sealed when this returns.
    pub fn run(&mut self, samples: &[Sample]) -> Result<GroupedResult, AggregationError> {
        self.config.validate()?;

        let (counting, bucketing_only) = self
            .config
            .granularities
            .split_first()
            .ok_or(AggregationError::NoGranularities)?;

        info!(
            samples = samples.len(),
            passes = self.config.granularities.len(),
            "Starting aggregation run"
        );

        self.counters.open();
        let mut combined = self
            .builder(*counting)
            .group(samples, &mut self.counters)?;
        self.counters.seal();
        debug!(
            granularity = %counting,
            buckets = combined.len(),
            "Counting pass complete, counters sealed"
        );

        for granularity in bucketing_only {
            let pass = self.builder(*granularity).group_only(samples)?;
            debug!(granularity = %granularity, buckets = pass.len(), "Bucketing pass complete");
            combined.extend(pass);
        }

        info!(
            overall_buckets = combined.data_points.len(),
            labeled_buckets = combined.labeled_len(),
            "Aggregation run complete"
        );
        Ok(combined)
    }

    /// Summary over every sample of the run
    pub fn overall_summary(&self) -> Result<MetricSummary, StatsError> {
        self.counters.overall_summary()
    }

    /// One summary per label seen during the counting pass
    pub fn summary_by_label(&self) -> Result<BTreeMap<String, MetricSummary>, StatsError> {
        self.counters.summary_by_label()
    }

    fn builder(&self, granularity: Granularity) -> WindowBuilder {
        WindowBuilder::new(granularity)
            .with_floor_mode(self.config.floor_mode)
            .with_anchor_mode(self.config.anchor_mode)
    }
}

/// Everything the publisher needs from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    pub grouped: GroupedResult,
    pub overall: MetricSummary,
    pub by_label: BTreeMap<String, MetricSummary>,
    pub sample_count: usize,
    /// First sample timestamp, seconds
    pub started_at: u64,
    /// Last sample timestamp, seconds
    pub stopped_at: u64,
}

/// Run a fresh [`Aggregator`] over `samples` and collect its summaries
///
/// An empty sample set fails with [`StatsError::EmptyInput`] because there
/// is nothing to summarize.
pub fn aggregate(
    samples: &[Sample],
    config: &AggregationConfig,
) -> Result<AggregationReport, AggregationError> {
    let mut aggregator = Aggregator::new(config.clone());
    let grouped = aggregator.run(samples)?;

    Ok(AggregationReport {
        overall: aggregator.overall_summary()?,
        by_label: aggregator.summary_by_label()?,
        sample_count: samples.len(),
        started_at: samples.first().map_or(0, |s| s.timestamp),
        stopped_at: samples.last().map_or(0, |s| s.timestamp),
        grouped,
    })
}
