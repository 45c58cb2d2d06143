//! # Normalized Samples and Time Granularities
//!
//! Vendor-specific result files (JTL columns, k6 JSON points, Locust stats)
//! are translated by adapters into one common record, the [`Sample`]. The
//! aggregation engine consumes nothing else.
//!
//! A [`Granularity`] names the width of the time buckets produced by one
//! aggregation pass. The fixed set mirrors the chart resolutions a report
//! offers, from 5 seconds up to 30 minutes.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One normalized request/response timing observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Unix timestamp in whole seconds
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    /// Elapsed time in milliseconds
    pub latency: u64,
    #[serde(default = "default_requests")]
    pub requests: u64,
    #[serde(default)]
    pub failures: u64,
    /// Active virtual users when the sample was taken
    #[serde(default, rename = "virtualUsers")]
    pub concurrency: u64,
    pub label: String,
}

fn default_requests() -> u64 {
    1
}

impl Sample {
    /// Create a successful single-request sample
    pub fn new(timestamp: u64, latency: u64, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            latency,
            requests: 1,
            failures: 0,
            concurrency: 0,
            label: label.into(),
        }
    }

    /// Mark the sample as failed
    pub fn failed(mut self) -> Self {
        self.failures = 1;
        self
    }

    pub fn with_concurrency(mut self, concurrency: u64) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Bucket width used by one aggregation pass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
pub enum Granularity {
    #[clap(name = "5s")]
    #[serde(rename = "5s")]
    FiveSeconds,

    #[clap(name = "30s")]
    #[serde(rename = "30s")]
    ThirtySeconds,

    #[clap(name = "1m")]
    #[serde(rename = "1m")]
    OneMinute,

    #[clap(name = "5m")]
    #[serde(rename = "5m")]
    FiveMinutes,

    #[clap(name = "30m")]
    #[serde(rename = "30m")]
    ThirtyMinutes,
}

impl Granularity {
    /// Every granularity, finest first. The first entry drives the counting pass.
    pub const ALL: [Granularity; 5] = [
        Granularity::FiveSeconds,
        Granularity::ThirtySeconds,
        Granularity::OneMinute,
        Granularity::FiveMinutes,
        Granularity::ThirtyMinutes,
    ];

    /// Bucket width in seconds
    pub fn seconds(&self) -> u64 {
        match self {
            Granularity::FiveSeconds => 5,
            Granularity::ThirtySeconds => 30,
            Granularity::OneMinute => 60,
            Granularity::FiveMinutes => 300,
            Granularity::ThirtyMinutes => 1800,
        }
    }

    /// Short wire form, e.g. `"5m"`
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::FiveSeconds => "5s",
            Granularity::ThirtySeconds => "30s",
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::ThirtyMinutes => "30m",
        }
    }

    /// Round `timestamp` down to the start of its bucket
    pub fn floor(&self, timestamp: u64, mode: FloorMode) -> u64 {
        let width = self.seconds();
        match mode {
            FloorMode::Epoch => timestamp - timestamp % width,
            // Only aligned for widths up to one minute.
            FloorMode::MinuteRelative => timestamp - timestamp % 60 % width,
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a bucket start is derived from the first timestamp in a window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloorMode {
    /// Align to multiples of the bucket width since the Unix epoch
    #[default]
    Epoch,

    /// Align within the current minute only, as older reports did.
    /// Buckets wider than a minute are not aligned to their width.
    MinuteRelative,
}

/// Which sample anchors the window that follows a close
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorMode {
    /// The window start is cleared on close and set from the next sample
    /// that arrives. The closing sample joins that window even when it is
    /// older than the new start.
    #[default]
    NextSample,

    /// The closing sample anchors the next window at its own floor, so no
    /// bucket starts after its first sample.
    ClosingSample,
}
