use crate::{
    aggregator::{AggregationConfig, AggregationReport},
    counter::MetricSummary,
    sample::Granularity,
    utils,
    window::{GroupedResult, MetricDataPoint},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// One chart bucket as published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetricRow {
    pub timestamp: u64,
    pub time_aggregation_level: String,
    /// Empty for buckets covering every label
    pub operation_name: String,
    pub request_count: u64,
    pub failure_count: u64,
    pub virtual_user_max: u64,
    pub latency_avg_ms: f64,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p75_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

impl From<&MetricDataPoint> for ChartMetricRow {
    fn from(dp: &MetricDataPoint) -> Self {
        Self {
            timestamp: dp.bucket_start,
            time_aggregation_level: dp.granularity.to_string(),
            operation_name: operation_name(dp.label.as_deref()),
            request_count: dp.requests,
            failure_count: dp.failures,
            virtual_user_max: dp.max_concurrency,
            latency_avg_ms: dp.latencies.avg_ms,
            latency_min_ms: dp.latencies.min_ms,
            latency_max_ms: dp.latencies.max_ms,
            latency_p50_ms: dp.latencies.p50_ms,
            latency_p75_ms: dp.latencies.p75_ms,
            latency_p90_ms: dp.latencies.p90_ms,
            latency_p95_ms: dp.latencies.p95_ms,
            latency_p99_ms: dp.latencies.p99_ms,
        }
    }
}

/// One summary line (overall or per label) as published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetricRow {
    pub operation_name: String,
    pub request_count: u64,
    pub failure_count: u64,
    pub virtual_user_max: u64,
    pub latency_avg_ms: f64,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p75_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

impl From<&MetricSummary> for SummaryMetricRow {
    fn from(summary: &MetricSummary) -> Self {
        Self {
            operation_name: operation_name(summary.label.as_deref()),
            request_count: summary.total_requests,
            failure_count: summary.total_failures,
            virtual_user_max: summary.max_concurrency,
            latency_avg_ms: summary.latencies.avg_ms,
            latency_min_ms: summary.latencies.min_ms,
            latency_max_ms: summary.latencies.max_ms,
            latency_p50_ms: summary.latencies.p50_ms,
            latency_p75_ms: summary.latencies.p75_ms,
            latency_p90_ms: summary.latencies.p90_ms,
            latency_p95_ms: summary.latencies.p95_ms,
            latency_p99_ms: summary.latencies.p99_ms,
        }
    }
}

/// Published name for a label: empty for the overall scope, a placeholder
/// for samples that carried an empty label
pub fn operation_name(label: Option<&str>) -> String {
    match label {
        None => String::new(),
        Some("") => crate::defaults::UNLABELED_OPERATION.to_string(),
        Some(label) => label.to_string(),
    }
}

/// Flatten buckets into chart rows: overall buckets first, then each label in order
pub fn chart_rows(grouped: &GroupedResult) -> Vec<ChartMetricRow> {
    grouped
        .data_points
        .iter()
        .chain(grouped.data_points_by_label.values().flatten())
        .map(ChartMetricRow::from)
        .collect()
}

/// Flatten summaries into rows: overall first, then each label in order
pub fn summary_rows(
    overall: &MetricSummary,
    by_label: &BTreeMap<String, MetricSummary>,
) -> Vec<SummaryMetricRow> {
    std::iter::once(overall)
        .chain(by_label.values())
        .map(SummaryMetricRow::from)
        .collect()
}

/// Split rows into fixed-size batches; only the last batch may be shorter
pub fn batch_rows<T: Clone>(rows: &[T], batch_size: usize) -> Result<Vec<Vec<T>>> {
    utils::validate_batch_size(batch_size)?;
    Ok(rows.chunks(batch_size).map(<[T]>::to_vec).collect())
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub tool_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: utils::get_cpu_cores(),
            tool_version: crate::VERSION.to_string(),
        }
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub version: String,
    pub run_id: String,
    pub scenario: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub started_at: u64,
    pub stopped_at: u64,
    pub total_samples: usize,
    pub granularities: Vec<Granularity>,
    pub system_info: SystemInfo,
}

/// Final report structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub metadata: ReportMetadata,
    pub summary_metrics: Vec<SummaryMetricRow>,
    pub chart_metric_batches: Vec<Vec<ChartMetricRow>>,
}

impl FinalReport {
    pub fn chart_row_count(&self) -> usize {
        self.chart_metric_batches.iter().map(Vec::len).sum()
    }
}

/// Results manager for assembling and writing reports
pub struct ResultsManager {
    output_file: PathBuf,
    batch_size: usize,
    scenario: String,
}

impl ResultsManager {
    /// Create a new results manager
    pub fn new(output_file: &Path, batch_size: usize) -> Result<Self> {
        utils::validate_batch_size(batch_size)?;

        Ok(Self {
            output_file: output_file.to_path_buf(),
            batch_size,
            scenario: crate::defaults::SCENARIO_NAME.to_string(),
        })
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Assemble the publishable report without writing it
    pub fn build_report(
        &self,
        report: &AggregationReport,
        config: &AggregationConfig,
    ) -> Result<FinalReport> {
        let chart = chart_rows(&report.grouped);
        let chart_metric_batches = batch_rows(&chart, self.batch_size)?;
        debug!(
            "Split {} chart rows into {} batches of up to {}",
            chart.len(),
            chart_metric_batches.len(),
            self.batch_size
        );

        Ok(FinalReport {
            metadata: ReportMetadata {
                version: crate::VERSION.to_string(),
                run_id: utils::generate_run_id(),
                scenario: self.scenario.clone(),
                generated_at: chrono::Utc::now(),
                started_at: report.started_at,
                stopped_at: report.stopped_at,
                total_samples: report.sample_count,
                granularities: config.granularities.clone(),
                system_info: SystemInfo::default(),
            },
            summary_metrics: summary_rows(&report.overall, &report.by_label),
            chart_metric_batches,
        })
    }

    /// Build the report and write it to the output file
    pub fn finalize(
        &self,
        report: &AggregationReport,
        config: &AggregationConfig,
    ) -> Result<FinalReport> {
        info!("Finalizing aggregation report");

        let final_report = self.build_report(report, config)?;
        let json = serde_json::to_string_pretty(&final_report)?;
        std::fs::write(&self.output_file, json)
            .with_context(|| format!("cannot write report to {}", self.output_file.display()))?;

        info!(
            "Wrote {} chart rows and {} summary rows to {:?}",
            final_report.chart_row_count(),
            final_report.summary_metrics.len(),
            self.output_file
        );
        Ok(final_report)
    }
}

/// Print the overall and per-label summaries as a console table
pub fn print_summary_table(report: &AggregationReport) {
    let widths = [24, 10, 9, 10, 10, 10, 10];
    let duration = Duration::from_secs(report.stopped_at.saturating_sub(report.started_at));

    println!(
        "Run span: {}  |  {} samples  |  {}",
        utils::format_duration(duration),
        report.sample_count,
        utils::format_request_rate(utils::request_rate(
            report.overall.total_requests,
            report.started_at,
            report.stopped_at,
        ))
    );
    utils::print_table_separator(&widths);
    utils::print_table_row(
        &["Operation", "Requests", "Errors", "Avg", "P50", "P95", "P99"],
        &widths,
    );
    utils::print_table_separator(&widths);

    for summary in std::iter::once(&report.overall).chain(report.by_label.values()) {
        let name = match summary.label.as_deref() {
            None => "(all)".to_string(),
            label => operation_name(label),
        };
        let requests = summary.total_requests.to_string();
        let errors = format!(
            "{:.2}%",
            utils::error_rate_percent(summary.total_failures, summary.total_requests)
        );
        let avg = utils::format_latency_ms(summary.latencies.avg_ms);
        let p50 = utils::format_latency_ms(summary.latencies.p50_ms);
        let p95 = utils::format_latency_ms(summary.latencies.p95_ms);
        let p99 = utils::format_latency_ms(summary.latencies.p99_ms);
        utils::print_table_row(
            &[
                name.as_str(),
                requests.as_str(),
                errors.as_str(),
                avg.as_str(),
                p50.as_str(),
                p95.as_str(),
                p99.as_str(),
            ],
            &widths,
        );
    }
    utils::print_table_separator(&widths);
}
