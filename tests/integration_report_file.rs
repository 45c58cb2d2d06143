use anyhow::Result;
use latency_rollup::{
    aggregate, input,
    results::{FinalReport, ResultsManager},
    AggregationConfig, Granularity,
};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

/// Load an unordered JSON-lines file, aggregate it, and write the report.
///
/// Mirrors what the binary does end to end, minus argument parsing.
#[test]
fn json_lines_file_to_report() -> Result<()> {
    let mut input_file = NamedTempFile::new()?;
    writeln!(input_file, r#"{{"timeStamp": 1006, "latency": 40, "label": "A"}}"#)?;
    writeln!(input_file, r#"{{"timeStamp": 1000, "latency": 10, "label": "A", "virtualUsers": 3}}"#)?;
    writeln!(input_file)?;
    writeln!(input_file, r#"{{"timeStamp": 1001, "latency": 20, "label": "B", "failures": 1}}"#)?;
    writeln!(input_file, r#"{{"timeStamp": 1002, "latency": 30, "label": "A"}}"#)?;
    input_file.flush()?;

    let samples = input::load_samples(input_file.path())?;
    assert_eq!(samples.len(), 4);
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let config = AggregationConfig::default();
    let report = aggregate(&samples, &config)?;
    assert_eq!(report.overall.total_requests, 4);
    assert_eq!(report.overall.total_failures, 1);
    assert_eq!(report.overall.max_concurrency, 3);
    assert_eq!(report.started_at, 1000);
    assert_eq!(report.stopped_at, 1006);

    let out_dir = tempdir()?;
    let output = out_dir.path().join("report.json");
    let manager = ResultsManager::new(&output, 3)?.with_scenario("checkout-flow");
    let written = manager.finalize(&report, &config)?;

    let on_disk: FinalReport = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    assert_eq!(on_disk.metadata.scenario, "checkout-flow");
    assert_eq!(on_disk.metadata.run_id, written.metadata.run_id);
    assert_eq!(on_disk.metadata.granularities, Granularity::ALL.to_vec());
    assert_eq!(on_disk.chart_row_count(), report.grouped.len());
    assert!(on_disk.chart_metric_batches.iter().all(|b| b.len() <= 3));

    let overall = &on_disk.summary_metrics[0];
    assert_eq!(overall.operation_name, "");
    assert_eq!(overall.request_count, 4);
    assert_eq!(overall.latency_avg_ms, 25.0);
    assert_eq!(on_disk.summary_metrics.len(), 3);

    // The 5s pass splits at 1006; every coarser pass keeps one bucket.
    let five_second_rows = on_disk
        .chart_metric_batches
        .iter()
        .flatten()
        .filter(|row| row.time_aggregation_level == "5s" && row.operation_name.is_empty())
        .count();
    assert_eq!(five_second_rows, 2);
    Ok(())
}

#[test]
fn json_array_file_loads() -> Result<()> {
    let mut input_file = NamedTempFile::new()?;
    write!(
        input_file,
        r#"[{{"timeStamp": 5, "latency": 1, "label": "x"}}, {{"timeStamp": 6, "latency": 3, "label": "x"}}]"#
    )?;
    input_file.flush()?;

    let samples = input::load_samples(input_file.path())?;
    let report = aggregate(&samples, &AggregationConfig::single(Granularity::OneMinute))?;
    assert_eq!(report.grouped.data_points.len(), 1);
    assert_eq!(report.by_label["x"].latencies.avg_ms, 2.0);
    Ok(())
}

#[test]
fn empty_file_is_rejected() -> Result<()> {
    let input_file = NamedTempFile::new()?;
    assert!(input::load_samples(input_file.path()).is_err());
    Ok(())
}

#[test]
fn directory_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    assert!(input::load_samples(dir.path()).is_err());
    Ok(())
}
