use crate::input::InputFormat;
use crate::sample::{AnchorMode, FloorMode, Granularity};
use clap::Parser;
use std::path::PathBuf;

/// Latency Rollup - aggregate load-test samples into chart and summary metrics
#[derive(Parser, Debug, Clone, Default)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Results file: JMeter JTL (CSV), or normalized samples as a JSON array or JSON lines
    #[clap(short = 'f', long, help_heading = "Core Options")]
    pub file: PathBuf,

    /// Layout of the results file; `auto` reads .jtl and .csv as JTL and anything else as JSON
    #[clap(long, value_enum, default_value_t = InputFormat::Auto, help_heading = "Core Options")]
    pub format: InputFormat,

    /// Output file for the aggregated report (JSON format)
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE, help_heading = "Core Options")]
    pub output: PathBuf,

    /// Scenario name recorded in the report
    #[clap(short = 'n', long, default_value = crate::defaults::SCENARIO_NAME)]
    pub scenario: String,

    /// Bucket widths to aggregate at (space-separated); the first one drives the summary totals
    #[clap(short = 'g', long, value_enum, num_args = 1.., default_values_t = Granularity::ALL.to_vec())]
    pub granularities: Vec<Granularity>,

    /// How bucket starts are aligned
    #[clap(long, value_enum, default_value_t = FloorMode::Epoch)]
    pub floor_mode: FloorMode,

    /// Which sample anchors the window after a close
    #[clap(long, value_enum, default_value_t = AnchorMode::NextSample)]
    pub anchor_mode: AnchorMode,

    /// Number of chart rows per published batch
    #[clap(long, default_value_t = crate::defaults::BATCH_SIZE)]
    pub batch_size: usize,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Also write logs to this file
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["latency-rollup", "--file", "samples.json"]).unwrap();
        assert_eq!(args.file, PathBuf::from("samples.json"));
        assert_eq!(args.output, PathBuf::from(crate::defaults::OUTPUT_FILE));
        assert_eq!(args.granularities, Granularity::ALL.to_vec());
        assert_eq!(args.floor_mode, FloorMode::Epoch);
        assert_eq!(args.anchor_mode, AnchorMode::NextSample);
        assert_eq!(args.format, InputFormat::Auto);
        assert_eq!(args.batch_size, 500);
        assert!(!args.verbose);
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_granularity_values() {
        let args = Args::try_parse_from([
            "latency-rollup",
            "-f",
            "s.json",
            "-g",
            "1m",
            "5s",
            "--floor-mode",
            "minute-relative",
            "--anchor-mode",
            "closing-sample",
            "--format",
            "jtl",
        ])
        .unwrap();
        assert_eq!(
            args.granularities,
            vec![Granularity::OneMinute, Granularity::FiveSeconds]
        );
        assert_eq!(args.floor_mode, FloorMode::MinuteRelative);
        assert_eq!(args.anchor_mode, AnchorMode::ClosingSample);
        assert_eq!(args.format, InputFormat::Jtl);
    }

    #[test]
    fn test_file_is_required() {
        assert!(Args::try_parse_from(["latency-rollup"]).is_err());
    }

    #[test]
    fn test_unknown_granularity_rejected() {
        assert!(Args::try_parse_from(["latency-rollup", "-f", "s.json", "-g", "2m"]).is_err());
    }
}
