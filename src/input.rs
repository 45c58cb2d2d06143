//! # Sample Loader
//!
//! Reads load-test results into normalized samples. Three layouts are
//! accepted:
//!
//! - JMeter JTL (CSV with a header row), the format load-test runs produce
//! - a JSON array of sample objects
//! - newline-delimited JSON, one sample object per line (blank lines skipped)
//!
//! With [`InputFormat::Auto`] the layout is picked from the file extension:
//! `.jtl` and `.csv` are read as JTL, anything else as JSON.
//!
//! Loaded samples are stable-sorted by timestamp before being returned,
//! which is the ordering the aggregation engine relies on.
//!
//! ## JTL Columns
//!
//! Columns are located by header name, so their order and any extra columns
//! do not matter. Five are required:
//!
//! | Column | Sample field |
//! |---|---|
//! | `timeStamp` | `timestamp`, epoch milliseconds truncated to seconds |
//! | `elapsed` | `latency` in milliseconds |
//! | `label` | `label` |
//! | `success` | one failure unless the value is `true` |
//! | `allThreads` | `concurrency` |

use crate::sample::Sample;
use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use csv::StringRecord;
use std::path::Path;
use tracing::{debug, info, warn};

/// Layout of an input file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Choose by file extension
    #[default]
    Auto,

    /// JSON array or JSON lines of normalized samples
    Json,

    /// JMeter CSV results with a header row
    Jtl,
}

impl InputFormat {
    /// Resolve [`InputFormat::Auto`] against the extension of `path`
    pub fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let extension = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_ascii_lowercase);
                match extension.as_deref() {
                    Some("jtl") | Some("csv") => InputFormat::Jtl,
                    _ => InputFormat::Json,
                }
            }
            format => format,
        }
    }
}

/// Load, parse and order the samples in `path`, choosing the layout by extension
pub fn load_samples<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>> {
    load_samples_as(path, InputFormat::Auto)
}

/// Load, parse and order the samples in `path` using `format`
pub fn load_samples_as<P: AsRef<Path>>(path: P, format: InputFormat) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    validate_file(path)?;

    let format = format.resolve(path);
    debug!("Reading {:?} as {:?}", path, format);

    let samples = match format {
        InputFormat::Jtl => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("cannot open file {}", path.display()))?;
            parse_jtl(file)
        }
        _ => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read file {}", path.display()))?;
            parse_samples(&contents)
        }
    }
    .with_context(|| format!("cannot parse file {}", path.display()))?;

    info!("Loaded {} samples from {:?}", samples.len(), path);
    Ok(samples)
}

/// Parse samples from an in-memory JSON document and order them by timestamp
pub fn parse_samples(contents: &str) -> Result<Vec<Sample>> {
    let trimmed = contents.trim_start();

    let samples: Vec<Sample> = if trimmed.starts_with('[') {
        debug!("Parsing samples as a JSON array");
        serde_json::from_str(trimmed).context("invalid JSON sample array")?
    } else {
        debug!("Parsing samples as JSON lines");
        let mut samples = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let sample: Sample = serde_json::from_str(line)
                .with_context(|| format!("invalid sample on line {}", number + 1))?;
            samples.push(sample);
        }
        samples
    };

    ordered(samples)
}

/// Parse JMeter CSV results and order them by timestamp
pub fn parse_jtl<R: std::io::Read>(reader: R) -> Result<Vec<Sample>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("cannot read header row")?.clone();
    let columns = JtlColumns::from_headers(&headers)?;

    let mut samples = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // Row 1 is the header.
        let row = index + 2;
        let record = record.with_context(|| format!("cannot read row {}", row))?;
        let sample = columns
            .sample(&record)
            .with_context(|| format!("invalid sample on row {}", row))?;
        samples.push(sample);
    }

    ordered(samples)
}

fn ordered(mut samples: Vec<Sample>) -> Result<Vec<Sample>> {
    if samples.is_empty() {
        anyhow::bail!("no samples found");
    }

    if !samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        warn!("Samples are not ordered by timestamp, sorting");
        samples.sort_by_key(|s| s.timestamp);
    }

    Ok(samples)
}

/// Positions of the JTL columns a sample is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JtlColumns {
    timestamp: usize,
    elapsed: usize,
    label: usize,
    success: usize,
    all_threads: usize,
}

impl JtlColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|column| column == name);

        let success = find("success");
        let all_threads = find("allThreads");
        let elapsed = find("elapsed");
        let timestamp = find("timeStamp");
        let label = find("label");

        match (success, all_threads, elapsed, timestamp, label) {
            (Some(success), Some(all_threads), Some(elapsed), Some(timestamp), Some(label)) => {
                Ok(Self {
                    timestamp,
                    elapsed,
                    label,
                    success,
                    all_threads,
                })
            }
            _ => {
                let missing: Vec<&str> = [
                    ("success", success),
                    ("allThreads", all_threads),
                    ("elapsed", elapsed),
                    ("timeStamp", timestamp),
                    ("label", label),
                ]
                .iter()
                .filter(|(_, index)| index.is_none())
                .map(|(name, _)| *name)
                .collect();
                Err(anyhow!("missing column(s): {}", missing.join(", ")))
            }
        }
    }

    fn sample(&self, record: &StringRecord) -> Result<Sample> {
        let field = |index: usize, name: &str| {
            record
                .get(index)
                .ok_or_else(|| anyhow!("row has no {} column", name))
        };
        let number = |index: usize, name: &str| -> Result<u64> {
            let value = field(index, name)?;
            value
                .parse::<u64>()
                .with_context(|| format!("invalid {} value {:?}", name, value))
        };

        let timestamp_ms = number(self.timestamp, "timeStamp")?;
        let succeeded = field(self.success, "success")?.eq_ignore_ascii_case("true");

        Ok(Sample {
            timestamp: timestamp_ms / 1000,
            latency: number(self.elapsed, "elapsed")?,
            requests: 1,
            failures: u64::from(!succeeded),
            concurrency: number(self.all_threads, "allThreads")?,
            label: field(self.label, "label")?.to_string(),
        })
    }
}

fn validate_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("file {} does not exist", path.display()))?;

    if !metadata.is_file() {
        anyhow::bail!("{} is not a regular file", path.display());
    }

    if metadata.len() > crate::defaults::MAX_FILE_SIZE {
        anyhow::bail!(
            "file {} is too large ({} bytes, limit is {} bytes)",
            path.display(),
            metadata.len(),
            crate::defaults::MAX_FILE_SIZE
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JTL_HEADER: &str = "timeStamp,elapsed,label,responseCode,responseMessage,threadName,dataType,success,failureMessage,bytes,sentBytes,grpThreads,allThreads,URL,Latency,IdleTime,Connect";

    #[test]
    fn test_parse_json_array() {
        let samples = parse_samples(
            r#"[
                {"timeStamp": 2, "latency": 20, "label": "b"},
                {"timeStamp": 1, "latency": 10, "label": "a"}
            ]"#,
        )
        .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, "a");
        assert_eq!(samples[1].timestamp, 2);
    }

    #[test]
    fn test_parse_json_lines() {
        let samples = parse_samples(
            "{\"timeStamp\": 5, \"latency\": 1, \"label\": \"x\"}\n\n{\"timeStamp\": 6, \"latency\": 2, \"label\": \"y\", \"failures\": 1}\n",
        )
        .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].failures, 1);
    }

    #[test]
    fn test_sort_is_stable() {
        let samples = parse_samples(
            "{\"timeStamp\": 9, \"latency\": 1, \"label\": \"late\"}\n\
             {\"timeStamp\": 3, \"latency\": 1, \"label\": \"first\"}\n\
             {\"timeStamp\": 3, \"latency\": 1, \"label\": \"second\"}\n",
        )
        .unwrap();
        let labels: Vec<&str> = samples.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["first", "second", "late"]);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let err = parse_samples("{\"timeStamp\": 1, \"latency\": 1, \"label\": \"a\"}\nnot json\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(parse_samples("").is_err());
        assert!(parse_samples("[]").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_samples("/definitely/not/here.json").is_err());
    }

    #[test]
    fn test_parse_jtl_row() {
        let jtl = format!(
            "{}\n\
             1700000000123,250,Login,200,OK,Thread Group 1-1,text,true,,1024,512,4,12,https://example.test/login,240,0,15\n\
             1700000001999,900,Search,500,Internal Server Error,Thread Group 1-2,text,false,boom,80,512,4,13,https://example.test/search,880,0,20\n",
            JTL_HEADER
        );
        let samples = parse_jtl(jtl.as_bytes()).unwrap();

        assert_eq!(
            samples[0],
            Sample::new(1_700_000_000, 250, "Login").with_concurrency(12)
        );
        assert_eq!(samples[1].timestamp, 1_700_000_001);
        assert_eq!(samples[1].failures, 1);
        assert_eq!(samples[1].requests, 1);
        assert_eq!(samples[1].concurrency, 13);
    }

    #[test]
    fn test_jtl_columns_found_by_name() {
        let jtl = "label,allThreads,success,elapsed,timeStamp,extra\n\
                   b,3,true,20,2000,x\n\
                   a,2,TRUE,10,1000,y\n";
        let samples = parse_jtl(jtl.as_bytes()).unwrap();
        assert_eq!(samples[0], Sample::new(1, 10, "a").with_concurrency(2));
        assert_eq!(samples[1], Sample::new(2, 20, "b").with_concurrency(3));
    }

    #[test]
    fn test_jtl_quoted_label_with_comma() {
        let jtl = "timeStamp,elapsed,label,success,allThreads\n\
                   5000,7,\"GET /items, page 2\",true,1\n";
        let samples = parse_jtl(jtl.as_bytes()).unwrap();
        assert_eq!(samples[0].label, "GET /items, page 2");
    }

    #[test]
    fn test_jtl_missing_columns() {
        let err = parse_jtl("timeStamp,elapsed,label\n1000,5,a\n".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "missing column(s): success, allThreads");
    }

    #[test]
    fn test_jtl_bad_number_reports_row() {
        let jtl = "timeStamp,elapsed,label,success,allThreads\n\
                   1000,5,a,true,1\n\
                   1001,fast,a,true,1\n";
        let err = parse_jtl(jtl.as_bytes()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("row 3"), "{}", message);
        assert!(message.contains("elapsed"), "{}", message);
    }

    #[test]
    fn test_jtl_header_only_rejected() {
        assert!(parse_jtl(format!("{}\n", JTL_HEADER).as_bytes()).is_err());
    }

    #[test]
    fn test_format_resolution() {
        assert_eq!(InputFormat::Auto.resolve(Path::new("run.jtl")), InputFormat::Jtl);
        assert_eq!(InputFormat::Auto.resolve(Path::new("RUN.CSV")), InputFormat::Jtl);
        assert_eq!(InputFormat::Auto.resolve(Path::new("run.jsonl")), InputFormat::Json);
        assert_eq!(InputFormat::Auto.resolve(Path::new("run")), InputFormat::Json);
        assert_eq!(InputFormat::Jtl.resolve(Path::new("run.json")), InputFormat::Jtl);
    }
}
