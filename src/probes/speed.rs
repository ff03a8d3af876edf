//! Bandwidth measurement via `speedtest-cli --json`.

use std::time::Duration;

use serde::Serialize;

use crate::exec::{run_with_retry, CommandRunner, CommandSpec, ExecError, RetryPolicy};

/// Server ID used when the deployment pins its speed tests to a known-good
/// alternate server instead of letting the CLI pick the nearest one.
const ALTERNATE_SERVER_ID: &str = "24161";

#[derive(Debug, Clone, Serialize)]
pub struct SpeedReport {
    /// Whole-Mbps figures derived from the CLI's bits-per-second readings.
    pub download_mbps: u64,
    pub upload_mbps: u64,
    pub ping_ms: Option<f64>,
    /// The CLI's full JSON report, passed through for callers that want
    /// server details, share URLs, and the raw readings.
    pub raw: serde_json::Value,
}

/// Run a full download/upload measurement. Exit 0 with JSON that is missing
/// the bandwidth readings counts as a failure, not a zeroed report.
pub async fn run(
    runner: &dyn CommandRunner,
    use_alternate_server: bool,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<SpeedReport, ExecError> {
    let spec = if use_alternate_server {
        CommandSpec::new(
            "speedtest-cli",
            &["--server", ALTERNATE_SERVER_ID, "--json"],
            timeout,
        )
    } else {
        CommandSpec::new("speedtest-cli", &["--json"], timeout)
    };

    let output = run_with_retry(runner, &spec, policy).await?;
    parse_report(&output.stdout)
}

fn parse_report(stdout: &str) -> Result<SpeedReport, ExecError> {
    let raw: serde_json::Value = serde_json::from_str(stdout)
        .map_err(|e| ExecError::Fatal(format!("unparseable speedtest output: {e}")))?;

    let download = bandwidth_field(&raw, "download")?;
    let upload = bandwidth_field(&raw, "upload")?;
    let ping_ms = raw.get("ping").and_then(serde_json::Value::as_f64);

    Ok(SpeedReport {
        download_mbps: to_mbps(download),
        upload_mbps: to_mbps(upload),
        ping_ms,
        raw,
    })
}

fn bandwidth_field(raw: &serde_json::Value, field: &str) -> Result<f64, ExecError> {
    raw.get(field)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| ExecError::Fatal(format!("speedtest output missing '{field}' reading")))
}

fn to_mbps(raw_reading: f64) -> u64 {
    (raw_reading / 1_000_000.0 * 8.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_report() {
        let json = r#"{
            "download": 93750000.0,
            "upload": 11250000.0,
            "ping": 12.7,
            "server": {"id": "24161", "sponsor": "ExampleNet"}
        }"#;
        let report = parse_report(json).unwrap();
        assert_eq!(report.download_mbps, 750);
        assert_eq!(report.upload_mbps, 90);
        assert_eq!(report.ping_ms, Some(12.7));
        assert_eq!(report.raw["server"]["id"], "24161");
    }

    #[test]
    fn test_missing_reading_is_error() {
        let err = parse_report(r#"{"upload": 1000000.0}"#).unwrap_err();
        assert!(matches!(err, ExecError::Fatal(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_non_json_output_is_error() {
        let err = parse_report("Cannot retrieve speedtest configuration").unwrap_err();
        assert!(matches!(err, ExecError::Fatal(_)));
    }
}
