//! ICMP reachability probe via the system `ping` binary.

use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::exec::{run_with_retry, CommandRunner, CommandSpec, ExecError, RetryPolicy};

#[derive(Debug, Clone, Serialize)]
pub struct PingReport {
    pub host: String,
    /// Round-trip time parsed from ping output; absent if the output shape
    /// was unexpected even though the probe succeeded.
    pub rtt_ms: Option<f64>,
}

/// Send a single echo request. An unreachable host exits non-zero and
/// surfaces as a fatal error; only timeouts and busy conditions retry.
pub async fn run(
    runner: &dyn CommandRunner,
    host: &str,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<PingReport, ExecError> {
    let wait_secs = timeout.as_secs().max(1).to_string();
    let spec = CommandSpec::new("ping", &["-c", "1", "-W", &wait_secs, "-q", host], timeout);

    let output = run_with_retry(runner, &spec, policy).await?;

    let rtt_ms = extract_rtt(&output.stdout);
    if rtt_ms.is_none() {
        warn!(%host, "ping succeeded but RTT could not be parsed");
    }

    Ok(PingReport {
        host: host.to_string(),
        rtt_ms,
    })
}

/// Pull an RTT out of ping output: either an inline "time=12.3 ms" or the
/// avg field of the "rtt min/avg/max/mdev = ..." summary line.
fn extract_rtt(output: &str) -> Option<f64> {
    if let Some(pos) = output.find("time=") {
        let rest = &output[pos + 5..];
        if let Some(end) = rest.find(' ') {
            return rest[..end].parse::<f64>().ok();
        }
    }

    if let Some(pos) = output.find(" = ") {
        if output[..pos].contains("rtt") || output[..pos].contains("round-trip") {
            let rest = &output[pos + 3..];
            let parts: Vec<&str> = rest.split('/').collect();
            if parts.len() >= 2 {
                return parts[1].parse::<f64>().ok();
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_inline_time() {
        let out = "64 bytes from 8.8.8.8: icmp_seq=1 ttl=115 time=14.2 ms";
        assert_eq!(extract_rtt(out), Some(14.2));
    }

    #[test]
    fn test_extract_summary_avg() {
        let out = "\
--- 8.8.8.8 ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms
rtt min/avg/max/mdev = 14.188/14.532/14.876/0.344 ms";
        assert_eq!(extract_rtt(out), Some(14.532));
    }

    #[test]
    fn test_extract_from_garbage_is_none() {
        assert_eq!(extract_rtt("no timing data here"), None);
        assert_eq!(extract_rtt(""), None);
    }
}
