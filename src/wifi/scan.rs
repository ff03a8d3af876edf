//! Two-pass scan aggregation under the radio lock.
//!
//! A single scan snapshot is noisy: access points intermittently fail to
//! appear in one pass. Two temporally separated passes merged by SSID buy
//! meaningfully better recall for the cost of one cooldown interval.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::exec::{run_with_retry, CommandRunner, CommandSpec, ExecError, RetryPolicy};
use crate::locks::{LockManager, ResourceClass};

use super::parser::parse_scan_output;
use super::reducer::reduce;
use super::AccessPoint;

/// Terminal outcome of one aggregation.
///
/// `Empty` means the radio answered and no access points were found, which
/// is a different statement than `Error` (we could not get an answer).
#[derive(Debug, Clone, PartialEq)]
pub enum ScanStatus {
    Found(Vec<AccessPoint>),
    Empty,
    Busy,
    Error(String),
}

pub struct ScanAggregator {
    locks: LockManager,
    runner: Arc<dyn CommandRunner>,
    policy: RetryPolicy,
    device: String,
    cooldown: Duration,
    command_timeout: Duration,
}

impl ScanAggregator {
    pub fn new(
        locks: LockManager,
        runner: Arc<dyn CommandRunner>,
        policy: RetryPolicy,
        device: impl Into<String>,
        cooldown: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            locks,
            runner,
            policy,
            device: device.into(),
            cooldown,
            command_timeout,
        }
    }

    fn scan_spec(&self) -> CommandSpec {
        CommandSpec::new(
            "iw",
            &["dev", &self.device, "scan"],
            self.command_timeout,
        )
    }

    async fn one_pass(&self) -> Result<Vec<AccessPoint>, ExecError> {
        let output = run_with_retry(self.runner.as_ref(), &self.scan_spec(), &self.policy).await?;
        Ok(reduce(parse_scan_output(&output.stdout)))
    }

    /// Run the full aggregation: acquire the radio lock (or report `Busy`
    /// without touching the radio), two passes separated by the cooldown,
    /// merge strongest-wins by SSID. The lock guard is dropped on every
    /// exit path, including cancellation.
    pub async fn run(&self) -> ScanStatus {
        let Some(_radio) = self.locks.try_acquire(ResourceClass::Radio) else {
            info!("radio busy, rejecting scan");
            return ScanStatus::Busy;
        };

        let first = self.one_pass().await;
        tokio::time::sleep(self.cooldown).await;
        let second = self.one_pass().await;

        match (first, second) {
            (Ok(a), Ok(b)) => {
                // Same strongest-wins rule as within a pass, applied across
                // passes; first-pass records win exact ties.
                let merged = reduce(a.into_iter().chain(b).collect());
                info!(count = merged.len(), "scan aggregation complete");
                finish(merged)
            }
            (Ok(only), Err(err)) | (Err(err), Ok(only)) => {
                warn!(error = %err, "one scan pass failed, using the other");
                finish(only)
            }
            (Err(first_err), Err(second_err)) => {
                warn!(first = %first_err, second = %second_err, "both scan passes failed");
                ScanStatus::Error(second_err.to_string())
            }
        }
    }
}

fn finish(records: Vec<AccessPoint>) -> ScanStatus {
    if records.is_empty() {
        ScanStatus::Empty
    } else {
        ScanStatus::Found(records)
    }
}
