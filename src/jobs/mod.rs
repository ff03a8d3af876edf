//! Job submission facade.
//!
//! The single entry point the API layer calls: `Dispatcher::submit` takes a
//! `JobRequest`, consults the lock manager, runs the job to completion, and
//! answers with `Success | Busy | Error`. Nothing past this boundary leaks
//! internal error types or panics to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::cache::ResultCache;
use crate::config::Config;
use crate::exec::{CommandRunner, RetryPolicy};
use crate::locks::{LockManager, ResourceClass};
use crate::probes::{ping, speed, tcp, PingReport, SpeedReport, TcpReport};
use crate::wifi::{AccessPoint, ScanAggregator, ScanStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Ping,
    TcpCheck,
    SpeedTest,
    Scan,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Ping => write!(f, "ping"),
            JobKind::TcpCheck => write!(f, "tcp-check"),
            JobKind::SpeedTest => write!(f, "speed-test"),
            JobKind::Scan => write!(f, "scan"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub port: Option<u16>,
}

/// One inbound job. Created per API call, never persisted.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub kind: JobKind,
    pub target: Option<Target>,
    pub use_alternate_server: bool,
}

impl JobRequest {
    pub fn ping(host: impl Into<String>) -> Self {
        Self {
            kind: JobKind::Ping,
            target: Some(Target {
                host: host.into(),
                port: None,
            }),
            use_alternate_server: false,
        }
    }

    pub fn tcp_check(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: JobKind::TcpCheck,
            target: Some(Target {
                host: host.into(),
                port: Some(port),
            }),
            use_alternate_server: false,
        }
    }

    pub fn speed_test(use_alternate_server: bool) -> Self {
        Self {
            kind: JobKind::SpeedTest,
            target: None,
            use_alternate_server,
        }
    }

    pub fn scan() -> Self {
        Self {
            kind: JobKind::Scan,
            target: None,
            use_alternate_server: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobPayload {
    Ping(PingReport),
    Tcp(TcpReport),
    Speed(SpeedReport),
    Scan(Vec<AccessPoint>),
}

#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(JobPayload),
    Busy,
    Error(String),
}

pub struct Dispatcher {
    locks: LockManager,
    cache: Arc<ResultCache>,
    runner: Arc<dyn CommandRunner>,
    aggregator: ScanAggregator,
    policy: RetryPolicy,
    command_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        runner: Arc<dyn CommandRunner>,
        cache: Arc<ResultCache>,
        locks: LockManager,
    ) -> Self {
        let aggregator = ScanAggregator::new(
            locks.clone(),
            Arc::clone(&runner),
            config.retry_policy(),
            &config.device,
            config.scan_cooldown,
            config.command_timeout,
        );
        Self {
            locks,
            cache,
            runner,
            aggregator,
            policy: config.retry_policy(),
            command_timeout: config.command_timeout,
        }
    }

    /// Run one job to completion. Probe kinds take the probe-socket lock in
    /// non-blocking mode and answer `Busy` under contention; scans defer to
    /// the aggregator, which arbitrates the radio the same way.
    pub async fn submit(&self, request: JobRequest) -> JobOutcome {
        info!(kind = %request.kind, "job submitted");
        match request.kind {
            JobKind::Scan => self.run_scan().await,
            JobKind::Ping | JobKind::TcpCheck | JobKind::SpeedTest => {
                self.run_probe(request).await
            }
        }
    }

    async fn run_probe(&self, request: JobRequest) -> JobOutcome {
        let Some(_probe) = self.locks.try_acquire(ResourceClass::ProbeSocket) else {
            info!(kind = %request.kind, "probe socket busy, rejecting job");
            return JobOutcome::Busy;
        };

        let result = match request.kind {
            JobKind::Ping => {
                let Some(target) = request.target else {
                    return JobOutcome::Error("ping requires a target host".into());
                };
                ping::run(
                    self.runner.as_ref(),
                    &target.host,
                    &self.policy,
                    self.command_timeout,
                )
                .await
                .map(JobPayload::Ping)
            }
            JobKind::TcpCheck => {
                let Some(Target {
                    host,
                    port: Some(port),
                }) = request.target
                else {
                    return JobOutcome::Error("tcp-check requires a host and port".into());
                };
                tcp::run(
                    self.runner.as_ref(),
                    &host,
                    port,
                    &self.policy,
                    self.command_timeout,
                )
                .await
                .map(JobPayload::Tcp)
            }
            JobKind::SpeedTest => speed::run(
                self.runner.as_ref(),
                request.use_alternate_server,
                &self.policy,
                self.command_timeout,
            )
            .await
            .map(JobPayload::Speed),
            // submit() routes scans to the aggregator before reaching here.
            JobKind::Scan => {
                return JobOutcome::Error("scan jobs are handled by the aggregator".into())
            }
        };

        match result {
            Ok(payload) => JobOutcome::Success(payload),
            Err(err) => JobOutcome::Error(err.to_string()),
        }
    }

    async fn run_scan(&self) -> JobOutcome {
        match self.aggregator.run().await {
            ScanStatus::Found(aps) => {
                self.cache.set(JobKind::Scan, aps.clone());
                JobOutcome::Success(JobPayload::Scan(aps))
            }
            // A completed scan that found nothing is still the latest truth.
            ScanStatus::Empty => {
                self.cache.set(JobKind::Scan, Vec::new());
                JobOutcome::Success(JobPayload::Scan(Vec::new()))
            }
            ScanStatus::Busy => JobOutcome::Busy,
            ScanStatus::Error(msg) => JobOutcome::Error(msg),
        }
    }
}
