//! External command execution with timeout, retry, and backoff.
//!
//! Every probe and scan in this crate shells out to an external tool
//! (`ping`, `nc`, `speedtest-cli`, `iw`). Those tools are slow and flaky in
//! well-understood ways: the radio reports EBUSY mid-scan, a ping blackholes
//! until its timeout. This module owns all of that noise so callers see a
//! single `Result` per logical invocation.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// One external command invocation: program, arguments, and a hard timeout.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            timeout,
        }
    }
}

/// Captured output of a successful (exit 0) invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ExecError {
    /// The process did not exit within its timeout. Retryable.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit with error text matching a known transient condition
    /// (the radio or socket reporting busy). Retryable.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Non-zero exit with no transient marker (device absent, bad arguments,
    /// host unreachable). Not retried.
    #[error("{0}")]
    Fatal(String),

    /// The process could not be started at all (binary missing, permissions).
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Retryable failures persisted through every allowed attempt.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl ExecError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecError::Timeout(_) | ExecError::Transient(_))
    }
}

/// Error-text markers that indicate a transient condition worth retrying.
/// `iw` surfaces radio contention as "Device or resource busy (-16)".
const TRANSIENT_MARKERS: &[&str] = &["busy", "resource temporarily unavailable", "try again"];

/// Decide whether a non-zero exit is worth another attempt.
pub fn classify(exit_code: Option<i32>, stderr: &str) -> ExecError {
    let lower = stderr.to_lowercase();
    let summary = match stderr.trim() {
        "" => format!("exit code {:?}", exit_code),
        text => format!("exit code {:?}: {}", exit_code, text.trim()),
    };
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        ExecError::Transient(summary)
    } else {
        ExecError::Fatal(summary)
    }
}

/// Runs a single command invocation. Implemented by [`SystemRunner`] in
/// production; tests substitute scripted runners.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// Spawns real processes via tokio, bounded by the spec's timeout.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(program = %spec.program, timeout = ?spec.timeout, "spawning external command");

        let output = tokio::time::timeout(spec.timeout, cmd.output())
            .await
            .map_err(|_| ExecError::Timeout(spec.timeout))?
            .map_err(|e| ExecError::Spawn {
                program: spec.program.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(classify(output.status.code(), &stderr))
        }
    }
}

/// Retry configuration for one logical operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
        }
    }
}

/// Mutable state of one retry loop. Lives only for the duration of a single
/// `run_with_retry` call; `delay` doubles after every retryable failure.
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
    last_error: Option<String>,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts.max(1),
            delay: policy.initial_delay,
            last_error: None,
        }
    }

    fn record_attempt(&mut self) {
        self.attempt += 1;
    }

    fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    fn backoff(&mut self) -> Duration {
        let current = self.delay;
        self.delay *= 2;
        current
    }
}

/// Invoke `spec` through `runner` up to `policy.max_attempts` times.
///
/// Success returns immediately. Retryable failures (timeout, busy) sleep the
/// current backoff delay, double it, and try again while attempts remain.
/// Fatal failures abort on the spot. Exactly one process is started per
/// attempt; if the caller's future is dropped, no further attempt starts.
pub async fn run_with_retry(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    policy: &RetryPolicy,
) -> Result<CommandOutput, ExecError> {
    let mut state = RetryState::new(policy);

    loop {
        state.record_attempt();
        match runner.run(spec).await {
            Ok(output) => {
                debug!(program = %spec.program, attempt = state.attempt, "command succeeded");
                return Ok(output);
            }
            Err(err) if err.is_retryable() => {
                state.last_error = Some(err.to_string());
                if state.exhausted() {
                    return Err(ExecError::Exhausted {
                        attempts: state.attempt,
                        last: state.last_error.unwrap_or_default(),
                    });
                }
                let pause = state.backoff();
                warn!(
                    program = %spec.program,
                    attempt = state.attempt,
                    retry_in = ?pause,
                    error = %err,
                    "transient failure, will retry"
                );
                tokio::time::sleep(pause).await;
            }
            Err(err) => {
                warn!(program = %spec.program, attempt = state.attempt, error = %err, "fatal failure");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of outcomes and counts invocations.
    struct ScriptedRunner {
        script: Mutex<Vec<Result<CommandOutput, ExecError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedRunner {
        fn new(script: Vec<Result<CommandOutput, ExecError>>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, _spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ExecError::Transient("script exhausted".into())))
        }
    }

    fn ok_output(stdout: &str) -> Result<CommandOutput, ExecError> {
        Ok(CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    fn spec() -> CommandSpec {
        CommandSpec::new("probe", &["arg"], Duration::from_secs(10))
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_classify_busy_is_transient() {
        let err = classify(Some(240), "command failed: Device or resource busy (-16)");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_missing_device_is_fatal() {
        let err = classify(Some(237), "command failed: No such device (-19)");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_empty_stderr_is_fatal() {
        // e.g. ping exiting 1 on an unreachable host
        let err = classify(Some(1), "");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let runner = ScriptedRunner::new(vec![ok_output("hello")]);
        let out = run_with_retry(&runner, &spec(), &policy()).await.unwrap();
        assert_eq!(out.stdout, "hello");
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success() {
        let runner = ScriptedRunner::new(vec![
            Err(ExecError::Transient("busy".into())),
            Err(ExecError::Transient("busy".into())),
            ok_output("done"),
        ]);
        let out = run_with_retry(&runner, &spec(), &policy()).await.unwrap();
        assert_eq!(out.stdout, "done");
        assert_eq!(runner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_max_attempts() {
        let runner = ScriptedRunner::new(
            (0..5)
                .map(|_| Err(ExecError::Transient("busy".into())))
                .collect(),
        );
        let start = tokio::time::Instant::now();
        let err = run_with_retry(&runner, &spec(), &policy()).await.unwrap_err();

        assert_eq!(runner.calls(), 5);
        match err {
            ExecError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 5);
                assert!(last.contains("busy"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        // Backoff between 5 attempts: 2 + 4 + 8 + 16 = 30s of sleeping.
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_double_between_attempts() {
        let runner = ScriptedRunner::new(vec![
            Err(ExecError::Timeout(Duration::from_secs(10))),
            Err(ExecError::Timeout(Duration::from_secs(10))),
            Err(ExecError::Timeout(Duration::from_secs(10))),
            ok_output("late"),
        ]);
        let start = tokio::time::Instant::now();
        run_with_retry(&runner, &spec(), &policy()).await.unwrap();
        // 2 + 4 + 8 = 14s before the fourth attempt succeeds.
        assert_eq!(start.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test]
    async fn test_fatal_aborts_immediately() {
        let runner = ScriptedRunner::new(vec![
            Err(ExecError::Fatal("No such device".into())),
            ok_output("never reached"),
        ]);
        let err = run_with_retry(&runner, &spec(), &policy()).await.unwrap_err();
        assert!(matches!(err, ExecError::Fatal(_)));
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let runner = ScriptedRunner::new(vec![Err(ExecError::Transient("busy".into()))]);
        let one_shot = RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::from_secs(2),
        };
        let err = run_with_retry(&runner, &spec(), &one_shot).await.unwrap_err();
        assert!(matches!(err, ExecError::Exhausted { attempts: 1, .. }));
        assert_eq!(runner.calls(), 1);
    }
}
