//! TCP port check via `nc -zv`.

use std::time::Duration;

use serde::Serialize;

use crate::exec::{run_with_retry, CommandRunner, CommandSpec, ExecError, RetryPolicy};

#[derive(Debug, Clone, Serialize)]
pub struct TcpReport {
    pub host: String,
    pub port: u16,
    pub open: bool,
}

/// Attempt a zero-I/O connect to `host:port`. A refused or filtered port
/// exits non-zero and propagates as a fatal error; `open` is therefore
/// always true on the success path.
pub async fn run(
    runner: &dyn CommandRunner,
    host: &str,
    port: u16,
    policy: &RetryPolicy,
    timeout: Duration,
) -> Result<TcpReport, ExecError> {
    let wait_secs = timeout.as_secs().max(1).to_string();
    let port_str = port.to_string();
    let spec = CommandSpec::new(
        "nc",
        &["-z", "-v", "-w", &wait_secs, host, &port_str],
        timeout,
    );

    run_with_retry(runner, &spec, policy).await?;

    Ok(TcpReport {
        host: host.to_string(),
        port,
        open: true,
    })
}
