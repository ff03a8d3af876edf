//! Runtime configuration, read once from the environment at startup and
//! passed explicitly to the components that need it.

use std::time::Duration;

use crate::exec::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret checked by the API layer (`API_KEY`).
    pub api_key: String,
    /// Wireless interface used for scans (`DEVICE`, e.g. "wlan0").
    pub device: String,
    /// Pin speed tests to the alternate server (`SERVERID=true`).
    pub use_alternate_server: bool,
    /// Retry attempts per external command (`MAX_ATTEMPTS`).
    pub max_attempts: u32,
    /// Initial backoff delay, doubled per retry (`RETRY_DELAY_SECS`).
    pub retry_delay: Duration,
    /// Pause between the two scan passes (`SCAN_COOLDOWN_SECS`).
    pub scan_cooldown: Duration,
    /// Hard timeout per external process (`COMMAND_TIMEOUT_SECS`).
    pub command_timeout: Duration,
    /// Advisory freshness window for cached scans (`CACHE_TTL_SECS`).
    pub cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("API_KEY").unwrap_or_default(),
            device: std::env::var("DEVICE").unwrap_or_else(|_| "wlan0".to_string()),
            use_alternate_server: env_bool("SERVERID"),
            max_attempts: env_u32("MAX_ATTEMPTS", 5),
            retry_delay: Duration::from_secs(env_u64("RETRY_DELAY_SECS", 2)),
            scan_cooldown: Duration::from_secs(env_u64("SCAN_COOLDOWN_SECS", 5)),
            command_timeout: Duration::from_secs(env_u64("COMMAND_TIMEOUT_SECS", 60)),
            cache_ttl: Duration::from_secs(env_u64("CACHE_TTL_SECS", 300)),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: self.retry_delay,
        }
    }

    /// Overall per-job deadline: generous enough for the slowest kind, a
    /// two-pass scan where every attempt times out and backs off fully.
    pub fn job_deadline(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let backoff_total = self
            .retry_delay
            .saturating_mul((1u32 << attempts.min(16)) - 1);
        let one_command = self
            .command_timeout
            .saturating_mul(attempts)
            .saturating_add(backoff_total);
        one_command
            .saturating_mul(2)
            .saturating_add(self.scan_cooldown)
            .saturating_add(Duration::from_secs(5))
    }
}

fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
