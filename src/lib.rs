//! netmedic -- authenticated network diagnostics for a single host.
//!
//! Exposes ping, TCP port checks, speed tests, and Wi-Fi access-point
//! discovery behind a small HTTP API. The interesting part is the
//! orchestration core: external diagnostic tools are slow, noisy, and fight
//! over exclusive hardware (one radio, one wire), so every job runs through
//! per-resource locking, bounded retry with exponential backoff, and a
//! last-known-good cache for scan results.

pub mod api;
pub mod cache;
pub mod config;
pub mod exec;
pub mod jobs;
pub mod locks;
pub mod probes;
pub mod wifi;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;

/// Start the netmedic daemon: wire up the lock manager, cache, and
/// dispatcher, then serve the API until shutdown.
pub async fn serve(bind: &str, config: Config) -> Result<()> {
    let runner: Arc<dyn exec::CommandRunner> = Arc::new(exec::SystemRunner);
    let locks = locks::LockManager::new();
    let cache = Arc::new(cache::ResultCache::new(config.cache_ttl));
    let dispatcher = Arc::new(jobs::Dispatcher::new(
        &config,
        runner,
        Arc::clone(&cache),
        locks,
    ));

    let state = api::AppState {
        dispatcher,
        cache,
        api_key: config.api_key.clone(),
        use_alternate_server: config.use_alternate_server,
        job_timeout: config.job_deadline(),
    };
    let app = api::router(state);

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(%addr, device = %config.device, "netmedic listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
