use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use netmedic::api::outcome_json;
use netmedic::cache::ResultCache;
use netmedic::config::Config;
use netmedic::exec::SystemRunner;
use netmedic::jobs::{Dispatcher, JobOutcome, JobRequest};
use netmedic::locks::LockManager;

#[derive(Parser)]
#[command(
    name = "netmedic",
    about = "Authenticated network diagnostics: probes, speed tests, Wi-Fi scans",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + job dispatcher)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// Ping a host once
    Ping {
        /// Target host or IP
        host: String,
    },

    /// Check whether a TCP port accepts connections
    TcpCheck {
        /// Target host or IP
        host: String,
        /// Target port
        port: u16,
    },

    /// Run a bandwidth measurement via speedtest-cli
    SpeedTest {
        /// Pin the test to the alternate server
        #[arg(long)]
        alternate_server: bool,
    },

    /// Run a two-pass Wi-Fi access-point scan
    Scan,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(%bind, "starting netmedic daemon");
            netmedic::serve(&bind, config).await?;
        }
        Commands::Ping { host } => {
            run_once(config, JobRequest::ping(host)).await?;
        }
        Commands::TcpCheck { host, port } => {
            run_once(config, JobRequest::tcp_check(host, port)).await?;
        }
        Commands::SpeedTest { alternate_server } => {
            let use_alternate = alternate_server || config.use_alternate_server;
            run_once(config, JobRequest::speed_test(use_alternate)).await?;
        }
        Commands::Scan => {
            run_once(config, JobRequest::scan()).await?;
        }
    }

    Ok(())
}

/// One-shot mode: build a dispatcher with fresh locks, run a single job,
/// print the same JSON body the API would return.
async fn run_once(config: Config, request: JobRequest) -> Result<()> {
    let cache = Arc::new(ResultCache::new(config.cache_ttl));
    let dispatcher = Dispatcher::new(&config, Arc::new(SystemRunner), cache, LockManager::new());

    let outcome = tokio::time::timeout(config.job_deadline(), dispatcher.submit(request))
        .await
        .unwrap_or_else(|_| JobOutcome::Error("job deadline exceeded".into()));

    println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);

    match outcome {
        JobOutcome::Success(_) => Ok(()),
        JobOutcome::Busy => anyhow::bail!("resource busy"),
        JobOutcome::Error(msg) => anyhow::bail!(msg),
    }
}
