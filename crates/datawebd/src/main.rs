//! Dataweb daemon - instrument status for browser clients.
//!
//! Polls every configured instrument's status pages, caches the latest
//! reading per instrument, and serves the cache over a JSONP endpoint.

use anyhow::{Context, Result};
use clap::Parser;
use datawebd::cache::ReadingCache;
use datawebd::config::{Config, CONFIG_PATH};
use datawebd::fetch::PageFetcher;
use datawebd::poller::{PollIntervals, PollerSet};
use datawebd::server;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "datawebd")]
#[command(about = "Instrument status poller and JSONP query server", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Override the listen address from the configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("datawebd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load(&cli.config);
    let bind_address = cli.bind.unwrap_or_else(|| config.bind_address.clone());
    let instruments = config.instrument_list();
    info!("Monitoring {} instruments", instruments.len());

    let cache = ReadingCache::new();
    let fetcher = Arc::new(PageFetcher::new(Duration::from_secs(
        config.intervals.fetch_timeout_secs,
    )));
    let pollers = PollerSet::spawn(
        &instruments,
        fetcher,
        cache.clone(),
        PollIntervals::from(&config.intervals),
    );

    server::run(&bind_address, cache, shutdown_signal())
        .await
        .with_context(|| format!("query server failed on {}", bind_address))?;

    // The server has stopped accepting connections; now stop the pollers
    // and wait for each to finish before exiting.
    pollers.shutdown().await;
    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
