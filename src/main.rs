//! # Listing Feed
//!
//! Turns paginated HTML listing pages into RSS or JSON feeds and serves them
//! over HTTP, while keeping process-wide request telemetry.
//!
//! ## Usage
//!
//! ```sh
//! listing_feed --listen 0.0.0.0:1200
//! curl 'http://localhost:1200/zjzs/info/11?pages=2'
//! ```
//!
//! ## Architecture
//!
//! Each feed request runs a small pipeline:
//! 1. **Paging**: fetch the requested listing pages concurrently, in order
//! 2. **Extraction**: pull title, link and date label out of each page
//! 3. **Assembly**: normalize dates, drop untitled entries, build the feed
//! 4. **Output**: render RSS 2.0 or JSON Feed, cache it, tag it with an ETag
//!
//! Every request is reported to the telemetry counters, which the landing
//! page summarizes as ratios and hot lists.

use clap::Parser;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod assemble;
mod cache;
mod cli;
mod dates;
mod error;
mod fetch;
mod models;
mod outputs;
mod pager;
mod pipeline;
mod scrapers;
mod server;
mod telemetry;
mod utils;

use cli::Cli;
use fetch::HttpFetcher;
use server::{AppState, Settings, app_router};
use telemetry::{CounterSet, NoopTelemetry, Telemetry};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("listing_feed starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");
    if let Err(e) = args.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    let fetcher = HttpFetcher::new(args.request_timeout(), &args.user_agent)?;
    let telemetry: Arc<dyn Telemetry> = if args.disable_telemetry {
        info!("Request telemetry disabled");
        Arc::new(NoopTelemetry::default())
    } else {
        Arc::new(CounterSet::new())
    };
    let state = AppState::new(
        Arc::new(fetcher),
        telemetry,
        Settings::from(&args),
        args.cache_max_entries,
    );

    let addr: SocketAddr = args.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        cache_expire_secs = args.cache_expire,
        max_pages = args.max_pages,
        response_timeout_secs = args.response_timeout,
        "Listening"
    );

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

/// Resolves on Ctrl-C; in-flight upstream fetches are dropped with their requests.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
