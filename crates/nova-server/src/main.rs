//! # nova-server
//!
//! HTTP front door for Nova.
//!
//! This binary provides:
//! - **Health, status and version endpoints** for monitoring
//! - **Actions handshake** so clients can discover the supported domains
//! - **A uniform JSON envelope** for every success and error response
//! - **Lazily initialized persistence**: the server starts and answers
//!   without a database, and connects on first use

mod api;
mod config;
mod error;
mod logging;
mod middleware;

use nova_store::Persistence;
use tracing::info;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Load configuration and initialize logging
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    let _log_guard = logging::init(&config.log_dir, &config.log_level)?;
    config.log_warnings();

    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 2. Persistence context (no connection is made until first use)
    // -----------------------------------------------------------------------
    let persistence =
        Persistence::from_config(config.database_url.as_deref(), config.pool.clone());
    info!(
        database = persistence.status().as_str(),
        "Persistence configured"
    );

    info!(
        event_type = "startup",
        environment = %config.environment,
        version = %config.version.version,
        addr = %config.http_addr,
        "Nova starting"
    );

    // -----------------------------------------------------------------------
    // 3. Run the HTTP API server (blocks until Ctrl+C)
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let result = api::serve(AppState::new(config, persistence.clone()), http_addr).await;

    persistence.close();
    info!(event_type = "shutdown", "Nova stopped");

    if let Err(e) = &result {
        tracing::error!(error = %e, "HTTP server failed");
    }
    result
}
