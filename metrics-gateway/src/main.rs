// metrics-gateway/src/main.rs

//! Metrics gateway binary.
//!
//! This binary exposes the Qubic exporter over HTTP:
//!
//! - `GET /metrics`
//!
//! Each request polls every configured node plus the public RPC API and
//! renders a fresh Prometheus snapshot. There is no background refresh
//! loop and nothing is cached between requests.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use exporter::DefaultAggregator;
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // Refuse to start without a usable node list.
    let cfg = config::load().map_err(|e| format!("invalid configuration: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter(cfg.debug))),
        )
        .init();

    // ---------------------------
    // Probes + aggregator
    // ---------------------------

    let aggregator = DefaultAggregator::from_config(&cfg)
        .map_err(|e| format!("failed to create RPC client: {e}"))?;

    tracing::info!(
        nodes = cfg.nodes.len(),
        rpc = %cfg.network_client.base_url,
        max_concurrent_probes = cfg.aggregator.max_concurrent_probes,
        "exporter configured"
    );
    for target in aggregator.targets() {
        tracing::debug!(node_addr = %target, "polling node");
    }

    let app_state: SharedState<_, _> = Arc::new(AppState { aggregator });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = routes::router(app_state);

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", cfg.listen_addr))?;

    tracing::info!("metrics exporter listening on http://{}/metrics", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("metrics server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
