//! Exporter library crate.
//!
//! This crate provides the polling and aggregation core of the Qubic
//! metrics exporter:
//!
//! - domain types for targets, observations and snapshots (`types`),
//! - the per-scrape orchestrator and its probe seams (`aggregator`),
//! - the Qubic peer-protocol client (`node_client`),
//! - the public RPC API client (`network_client`),
//! - Prometheus rendering of snapshots (`metrics`),
//! - and environment-driven configuration (`config`).
//!
//! A binary composes these into a pull-based `/metrics` endpoint: every
//! scrape calls [`SnapshotAggregator::collect`] and renders the result
//! with [`render_snapshot`].

pub mod aggregator;
pub mod config;
pub mod metrics;
pub mod network_client;
pub mod node_client;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ConfigError, ExporterConfig};

// Re-export the aggregator and its seams.
pub use aggregator::{AggregatorConfig, NetworkProbe, NodeProbe, ProbeError, SnapshotAggregator};

// Re-export the production probe implementations.
pub use network_client::{NetworkClientConfig, RpcNetworkClient};
pub use node_client::{NodeClientConfig, QubicNodeClient};

// Re-export rendering.
pub use metrics::{CONTENT_TYPE, MetricsError, render_snapshot};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the aggregator stack used by a running exporter.
///
/// This composes:
///
/// - [`QubicNodeClient`] for per-node probes, and
/// - [`RpcNetworkClient`] for network tick info and computor rosters.
pub type DefaultAggregator = SnapshotAggregator<QubicNodeClient, RpcNetworkClient>;

impl DefaultAggregator {
    /// Wires the production probes from an [`ExporterConfig`].
    pub fn from_config(cfg: &ExporterConfig) -> Result<Self, reqwest::Error> {
        let network = RpcNetworkClient::new(cfg.network_client.clone())?;
        let nodes = QubicNodeClient::new(cfg.node_client.clone());
        Ok(SnapshotAggregator::new(
            cfg.aggregator.clone(),
            cfg.nodes.clone(),
            nodes,
            network,
        ))
    }
}
