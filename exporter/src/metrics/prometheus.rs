//! Snapshot to Prometheus text exposition.
//!
//! This module registers strongly-typed node and network gauges into a
//! fresh [`Registry`] per snapshot and encodes it with the text encoder.

use prometheus::{self, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

use crate::types::{MetricsSnapshot, NetworkObservation, NodeObservation};

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Errors building or encoding a scrape registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to build metrics registry: {0}")]
    Registry(#[from] prometheus::Error),
    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Per-node gauges, labelled by `node_addr`.
struct NodeGauges {
    current_tick: GaugeVec,
    current_epoch: GaugeVec,
    version: GaugeVec,
    initial_tick_this_epoch: GaugeVec,
}

impl NodeGauges {
    fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            current_tick: register_gauge_vec(
                registry,
                "qubic_node_current_tick",
                "Current tick of qubic node",
                &["node_addr"],
            )?,
            current_epoch: register_gauge_vec(
                registry,
                "qubic_node_current_epoch",
                "Current epoch of qubic node",
                &["node_addr"],
            )?,
            version: register_gauge_vec(
                registry,
                "qubic_node_version",
                "Version of qubic node",
                &["node_addr"],
            )?,
            initial_tick_this_epoch: register_gauge_vec(
                registry,
                "qubic_node_initial_tick_this_epoch",
                "Initial tick this epoch of qubic node",
                &["node_addr"],
            )?,
        })
    }

    fn observe(&self, obs: &NodeObservation) {
        let addr = obs.target.to_string();
        let labels = [addr.as_str()];

        self.current_tick
            .with_label_values(&labels)
            .set(f64::from(obs.tick));
        self.current_epoch
            .with_label_values(&labels)
            .set(f64::from(obs.epoch));
        self.initial_tick_this_epoch
            .with_label_values(&labels)
            .set(f64::from(obs.initial_tick_this_epoch));

        // Gauges only hold numbers.
        if let Ok(version) = obs.version.parse::<f64>() {
            self.version.with_label_values(&labels).set(version);
        }
    }
}

fn register_gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
    let gauge = Gauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn register_gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec, prometheus::Error> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Registers the network gauges. Called only when the tick-info call
/// succeeded, so a failed call leaves these families out entirely.
fn register_network(
    registry: &Registry,
    network: &NetworkObservation,
) -> Result<(), prometheus::Error> {
    register_gauge(
        registry,
        "qubic_network_current_tick",
        "Current tick of qubic network",
    )?
    .set(network.tick as f64);
    register_gauge(
        registry,
        "qubic_network_current_epoch",
        "Current epoch of qubic network",
    )?
    .set(network.epoch as f64);
    register_gauge(
        registry,
        "qubic_network_initial_tick_this_epoch",
        "Initial tick this epoch of qubic network",
    )?
    .set(network.initial_tick_this_epoch as f64);

    if let Some(version) = network.version.as_deref().and_then(|v| v.parse::<f64>().ok()) {
        register_gauge(registry, "qubic_network_version", "Version of qubic network")?
            .set(version);
    }

    let computor = register_gauge_vec(
        registry,
        "qubic_network_computor",
        "Computor of qubic network",
        &["epoch", "computor_id"],
    )?;
    let epoch = network.computors_epoch.to_string();
    for id in &network.computors {
        computor
            .with_label_values(&[epoch.as_str(), id.as_str()])
            .set(1.0);
    }

    Ok(())
}

/// Builds a registry holding exactly the metrics of `snapshot`.
///
/// Families without any sample are dropped by [`Registry::gather`], so an
/// all-failure snapshot gathers to nothing.
pub fn build_registry(snapshot: &MetricsSnapshot) -> Result<Registry, prometheus::Error> {
    let registry = Registry::new();

    let nodes = NodeGauges::register(&registry)?;
    for obs in snapshot.observed_nodes() {
        nodes.observe(obs);
    }

    if let Some(network) = &snapshot.network {
        register_network(&registry, network)?;
    }

    Ok(registry)
}

/// Encodes `snapshot` into the Prometheus text format.
pub fn render_snapshot(snapshot: &MetricsSnapshot) -> Result<String, MetricsError> {
    let registry = build_registry(snapshot)?;

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
