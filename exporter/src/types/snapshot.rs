//! Per-scrape metrics snapshot.

use crate::aggregator::ProbeError;
use crate::types::{NetworkObservation, NodeObservation, NodeTarget};

/// Outcome of probing one configured node.
///
/// A failed probe is kept in the snapshot so callers can see which
/// targets were skipped; it simply contributes no metrics.
#[derive(Debug)]
pub struct NodeReport {
    pub target: NodeTarget,
    pub outcome: Result<NodeObservation, ProbeError>,
}

impl NodeReport {
    /// Returns the observation if the probe succeeded.
    pub fn observation(&self) -> Option<&NodeObservation> {
        self.outcome.as_ref().ok()
    }
}

/// Everything gathered during one scrape.
///
/// `nodes` holds exactly one report per configured target, in
/// configuration order. `network` is `None` when the tick-info call
/// failed, in which case no network or computor metrics are published.
#[derive(Debug, Default)]
pub struct MetricsSnapshot {
    pub nodes: Vec<NodeReport>,
    pub network: Option<NetworkObservation>,
}

impl MetricsSnapshot {
    /// Successful node observations, in configuration order.
    pub fn observed_nodes(&self) -> impl Iterator<Item = &NodeObservation> {
        self.nodes.iter().filter_map(NodeReport::observation)
    }

    /// Targets whose probe failed, paired with the cause.
    pub fn failed_nodes(&self) -> impl Iterator<Item = (&NodeTarget, &ProbeError)> {
        self.nodes
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (&r.target, e)))
    }

    /// Returns `true` if nothing at all would be published.
    pub fn is_empty(&self) -> bool {
        self.network.is_none() && self.observed_nodes().next().is_none()
    }
}
