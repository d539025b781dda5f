use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::aggregator::ProbeError;
use crate::aggregator::probe::{NetworkProbe, NodeProbe};
use crate::types::{MetricsSnapshot, NetworkObservation, NodeReport, NodeTarget};

/// Tuning knobs for [`SnapshotAggregator`].
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// Upper bound on node probes in flight during one scrape.
    pub max_concurrent_probes: usize,
    /// Deadline for every node probe, measured from the start of the scrape.
    /// Time spent waiting for a permit counts against it.
    pub probe_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: 16,
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Builds one [`MetricsSnapshot`] per scrape.
///
/// The aggregator holds no per-scrape state: every call to
/// [`collect`](Self::collect) probes all nodes and the public API from
/// scratch, so overlapping scrapes never observe each other's results.
///
/// Failure policy:
///
/// - a failing node is logged and reported in the snapshot, and never
///   affects the other nodes;
/// - a failing network tick-info call drops all network metrics,
///   including the roster;
/// - the roster is only fetched for a positive epoch.
pub struct SnapshotAggregator<N, P> {
    cfg: AggregatorConfig,
    targets: Vec<NodeTarget>,
    nodes: N,
    network: P,
}

impl<N, P> SnapshotAggregator<N, P> {
    /// Constructs an aggregator over a fixed, ordered list of node targets.
    pub fn new(cfg: AggregatorConfig, targets: Vec<NodeTarget>, nodes: N, network: P) -> Self {
        Self {
            cfg,
            targets,
            nodes,
            network,
        }
    }

    /// Returns the configured targets in probe order.
    pub fn targets(&self) -> &[NodeTarget] {
        &self.targets
    }
}

impl<N, P> SnapshotAggregator<N, P>
where
    N: NodeProbe,
    P: NetworkProbe,
{
    /// Probes every node and the public API and assembles the results.
    ///
    /// Never fails: an all-failure scrape yields a snapshot with every node
    /// report in the error state and no network observation.
    pub async fn collect(&self) -> MetricsSnapshot {
        let (nodes, network) = tokio::join!(self.probe_nodes(), self.probe_network());
        let snapshot = MetricsSnapshot { nodes, network };

        debug!(
            targets = self.targets.len(),
            observed = snapshot.observed_nodes().count(),
            failed = snapshot.failed_nodes().count(),
            network = snapshot.network.is_some(),
            "scrape collected"
        );

        snapshot
    }

    async fn probe_nodes(&self) -> Vec<NodeReport> {
        // Scoped to this scrape so concurrent scrapes do not share permits.
        let permits = Semaphore::new(self.cfg.max_concurrent_probes.max(1));
        let deadline = Instant::now() + self.cfg.probe_timeout;
        let probes = self
            .targets
            .iter()
            .map(|target| self.probe_node(target, &permits, deadline));

        // join_all keeps the output in target order.
        join_all(probes).await
    }

    async fn probe_node(
        &self,
        target: &NodeTarget,
        permits: &Semaphore,
        deadline: Instant,
    ) -> NodeReport {
        let probe = async {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = permits.acquire().await.ok();
            self.nodes.probe(target).await
        };

        // Queued probes share the scrape deadline, so the scrape as a whole
        // waits at most one timeout period.
        let outcome = match tokio::time::timeout_at(deadline, probe).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout {
                endpoint: target.to_string(),
                timeout: self.cfg.probe_timeout,
            }),
        };
        if let Err(e) = &outcome {
            warn!(node_addr = %target, error = %e, "failed to fetch node info");
        }

        NodeReport {
            target: target.clone(),
            outcome,
        }
    }

    async fn probe_network(&self) -> Option<NetworkObservation> {
        let mut network = match self.network.tick_info().await {
            Ok(network) => network,
            Err(e) => {
                warn!(error = %e, "failed to fetch network tick info");
                return None;
            }
        };

        if network.has_roster_epoch() {
            match self.network.computors(network.epoch).await {
                Ok(computors) => {
                    network.computors = computors;
                    network.computors_epoch = network.epoch;
                }
                Err(e) => {
                    warn!(epoch = network.epoch, error = %e, "failed to fetch computor roster");
                }
            }
        }

        Some(network)
    }
}
