use std::collections::BTreeSet;
use std::future::Future;

use crate::aggregator::ProbeError;
use crate::types::{NetworkObservation, NodeObservation, NodeTarget};

/// Fetches tick and system status from a single node.
///
/// Implementations must release any connection they open before the
/// returned future completes, whether the probe succeeds or fails, and
/// must not retry.
pub trait NodeProbe: Send + Sync {
    fn probe(
        &self,
        target: &NodeTarget,
    ) -> impl Future<Output = Result<NodeObservation, ProbeError>> + Send;
}

/// Fetches network-wide status from the public API.
pub trait NetworkProbe: Send + Sync {
    /// Current network tick, epoch and initial tick of the epoch.
    ///
    /// The returned observation has an empty roster; the aggregator fills
    /// it in via [`NetworkProbe::computors`].
    fn tick_info(&self) -> impl Future<Output = Result<NetworkObservation, ProbeError>> + Send;

    /// Computor identities for `epoch`.
    ///
    /// A non-success HTTP status yields an empty set rather than an error:
    /// rosters are routinely missing for epochs that are not finalized yet.
    fn computors(
        &self,
        epoch: u64,
    ) -> impl Future<Output = Result<BTreeSet<String>, ProbeError>> + Send;
}
