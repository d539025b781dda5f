//! Core domain types used by the exporter.
//!
//! This module defines the configured node targets and the observations
//! gathered from nodes and from the public network API. Observations are
//! built fresh for every scrape and never mutated afterwards; the
//! per-scrape aggregate lives in [`snapshot`].

use std::collections::BTreeSet;
use std::fmt;

/// Per-scrape aggregate of node and network observations.
pub mod snapshot;

pub use snapshot::{MetricsSnapshot, NodeReport};

/// A single Qubic node endpoint to poll.
///
/// The ordered list of targets is loaded once at startup and stays fixed
/// for the lifetime of the process.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeTarget {
    /// IP address or host name of the node.
    pub address: String,
    /// TCP port of the node's peer protocol (usually 21841).
    pub port: u16,
}

impl NodeTarget {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

/// Renders as `address:port`, which is also the `node_addr` label value.
impl fmt::Display for NodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Tick and system status reported by one node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeObservation {
    /// Node this observation was taken from.
    pub target: NodeTarget,
    /// Current tick as seen by the node.
    pub tick: u32,
    /// Current epoch as seen by the node.
    pub epoch: u16,
    /// Software version reported in the node's system info.
    pub version: String,
    /// First tick of the current epoch.
    pub initial_tick_this_epoch: u32,
}

/// Network-wide status as reported by the public RPC API.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NetworkObservation {
    pub tick: u64,
    pub epoch: u64,
    pub initial_tick_this_epoch: u64,
    /// Not every API revision reports a version.
    pub version: Option<String>,
    /// Computor identities for `computors_epoch`. Empty when no roster was
    /// fetched or the API had none.
    pub computors: BTreeSet<String>,
    pub computors_epoch: u64,
}

impl NetworkObservation {
    /// Returns `true` if the epoch is a valid key for a computor roster.
    pub fn has_roster_epoch(&self) -> bool {
        self.epoch > 0
    }
}
