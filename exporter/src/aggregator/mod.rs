//! Snapshot aggregation and the probe seams it drives.
//!
//! This module provides:
//!
//! - the probe traits ([`probe::NodeProbe`], [`probe::NetworkProbe`]) that
//!   the node and network clients implement,
//! - the probe error taxonomy ([`error::ProbeError`]),
//! - the per-scrape orchestrator ([`engine::SnapshotAggregator`]).

pub mod engine;
pub mod error;
pub mod probe;

pub use engine::{AggregatorConfig, SnapshotAggregator};
pub use error::ProbeError;
pub use probe::{NetworkProbe, NodeProbe};
