//! Client for the Qubic node peer protocol.
//!
//! This module provides the concrete [`crate::aggregator::NodeProbe`]
//! implementation used in production. It opens one TCP session per probe,
//! asks for the current tick info and the system info, and closes the
//! session again.

pub mod tcp;
pub mod wire;

pub use tcp::{NodeClientConfig, QubicNodeClient};
