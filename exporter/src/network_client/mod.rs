//! Clients for the public Qubic RPC API.
//!
//! This module provides the concrete [`crate::aggregator::NetworkProbe`]
//! implementation. It is responsible for talking to the RPC service over
//! HTTP and translating its JSON payloads into
//! [`crate::types::NetworkObservation`] values.

pub mod http;

pub use http::{NetworkClientConfig, RpcNetworkClient};
