//! Top-level configuration for the exporter.
//!
//! This module aggregates configuration for:
//!
//! - the node list to poll (`QUBIC_NODE_LIST`, required),
//! - the node wire client (`NodeClientConfig`),
//! - the public RPC client (`NetworkClientConfig`),
//! - the snapshot aggregator (`AggregatorConfig`),
//! - the HTTP listener and log verbosity.
//!
//! Everything is read from environment variables. [`ExporterConfig::from_lookup`]
//! takes an arbitrary key lookup so parsing can be exercised without
//! touching the process environment.

use std::fmt::Display;
use std::net::{Ipv4Addr, SocketAddr};
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::aggregator::AggregatorConfig;
use crate::network_client::NetworkClientConfig;
use crate::node_client::NodeClientConfig;
use crate::types::NodeTarget;

pub const NODE_LIST_VAR: &str = "QUBIC_NODE_LIST";
pub const DEBUG_VAR: &str = "DEBUG";
pub const SERVER_PORT_VAR: &str = "SERVER_PORT";
pub const RPC_URL_VAR: &str = "QUBIC_RPC_URL";
pub const RPC_TIMEOUT_VAR: &str = "QUBIC_RPC_TIMEOUT_SECS";
pub const NODE_TIMEOUT_VAR: &str = "QUBIC_NODE_TIMEOUT_SECS";
pub const PROBE_CONCURRENCY_VAR: &str = "QUBIC_PROBE_CONCURRENCY";

pub const DEFAULT_SERVER_PORT: u16 = 8004;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error getting node list: {var} is not set")]
    MissingNodeList { var: &'static str },
    #[error("invalid node entry {entry:?}: {reason}")]
    InvalidNodeEntry { entry: String, reason: &'static str },
    #[error("invalid port in node entry {entry:?}: {source}")]
    InvalidPort {
        entry: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level configuration for the exporter process.
#[derive(Clone, Debug)]
pub struct ExporterConfig {
    /// Nodes to poll, in scrape order. Never empty.
    pub nodes: Vec<NodeTarget>,
    /// Enables debug-level logging.
    pub debug: bool,
    /// Address the `/metrics` endpoint binds to.
    pub listen_addr: SocketAddr,
    pub node_client: NodeClientConfig,
    pub network_client: NetworkClientConfig,
    pub aggregator: AggregatorConfig,
}

impl ExporterConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` if it is unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let nodes = parse_node_list(lookup(NODE_LIST_VAR).as_deref())?;
        let debug = lookup(DEBUG_VAR).is_some_and(|v| parse_flag(&v));

        let port = parse_var(&lookup, SERVER_PORT_VAR, DEFAULT_SERVER_PORT)?;
        let listen_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let node_client = NodeClientConfig {
            timeout: parse_secs(&lookup, NODE_TIMEOUT_VAR, NodeClientConfig::default().timeout)?,
        };

        let network_defaults = NetworkClientConfig::default();
        let network_client = NetworkClientConfig {
            base_url: lookup(RPC_URL_VAR)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(network_defaults.base_url),
            timeout: parse_secs(&lookup, RPC_TIMEOUT_VAR, network_defaults.timeout)?,
        };

        let max_concurrent_probes = parse_var(
            &lookup,
            PROBE_CONCURRENCY_VAR,
            AggregatorConfig::default().max_concurrent_probes,
        )?;
        if max_concurrent_probes == 0 {
            return Err(ConfigError::InvalidValue {
                var: PROBE_CONCURRENCY_VAR,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        // The whole exchange with a node, queueing included, gets the node
        // timeout.
        let probe_timeout = node_client.timeout;

        Ok(Self {
            nodes,
            debug,
            listen_addr,
            node_client,
            network_client,
            aggregator: AggregatorConfig {
                max_concurrent_probes,
                probe_timeout,
            },
        })
    }
}

/// Parses a comma-separated `address:port` list.
///
/// Blank entries (e.g. a trailing comma) are ignored. A missing or
/// effectively empty list is an error.
pub fn parse_node_list(raw: Option<&str>) -> Result<Vec<NodeTarget>, ConfigError> {
    let missing = ConfigError::MissingNodeList {
        var: NODE_LIST_VAR,
    };
    let raw = raw.ok_or(missing)?;

    let nodes = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_node_entry)
        .collect::<Result<Vec<_>, _>>()?;

    if nodes.is_empty() {
        return Err(ConfigError::MissingNodeList {
            var: NODE_LIST_VAR,
        });
    }
    Ok(nodes)
}

fn parse_node_entry(entry: &str) -> Result<NodeTarget, ConfigError> {
    let invalid = |reason| ConfigError::InvalidNodeEntry {
        entry: entry.to_string(),
        reason,
    };

    let (address, port) = entry
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected address:port"))?;
    let address = address.trim();
    if address.is_empty() {
        return Err(invalid("address is empty"));
    }

    let port: u16 = port
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidPort {
            entry: entry.to_string(),
            source,
        })?;
    if port == 0 {
        return Err(invalid("port must be between 1 and 65535"));
    }

    Ok(NodeTarget::new(address, port))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "True" | "true" | "TRUE" | "1" | "yes")
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
                value,
            }),
    }
}

fn parse_secs<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_var(lookup, var, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            var,
            value: "0".to_string(),
            reason: "timeout must be positive".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
