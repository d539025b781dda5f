use std::time::Duration;

use thiserror::Error;

/// Failure of a single probe call against a node or the public API.
///
/// Probe errors never escape a scrape: the aggregator records them in the
/// snapshot, logs them and moves on.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Could not open a connection to the endpoint.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    /// I/O failure after the connection was established.
    #[error("I/O error talking to {endpoint}: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    /// The endpoint did not answer within the configured timeout.
    #[error("{endpoint} did not respond within {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    /// The endpoint answered with something we could not decode.
    #[error("malformed response from {endpoint}: {reason}")]
    Protocol { endpoint: String, reason: String },
    /// HTTP transport failure (DNS, TLS, connection reset, timeout).
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The public API answered with a non-success status.
    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },
}

impl ProbeError {
    /// Returns `true` for failures caused by the configured timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ProbeError::Timeout { .. } => true,
            ProbeError::Http { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
