//! HTTP-based network probe.
//!
//! The RPC service exposes, among others:
//!
//! ```json
//! GET /v1/tick-info
//! { "tickInfo": { "tick": 200, "duration": 1, "epoch": 5, "initialTick": 150 } }
//!
//! GET /v1/epochs/5/computors
//! { "computors": { "epoch": 5, "identities": ["ID_A", "ID_B"], "signatureHex": "..." } }
//! ```
//!
//! Only the fields above are read; anything else in the payload is
//! ignored.

use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::aggregator::{NetworkProbe, ProbeError};
use crate::types::NetworkObservation;

/// Configuration for [`RpcNetworkClient`].
#[derive(Clone, Debug)]
pub struct NetworkClientConfig {
    /// Base URL of the RPC service, e.g. `"https://rpc.qubic.org"`.
    pub base_url: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl Default for NetworkClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rpc.qubic.org".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Network probe backed by the public RPC API.
///
/// Holds one pooled `reqwest` client; cloning is cheap and shares the
/// pool. Every call is a single attempt with no retry.
#[derive(Clone, Debug)]
pub struct RpcNetworkClient {
    base_url: String,
    client: Client,
}

impl RpcNetworkClient {
    pub fn new(cfg: NetworkClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            base_url: cfg.base_url,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        // Avoid accidental double slashes.
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProbeError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|source| ProbeError::Http {
                url: url.to_string(),
                source,
            })
    }
}

#[derive(Debug, Deserialize)]
struct TickInfoResponse {
    #[serde(rename = "tickInfo")]
    tick_info: TickInfoBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TickInfoBody {
    tick: u64,
    epoch: u64,
    initial_tick: u64,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComputorsResponse {
    computors: ComputorsBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComputorsBody {
    identities: Vec<String>,
}

fn decode_error(url: &str, source: reqwest::Error) -> ProbeError {
    ProbeError::Protocol {
        endpoint: url.to_string(),
        reason: source.to_string(),
    }
}

impl NetworkProbe for RpcNetworkClient {
    async fn tick_info(&self) -> Result<NetworkObservation, ProbeError> {
        let url = self.endpoint("/v1/tick-info");
        let resp = self.get(&url).await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = resp
            .json::<TickInfoResponse>()
            .await
            .map_err(|e| decode_error(&url, e))?
            .tick_info;

        Ok(NetworkObservation {
            tick: body.tick,
            epoch: body.epoch,
            initial_tick_this_epoch: body.initial_tick,
            version: body.version,
            ..Default::default()
        })
    }

    async fn computors(&self, epoch: u64) -> Result<BTreeSet<String>, ProbeError> {
        let url = self.endpoint(&format!("/v1/epochs/{epoch}/computors"));
        let resp = self.get(&url).await?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "no computor roster available");
            return Ok(BTreeSet::new());
        }

        let body = resp
            .json::<ComputorsResponse>()
            .await
            .map_err(|e| decode_error(&url, e))?;

        Ok(body.computors.identities.into_iter().collect())
    }
}
