//! TCP implementation of [`NodeProbe`].

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use crate::aggregator::{NodeProbe, ProbeError};
use crate::node_client::wire::{
    HEADER_LEN, PacketHeader, REQUEST_CURRENT_TICK_INFO, REQUEST_SYSTEM_INFO,
    RESPOND_CURRENT_TICK_INFO, RESPOND_SYSTEM_INFO, SystemInfo, TickInfo, WireError,
};
use crate::types::{NodeObservation, NodeTarget};

/// Unsolicited packets tolerated while waiting for a response.
const MAX_SKIPPED_PACKETS: usize = 64;

/// Configuration for [`QubicNodeClient`].
#[derive(Clone, Debug)]
pub struct NodeClientConfig {
    /// Budget for the whole probe: connect plus both requests.
    pub timeout: Duration,
}

impl Default for NodeClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Probes Qubic nodes over their peer protocol.
///
/// The client itself is stateless and can be shared freely; every probe
/// opens and closes its own [`NodeSession`].
#[derive(Clone, Debug, Default)]
pub struct QubicNodeClient {
    cfg: NodeClientConfig,
}

impl QubicNodeClient {
    pub fn new(cfg: NodeClientConfig) -> Self {
        Self { cfg }
    }

    async fn exchange(&self, target: &NodeTarget) -> Result<NodeObservation, ProbeError> {
        let mut session = NodeSession::connect(target).await?;
        let tick = session.tick_info().await?;
        let system = session.system_info().await?;

        Ok(NodeObservation {
            target: target.clone(),
            tick: tick.tick,
            epoch: tick.epoch,
            version: system.version.to_string(),
            initial_tick_this_epoch: system.initial_tick,
        })
    }
}

impl NodeProbe for QubicNodeClient {
    async fn probe(&self, target: &NodeTarget) -> Result<NodeObservation, ProbeError> {
        // Timing out drops the exchange future and with it the session.
        match tokio::time::timeout(self.cfg.timeout, self.exchange(target)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout {
                endpoint: target.to_string(),
                timeout: self.cfg.timeout,
            }),
        }
    }
}

/// One open connection to a node.
///
/// The socket is closed when the session is dropped, which happens on
/// every exit path of a probe.
struct NodeSession {
    stream: TcpStream,
    endpoint: String,
}

impl NodeSession {
    async fn connect(target: &NodeTarget) -> Result<Self, ProbeError> {
        let endpoint = target.to_string();
        let stream = TcpStream::connect((target.address.as_str(), target.port))
            .await
            .map_err(|source| ProbeError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        trace!(node_addr = %endpoint, "node session opened");
        Ok(Self { stream, endpoint })
    }

    async fn tick_info(&mut self) -> Result<TickInfo, ProbeError> {
        let payload = self
            .request(REQUEST_CURRENT_TICK_INFO, RESPOND_CURRENT_TICK_INFO)
            .await?;
        TickInfo::decode(&payload).map_err(|e| self.protocol(e))
    }

    async fn system_info(&mut self) -> Result<SystemInfo, ProbeError> {
        let payload = self
            .request(REQUEST_SYSTEM_INFO, RESPOND_SYSTEM_INFO)
            .await?;
        SystemInfo::decode(&payload).map_err(|e| self.protocol(e))
    }

    /// Sends a payload-less request and returns the payload of the first
    /// packet of type `expect`.
    async fn request(&mut self, kind: u8, expect: u8) -> Result<Vec<u8>, ProbeError> {
        // Zero is reserved for packets that nodes rebroadcast.
        let dejavu = rand::random::<u32>().max(1);
        let header = PacketHeader::request(kind, dejavu).encode();
        self.stream
            .write_all(&header)
            .await
            .map_err(|e| self.io(e))?;

        for _ in 0..=MAX_SKIPPED_PACKETS {
            let (header, payload) = self.read_packet().await?;
            // Responses echo the request nonce; anything else is stale or
            // relayed traffic.
            if header.kind == expect && header.dejavu == dejavu {
                return Ok(payload);
            }
            trace!(
                node_addr = %self.endpoint,
                kind = header.kind,
                size = header.size,
                dejavu = header.dejavu,
                "skipping unrelated packet"
            );
        }

        Err(ProbeError::Protocol {
            endpoint: self.endpoint.clone(),
            reason: format!(
                "no packet of type {expect} after {MAX_SKIPPED_PACKETS} unrelated packets"
            ),
        })
    }

    async fn read_packet(&mut self) -> Result<(PacketHeader, Vec<u8>), ProbeError> {
        let mut buf = [0u8; HEADER_LEN];
        self.stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| self.io(e))?;
        let header = PacketHeader::decode(&buf).map_err(|e| self.protocol(e))?;

        let mut payload = vec![0u8; header.payload_len()];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(|e| self.io(e))?;

        Ok((header, payload))
    }

    fn io(&self, source: std::io::Error) -> ProbeError {
        ProbeError::Io {
            endpoint: self.endpoint.clone(),
            source,
        }
    }

    fn protocol(&self, err: WireError) -> ProbeError {
        ProbeError::Protocol {
            endpoint: self.endpoint.clone(),
            reason: err.to_string(),
        }
    }
}

impl Drop for NodeSession {
    fn drop(&mut self) {
        trace!(node_addr = %self.endpoint, "node session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_client::wire::EXCHANGE_PUBLIC_PEERS;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// How the fake node answers system-info requests.
    enum SystemReply {
        Full,
        Truncated,
        /// A response with someone else's nonce precedes the real one.
        StaleFirst,
    }

    fn packet(kind: u8, dejavu: u32, payload: &[u8]) -> Vec<u8> {
        let header = PacketHeader {
            size: HEADER_LEN + payload.len(),
            kind,
            dejavu,
        };
        let mut out = header.encode().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn tick_info_payload(tick: u32, epoch: u16, initial_tick: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&1000u16.to_le_bytes());
        p.extend_from_slice(&epoch.to_le_bytes());
        p.extend_from_slice(&tick.to_le_bytes());
        p.extend_from_slice(&451u16.to_le_bytes());
        p.extend_from_slice(&0u16.to_le_bytes());
        p.extend_from_slice(&initial_tick.to_le_bytes());
        p
    }

    fn system_info_payload(version: i16, initial_tick: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&version.to_le_bytes());
        p.extend_from_slice(&5u16.to_le_bytes());
        p.extend_from_slice(&100u32.to_le_bytes());
        p.extend_from_slice(&initial_tick.to_le_bytes());
        p.extend_from_slice(&[0u8; 32]);
        p
    }

    /// Serves one connection like a Qubic node would and reports when the
    /// client closes it.
    async fn spawn_fake_node(reply: SystemReply) -> (NodeTarget, oneshot::Receiver<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (closed_tx, closed_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            // Nodes greet new peers with a peer list before anything else.
            let greeting = packet(EXCHANGE_PUBLIC_PEERS, 0, &[127, 0, 0, 1, 10, 0, 0, 1]);
            stream.write_all(&greeting).await.unwrap();

            let mut buf = [0u8; HEADER_LEN];
            loop {
                if stream.read_exact(&mut buf).await.is_err() {
                    let _ = closed_tx.send(());
                    return;
                }
                let header = PacketHeader::decode(&buf).unwrap();
                let response = match header.kind {
                    REQUEST_CURRENT_TICK_INFO => packet(
                        RESPOND_CURRENT_TICK_INFO,
                        header.dejavu,
                        &tick_info_payload(100, 5, 90),
                    ),
                    REQUEST_SYSTEM_INFO => match reply {
                        SystemReply::Full => packet(
                            RESPOND_SYSTEM_INFO,
                            header.dejavu,
                            &system_info_payload(212, 90),
                        ),
                        SystemReply::Truncated => {
                            packet(RESPOND_SYSTEM_INFO, header.dejavu, &[1, 2, 3, 4])
                        }
                        SystemReply::StaleFirst => {
                            let mut out = packet(
                                RESPOND_SYSTEM_INFO,
                                header.dejavu.wrapping_add(1),
                                &system_info_payload(7, 1),
                            );
                            out.extend(packet(
                                RESPOND_SYSTEM_INFO,
                                header.dejavu,
                                &system_info_payload(212, 90),
                            ));
                            out
                        }
                    },
                    other => panic!("unexpected request type {other}"),
                };
                stream.write_all(&response).await.unwrap();
            }
        });

        (NodeTarget::new("127.0.0.1", addr.port()), closed_rx)
    }

    fn client(timeout: Duration) -> QubicNodeClient {
        QubicNodeClient::new(NodeClientConfig { timeout })
    }

    #[tokio::test]
    async fn probe_reads_tick_and_system_info() {
        let (target, closed) = spawn_fake_node(SystemReply::Full).await;

        let obs = client(Duration::from_secs(5))
            .probe(&target)
            .await
            .expect("probe should succeed");

        assert_eq!(obs.target, target);
        assert_eq!(obs.tick, 100);
        assert_eq!(obs.epoch, 5);
        assert_eq!(obs.version, "212");
        assert_eq!(obs.initial_tick_this_epoch, 90);

        tokio::time::timeout(Duration::from_secs(5), closed)
            .await
            .expect("session should be closed after success")
            .unwrap();
    }

    #[tokio::test]
    async fn responses_with_a_foreign_nonce_are_skipped() {
        let (target, _closed) = spawn_fake_node(SystemReply::StaleFirst).await;

        let obs = client(Duration::from_secs(5))
            .probe(&target)
            .await
            .expect("probe should succeed");

        assert_eq!(obs.version, "212");
        assert_eq!(obs.initial_tick_this_epoch, 90);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_protocol_error_and_closes_session() {
        let (target, closed) = spawn_fake_node(SystemReply::Truncated).await;

        let err = client(Duration::from_secs(5))
            .probe(&target)
            .await
            .unwrap_err();

        match &err {
            ProbeError::Protocol { endpoint, reason } => {
                assert_eq!(endpoint, &target.to_string());
                assert!(reason.contains("system info"), "unexpected reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        tokio::time::timeout(Duration::from_secs(5), closed)
            .await
            .expect("session should be closed after failure")
            .unwrap();
    }

    #[tokio::test]
    async fn silent_node_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (closed_tx, closed_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut sink = Vec::new();
            // Never answers; returns once the client hangs up.
            let _ = stream.read_to_end(&mut sink).await;
            let _ = closed_tx.send(());
        });

        let target = NodeTarget::new("127.0.0.1", port);
        let err = client(Duration::from_millis(200))
            .probe(&target)
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "unexpected error: {err:?}");
        tokio::time::timeout(Duration::from_secs(5), closed_rx)
            .await
            .expect("timed-out session should be closed")
            .unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client(Duration::from_secs(5))
            .probe(&NodeTarget::new("127.0.0.1", port))
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::Connect { .. }), "unexpected error: {err:?}");
    }
}
