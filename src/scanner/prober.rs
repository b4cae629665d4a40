use crate::{
    config::ProbeSettings,
    error::RemoteError,
    models::ProbeResult,
    utils::{endpoint_url, parse_hex_quantity},
};
use reqwest::Client;

use super::rpc::{self, METHOD_CHAIN_ID, METHOD_PEER_COUNT};

/// Checks every catalogue port of one address for the expected chain
#[derive(Clone)]
pub struct EndpointProber {
    client: Client,
    settings: ProbeSettings,
}

impl EndpointProber {
    pub fn new(client: Client, settings: ProbeSettings) -> Self {
        Self { client, settings }
    }

    /// Probe all catalogue ports of `address`, one after another.
    ///
    /// Every port is tried even after a match; unreachable and mismatching
    /// ports are simply absent from the result.
    pub async fn probe(&self, address: &str) -> Vec<ProbeResult> {
        let mut found = Vec::new();

        for port in &self.settings.rpc_ports {
            match self.probe_port(address, *port).await {
                Ok(Some(result)) => {
                    tracing::info!(
                        "Found {} - {}ms - peers: {}",
                        result.url,
                        result.latency,
                        result.peers
                    );
                    found.push(result);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::trace!("{}:{} skipped: {}", address, port, e);
                }
            }
        }

        found
    }

    /// Identity check on one port. `Ok(None)` means the port answered for
    /// some other chain.
    pub async fn probe_port(
        &self,
        address: &str,
        port: u16,
    ) -> Result<Option<ProbeResult>, RemoteError> {
        let url = endpoint_url(address, port);

        let reply = rpc::call(
            &self.client,
            &url,
            METHOD_CHAIN_ID,
            self.settings.probe_timeout,
        )
        .await?;

        match reply.result_str() {
            Some(chain_id) if chain_id == self.settings.expected_chain_id => {}
            other => {
                tracing::debug!(
                    "{} serves chain {:?}, expected {}",
                    url,
                    other,
                    self.settings.expected_chain_id
                );
                return Ok(None);
            }
        }

        let latency = u64::try_from(reply.elapsed.as_millis()).unwrap_or(u64::MAX);
        let peers = self.peer_count(&url).await;

        Ok(Some(ProbeResult {
            url,
            latency,
            peers,
        }))
    }

    /// Reported peer count, or 0 when the node will not say
    async fn peer_count(&self, url: &str) -> u64 {
        match rpc::call(
            &self.client,
            url,
            METHOD_PEER_COUNT,
            self.settings.peer_count_timeout,
        )
        .await
        {
            Ok(reply) => match reply.result_str().and_then(parse_hex_quantity) {
                Some(count) => count,
                None => {
                    tracing::debug!("{} returned unusable peer count {:?}", url, reply.result);
                    0
                }
            },
            Err(e) => {
                tracing::debug!("Peer count from {} failed: {}", url, e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHAIN_ID: &str = "0x4115";

    fn settings(rpc_ports: Vec<u16>) -> ProbeSettings {
        ProbeSettings {
            expected_chain_id: CHAIN_ID.to_string(),
            rpc_ports,
            probe_timeout: Duration::from_millis(500),
            peer_count_timeout: Duration::from_millis(1000),
        }
    }

    async fn rpc_node(chain_id: &str, peer_count: ResponseTemplate) -> MockServer {
        let node = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_chainId"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": chain_id})),
            )
            .mount(&node)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "net_peerCount"})))
            .respond_with(peer_count)
            .mount(&node)
            .await;

        node
    }

    fn peer_count(value: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": value}))
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn records_matching_endpoint() {
        let node = rpc_node(CHAIN_ID, peer_count("0x5")).await;
        let port = node.address().port();

        let prober = EndpointProber::new(Client::new(), settings(vec![port]));
        let results = prober.probe("127.0.0.1").await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, format!("http://127.0.0.1:{}", port));
        assert_eq!(results[0].peers, 5);
    }

    #[tokio::test]
    async fn keeps_scanning_after_a_match() {
        let first = rpc_node(CHAIN_ID, peer_count("0x1")).await;
        let second = rpc_node(CHAIN_ID, peer_count("0x2")).await;
        let ports = vec![
            first.address().port(),
            closed_port(),
            second.address().port(),
        ];

        let prober = EndpointProber::new(Client::new(), settings(ports.clone()));
        let results = prober.probe("127.0.0.1").await;

        let urls: Vec<_> = results.iter().map(|r| r.url.clone()).collect();
        assert_eq!(
            urls,
            vec![
                format!("http://127.0.0.1:{}", ports[0]),
                format!("http://127.0.0.1:{}", ports[2]),
            ]
        );
    }

    #[tokio::test]
    async fn other_chains_are_not_recorded() {
        let node = rpc_node("0x1", peer_count("0x5")).await;

        let prober = EndpointProber::new(Client::new(), settings(vec![node.address().port()]));
        assert!(prober.probe("127.0.0.1").await.is_empty());

        // the chain id has to match exactly, not just numerically
        let padded = rpc_node("0x04115", peer_count("0x5")).await;
        let prober = EndpointProber::new(Client::new(), settings(vec![padded.address().port()]));
        assert!(prober.probe("127.0.0.1").await.is_empty());
    }

    #[tokio::test]
    async fn dead_ports_give_empty_result() {
        let failing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&failing)
            .await;

        let slow = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": CHAIN_ID}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&slow)
            .await;

        let garbled = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&garbled)
            .await;

        let ports = vec![
            closed_port(),
            failing.address().port(),
            slow.address().port(),
            garbled.address().port(),
        ];
        let prober = EndpointProber::new(Client::new(), settings(ports));

        assert!(prober.probe("127.0.0.1").await.is_empty());
    }

    #[tokio::test]
    async fn bad_peer_count_keeps_the_match() {
        let malformed = rpc_node(CHAIN_ID, peer_count("0xnope")).await;
        let failing = rpc_node(CHAIN_ID, ResponseTemplate::new(500)).await;
        let slow = rpc_node(
            CHAIN_ID,
            peer_count("0x9").set_delay(Duration::from_secs(2)),
        )
        .await;

        let ports = vec![
            malformed.address().port(),
            failing.address().port(),
            slow.address().port(),
        ];
        let prober = EndpointProber::new(Client::new(), settings(ports));
        let results = prober.probe("127.0.0.1").await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.peers == 0));
    }

    #[tokio::test]
    async fn latency_covers_only_the_identity_call() {
        let node = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_chainId"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": CHAIN_ID}))
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&node)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "net_peerCount"})))
            .respond_with(peer_count("0x3").set_delay(Duration::from_millis(400)))
            .mount(&node)
            .await;

        let prober = EndpointProber::new(Client::new(), settings(vec![node.address().port()]));
        let results = prober.probe("127.0.0.1").await;

        assert_eq!(results.len(), 1);
        assert!(results[0].latency >= 50);
        assert!(results[0].latency < 400);
        assert_eq!(results[0].peers, 3);
    }
}
