use crate::{error::RemoteError, models::NetInfoResponse, utils::net_info_url};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Fetch the remote IPs a node reports from its `/net_info` endpoint
pub async fn fetch_peer_ips(
    client: &Client,
    base_url: &str,
    timeout: Duration,
) -> Result<Vec<String>, RemoteError> {
    let url = net_info_url(base_url);

    tracing::debug!("Fetching peers from {}", url);

    let response = client.get(&url).timeout(timeout).send().await?;

    if response.status() != StatusCode::OK {
        return Err(RemoteError::Protocol(format!(
            "{} returned status {}",
            url,
            response.status()
        )));
    }

    let body = response.text().await?;
    parse_peer_ips(&body)
}

/// Extract `result.peers[].remote_ip` from a `/net_info` body.
///
/// Peers without an IP are skipped; a body without a peer list is a
/// protocol error rather than an empty answer.
pub fn parse_peer_ips(body: &str) -> Result<Vec<String>, RemoteError> {
    let parsed: NetInfoResponse = serde_json::from_str(body)
        .map_err(|e| RemoteError::Protocol(format!("malformed net_info body: {}", e)))?;

    let peers = parsed
        .result
        .and_then(|r| r.peers)
        .ok_or_else(|| RemoteError::Protocol("net_info body has no result.peers".to_string()))?;

    Ok(peers
        .into_iter()
        .filter_map(|p| p.remote_ip)
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_remote_ips() {
        let body = json!({
            "result": {
                "peers": [
                    {"remote_ip": "1.2.3.4"},
                    {"remote_ip": ""},
                    {"node_info": {"moniker": "no-ip"}},
                    {"remote_ip": " 5.6.7.8 "}
                ]
            }
        })
        .to_string();

        assert_eq!(parse_peer_ips(&body).unwrap(), vec!["1.2.3.4", "5.6.7.8"]);
    }

    #[test]
    fn missing_peer_list_is_protocol_error() {
        assert!(matches!(
            parse_peer_ips(r#"{"result":{}}"#),
            Err(RemoteError::Protocol(_))
        ));
        assert!(matches!(
            parse_peer_ips("<html>nope</html>"),
            Err(RemoteError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn fetches_from_net_info() {
        let mock = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/net_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"peers": [{"remote_ip": "1.2.3.4"}, {"remote_ip": "5.6.7.8"}]}
            })))
            .expect(1)
            .mount(&mock)
            .await;

        let client = Client::new();
        let ips = fetch_peer_ips(&client, &mock.uri(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(ips, vec!["1.2.3.4", "5.6.7.8"]);
    }

    #[tokio::test]
    async fn non_success_status_is_protocol_error() {
        let mock = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/net_info"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock)
            .await;

        let client = Client::new();
        let err = fetch_peer_ips(&client, &mock.uri(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Protocol(_)));
    }

    #[tokio::test]
    async fn only_200_is_accepted() {
        let mock = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/net_info"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(json!({"result": {"peers": [{"remote_ip": "1.2.3.4"}]}})),
            )
            .mount(&mock)
            .await;

        let client = Client::new();
        let err = fetch_peer_ips(&client, &mock.uri(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Protocol(_)));
    }

    #[tokio::test]
    async fn timeout_is_unreachable() {
        let mock = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/net_info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": {"peers": []}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock)
            .await;

        let client = Client::new();
        let err = fetch_peer_ips(&client, &mock.uri(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unreachable(_)));
    }
}
