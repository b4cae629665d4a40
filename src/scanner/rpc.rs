use crate::{
    error::RemoteError,
    models::{JsonRpcRequest, JsonRpcResponse},
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};

pub const METHOD_CHAIN_ID: &str = "eth_chainId";
pub const METHOD_PEER_COUNT: &str = "net_peerCount";

/// A decoded JSON-RPC answer and how long it took to arrive
#[derive(Debug, Clone)]
pub struct RpcReply {
    pub result: Option<Value>,
    /// From sending the request to having read the whole body
    pub elapsed: Duration,
}

impl RpcReply {
    pub fn result_str(&self) -> Option<&str> {
        self.result.as_ref().and_then(|v| v.as_str())
    }
}

/// Issue a parameterless JSON-RPC call
pub async fn call(
    client: &Client,
    url: &str,
    method: &str,
    timeout: Duration,
) -> Result<RpcReply, RemoteError> {
    let start = Instant::now();

    let response = client
        .post(url)
        .timeout(timeout)
        .json(&JsonRpcRequest::new(method))
        .send()
        .await?;

    if response.status() != StatusCode::OK {
        return Err(RemoteError::Protocol(format!(
            "{} {} returned status {}",
            url,
            method,
            response.status()
        )));
    }

    let body = response.text().await?;
    let elapsed = start.elapsed();

    let parsed: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
        RemoteError::Protocol(format!("{} {}: bad JSON-RPC body: {}", url, method, e))
    })?;

    Ok(RpcReply {
        result: parsed.result,
        elapsed,
    })
}
