use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A verified JSON-RPC endpoint serving the expected chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    /// Round trip of the chain id call, in milliseconds
    pub latency: u64,
    pub peers: u64,
}

/// Probe results ordered ascending by latency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<ProbeResult>);

impl ResultSet {
    /// Finalize an unordered accumulator. Equal latencies keep arrival order.
    pub fn from_unsorted(mut results: Vec<ProbeResult>) -> Self {
        results.sort_by_key(|r| r.latency);
        ResultSet(results)
    }

    pub fn as_slice(&self) -> &[ProbeResult] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProbeResult> {
        self.0.iter()
    }
}

/// Structure returned by a Tendermint-style `/net_info` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetInfoResponse {
    pub result: Option<NetInfoResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetInfoResult {
    pub peers: Option<Vec<PeerData>>,
}

/// A peer as listed by `/net_info`; everything but the IP is ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerData {
    pub remote_ip: Option<String>,
}

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Vec<Value>,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params: Vec::new(),
            id: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub result: Option<Value>,
}

/// Result list wrapped with network metadata, as served to the web frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub network: String,
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "lastUpdate")]
    pub last_update: DateTime<Utc>,
    #[serde(rename = "totalRpcs")]
    pub total_rpcs: usize,
    pub rpcs: Vec<ProbeResult>,
}

impl Snapshot {
    pub fn new(network: &str, chain_id: &str, results: &ResultSet) -> Self {
        Self {
            network: network.to_string(),
            chain_id: chain_id.to_string(),
            last_update: Utc::now(),
            total_rpcs: results.len(),
            rpcs: results.as_slice().to_vec(),
        }
    }
}
