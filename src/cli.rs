use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line interface for rpcscan
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "rpcscan",
    about = "Crawls a chain's peer-exchange endpoints and finds public JSON-RPC nodes",
    version
)]
pub struct Cli {
    /// Peer-exchange endpoints to start discovery from
    #[clap(
        long = "seed",
        env = "SCAN_SEEDS",
        value_delimiter = ',',
        default_value = "http://199.254.199.233:47657"
    )]
    pub seeds: Vec<String>,

    /// Chain id an endpoint must report from eth_chainId
    #[clap(long, env = "EXPECTED_CHAIN_ID", default_value = "0x4115")]
    pub chain_id: String,

    /// Human readable network name used in published snapshots
    #[clap(long, env = "NETWORK_NAME", default_value = "0G Mainnet")]
    pub network_name: String,

    /// Number of discovery depth levels, seeds included (0 = no discovery)
    #[clap(long, default_value = "5")]
    pub max_depth: usize,

    /// Addresses expanded per discovery depth
    #[clap(long, default_value = "50")]
    pub per_depth_limit: usize,

    /// Candidate addresses probed per run
    #[clap(long, default_value = "200")]
    pub max_candidates: usize,

    /// Addresses probed concurrently
    #[clap(long, default_value = "100")]
    pub workers: usize,

    /// Timeout for the eth_chainId call in milliseconds
    #[clap(long, default_value = "2000")]
    pub probe_timeout_ms: u64,

    /// Timeout for the net_peerCount call in milliseconds
    #[clap(long, default_value = "1000")]
    pub peer_count_timeout_ms: u64,

    /// Timeout for seed /net_info requests in milliseconds
    #[clap(long, default_value = "5000")]
    pub seed_timeout_ms: u64,

    /// Timeout for discovered peers' /net_info requests in milliseconds
    #[clap(long, default_value = "1000")]
    pub net_info_timeout_ms: u64,

    /// Ports tried, in order, for a discovered peer's /net_info
    #[clap(
        long,
        value_delimiter = ',',
        default_value = "26657,14657,16657,36657,46657,56657"
    )]
    pub peer_ports: Vec<u16>,

    /// Ports probed for JSON-RPC (default: built-in catalogue)
    #[clap(long, value_delimiter = ',')]
    pub rpc_ports: Vec<u16>,

    /// Only keep publicly routable addresses during discovery
    #[clap(long)]
    pub public_only: bool,

    /// Log progress every N probed addresses
    #[clap(long, default_value = "20")]
    pub progress_every: usize,

    /// Directory receiving scan_results.txt and rpc_endpoints.json
    #[clap(long, env = "SCAN_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write a metadata-wrapped snapshot to this path (repeatable)
    #[clap(long = "publish")]
    pub publish: Vec<PathBuf>,

    /// Keep scanning on an interval until interrupted
    #[clap(long)]
    pub continuous: bool,

    /// Scan interval in seconds
    #[clap(long, default_value = "3600")]
    pub scan_interval: u64,
}

impl Cli {
    /// Get the scan interval as a Duration
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }
}
