use crate::{cli::Cli, error::AppError};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// JSON-RPC ports probed when none are configured: the standard pair plus
/// the `x545` offsets node operators commonly shift to.
pub static DEFAULT_RPC_PORTS: Lazy<Vec<u16>> = Lazy::new(|| {
    let mut ports = vec![8545, 8546];
    ports.extend((10545..=64545).step_by(1000));
    ports
});

/// Settings for the peer-exchange crawl
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Depth levels including the seed level
    pub max_depth: usize,
    pub per_depth_limit: usize,
    /// Concurrent `/net_info` requests within one depth
    pub concurrency: usize,
    pub peer_ports: Vec<u16>,
    pub seed_timeout: Duration,
    pub net_info_timeout: Duration,
    pub public_only: bool,
}

/// Settings for the per-address JSON-RPC probe
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub expected_chain_id: String,
    pub rpc_ports: Vec<u16>,
    pub probe_timeout: Duration,
    pub peer_count_timeout: Duration,
}

/// Everything one scan run needs
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub network_name: String,
    pub seeds: Vec<String>,
    pub discovery: DiscoverySettings,
    pub probe: ProbeSettings,
    pub max_candidates: usize,
    pub workers: usize,
    pub progress_every: usize,
    pub output_dir: PathBuf,
    pub publish_targets: Vec<PathBuf>,
}

impl ScanConfig {
    /// Build and validate the scan configuration from parsed arguments
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        let seeds: Vec<String> = cli
            .seeds
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if seeds.is_empty() {
            return Err(AppError::ConfigError(
                "At least one seed endpoint is required".to_string(),
            ));
        }

        for seed in &seeds {
            validate_seed(seed)?;
        }

        let chain_id = cli.chain_id.trim();
        if chain_id.is_empty() {
            return Err(AppError::ConfigError(
                "Expected chain id must not be empty".to_string(),
            ));
        }

        if cli.workers == 0 {
            return Err(AppError::ConfigError(
                "Worker pool size must be at least 1".to_string(),
            ));
        }

        if cli.peer_ports.is_empty() {
            return Err(AppError::ConfigError(
                "At least one peer-exchange port is required".to_string(),
            ));
        }

        let rpc_ports = if cli.rpc_ports.is_empty() {
            DEFAULT_RPC_PORTS.clone()
        } else {
            dedup_preserving_order(&cli.rpc_ports)
        };

        let config = ScanConfig {
            network_name: cli.network_name.clone(),
            seeds,
            discovery: DiscoverySettings {
                max_depth: cli.max_depth,
                per_depth_limit: cli.per_depth_limit,
                concurrency: cli.workers,
                peer_ports: dedup_preserving_order(&cli.peer_ports),
                seed_timeout: Duration::from_millis(cli.seed_timeout_ms),
                net_info_timeout: Duration::from_millis(cli.net_info_timeout_ms),
                public_only: cli.public_only,
            },
            probe: ProbeSettings {
                expected_chain_id: chain_id.to_string(),
                rpc_ports,
                probe_timeout: Duration::from_millis(cli.probe_timeout_ms),
                peer_count_timeout: Duration::from_millis(cli.peer_count_timeout_ms),
            },
            max_candidates: cli.max_candidates,
            workers: cli.workers,
            progress_every: cli.progress_every.max(1),
            output_dir: cli.output_dir.clone(),
            publish_targets: cli.publish.clone(),
        };

        tracing::debug!("Loaded scan configuration: {:?}", config);

        Ok(config)
    }

    /// Longest single request timeout, used as the client-wide ceiling
    pub fn max_request_timeout(&self) -> Duration {
        [
            self.discovery.seed_timeout,
            self.discovery.net_info_timeout,
            self.probe.probe_timeout,
            self.probe.peer_count_timeout,
        ]
        .into_iter()
        .max()
        .unwrap_or(Duration::from_secs(5))
    }
}

fn validate_seed(seed: &str) -> Result<(), AppError> {
    let url = Url::parse(seed)
        .map_err(|e| AppError::ConfigError(format!("Invalid seed URL {}: {}", seed, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::ConfigError(format!(
            "Unsupported scheme {} for seed {}",
            other, seed
        ))),
    }
}

fn dedup_preserving_order(ports: &[u16]) -> Vec<u16> {
    let mut out = Vec::with_capacity(ports.len());
    for port in ports {
        if !out.contains(port) {
            out.push(*port);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut all = vec!["rpcscan"];
        all.extend_from_slice(args);
        Cli::parse_from(all)
    }

    #[test]
    fn default_catalogue() {
        let ports = &*DEFAULT_RPC_PORTS;
        assert_eq!(ports.len(), 57);
        assert_eq!(&ports[..3], &[8545, 8546, 10545]);
        assert_eq!(*ports.last().unwrap(), 64545);
        assert!(ports.contains(&18545));
        assert!(ports.contains(&58545));
    }

    #[test]
    fn builds_from_defaults() {
        let config = ScanConfig::from_cli(&cli(&["--seed", "http://1.2.3.4:26657"])).unwrap();
        assert_eq!(config.seeds, vec!["http://1.2.3.4:26657"]);
        assert_eq!(config.probe.expected_chain_id, "0x4115");
        assert_eq!(config.probe.rpc_ports, *DEFAULT_RPC_PORTS);
        assert_eq!(config.probe.probe_timeout, Duration::from_secs(2));
        assert_eq!(config.discovery.seed_timeout, Duration::from_secs(5));
        assert_eq!(config.max_request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn custom_ports_are_deduplicated() {
        let config = ScanConfig::from_cli(&cli(&[
            "--seed",
            "http://1.2.3.4:26657",
            "--rpc-ports",
            "8545,18545,8545",
        ]))
        .unwrap();
        assert_eq!(config.probe.rpc_ports, vec![8545, 18545]);
    }

    #[test]
    fn rejects_bad_seeds() {
        assert!(matches!(
            ScanConfig::from_cli(&cli(&["--seed", "not a url"])),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            ScanConfig::from_cli(&cli(&["--seed", "tcp://1.2.3.4:26657"])),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            ScanConfig::from_cli(&cli(&["--seed", " "])),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_empty_pool_and_chain_id() {
        assert!(ScanConfig::from_cli(&cli(&["--seed", "http://a:1", "--workers", "0"])).is_err());
        assert!(ScanConfig::from_cli(&cli(&["--seed", "http://a:1", "--chain-id", " "])).is_err());
    }
}
