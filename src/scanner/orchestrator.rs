use crate::{
    config::ScanConfig,
    discovery::{Discovery, PeerDiscoverer},
    error::AppError,
    models::{ProbeResult, ResultSet},
    utils::create_http_client,
};
use parking_lot::Mutex;
use reqwest::Client;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Instant;
use tokio::sync::Semaphore;

use super::prober::EndpointProber;

/// Summary of one complete scan
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub discovery: Discovery,
    /// Candidates actually probed after truncation
    pub scanned: usize,
    pub results: ResultSet,
}

/// Runs discovery, then probes the candidates on a bounded worker pool
pub struct ScanOrchestrator {
    config: ScanConfig,
    client: Client,
}

impl ScanOrchestrator {
    pub fn new(config: ScanConfig) -> Result<Self, AppError> {
        let client = create_http_client(config.max_request_timeout())?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Discover candidates, probe them all and return the latency-sorted
    /// result set. A run finding nothing is still a successful run.
    pub async fn run(&self) -> ScanOutcome {
        let started = Instant::now();

        tracing::info!(
            "Phase 1: peer discovery from {} seeds, up to {} depth levels",
            self.config.seeds.len(),
            self.config.discovery.max_depth
        );

        let discoverer =
            PeerDiscoverer::new(self.client.clone(), self.config.discovery.clone());
        let discovery = discoverer.discover(&self.config.seeds).await;

        let (unreachable, protocol_errors) = discovery
            .levels
            .iter()
            .fold((0, 0), |(u, p), level| (u + level.unreachable, p + level.protocol_errors));
        if discovery.addresses.is_empty() && (unreachable > 0 || protocol_errors > 0) {
            tracing::warn!(
                "Discovery found no addresses: {} sources unreachable, {} protocol errors",
                unreachable,
                protocol_errors
            );
        }

        let candidates: Vec<String> = discovery
            .addresses
            .iter()
            .take(self.config.max_candidates)
            .cloned()
            .collect();

        tracing::info!(
            "Phase 2: probing {} of {} addresses on {} ports with {} workers",
            candidates.len(),
            discovery.addresses.len(),
            self.config.probe.rpc_ports.len(),
            self.config.workers
        );

        let scanned = candidates.len();
        let results = self.probe_all(candidates).await;

        tracing::info!(
            "Scan finished in {:?}: {} matching endpoints",
            started.elapsed(),
            results.len()
        );

        ScanOutcome {
            discovery,
            scanned,
            results,
        }
    }

    /// Probe every candidate, at most `workers` at a time
    pub async fn probe_all(&self, candidates: Vec<String>) -> ResultSet {
        let total = candidates.len();
        let prober = EndpointProber::new(self.client.clone(), self.config.probe.clone());
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let found: Arc<Mutex<Vec<ProbeResult>>> = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicUsize::new(0));
        let progress_every = self.config.progress_every.max(1);

        let mut handles = Vec::with_capacity(total);

        for address in candidates {
            let prober = prober.clone();
            let semaphore = semaphore.clone();
            let found = found.clone();
            let completed = completed.clone();

            handles.push(tokio::spawn(async move {
                // The semaphore is never closed
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let results = prober.probe(&address).await;

                let found_so_far = {
                    let mut guard = found.lock();
                    guard.extend(results);
                    guard.len()
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if done % progress_every == 0 {
                    tracing::info!(
                        "Progress: {}/{} - found {} RPCs",
                        done,
                        total,
                        found_so_far
                    );
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Probe task ended abnormally: {}", e);
            }
        }

        let collected = std::mem::take(&mut *found.lock());
        ResultSet::from_unsorted(collected)
    }
}
