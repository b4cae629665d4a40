use crate::{
    config::DiscoverySettings,
    error::RemoteError,
    utils::{endpoint_url, is_valid_public_ip},
};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use reqwest::Client;
use std::collections::HashSet;

use super::peer_exchange::fetch_peer_ips;

/// What one depth level of the crawl did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepthSummary {
    pub depth: usize,
    /// Seeds or addresses queried at this depth
    pub queried: usize,
    /// Sources that returned a peer list
    pub answered: usize,
    pub unreachable: usize,
    pub protocol_errors: usize,
    /// Addresses seen for the first time at this depth
    pub new_addresses: usize,
}

impl DepthSummary {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &Result<Vec<String>, RemoteError>) {
        match outcome {
            Ok(_) => self.answered += 1,
            Err(RemoteError::Unreachable(_)) => self.unreachable += 1,
            Err(RemoteError::Protocol(_)) => self.protocol_errors += 1,
        }
    }
}

/// Result of a discovery run
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Every distinct address seen, in first-seen order
    pub addresses: Vec<String>,
    pub levels: Vec<DepthSummary>,
}

/// Addresses seen so far. Insertion is the only shared write.
#[derive(Default)]
struct SeenSet {
    inner: Mutex<SeenInner>,
}

#[derive(Default)]
struct SeenInner {
    members: HashSet<String>,
    order: Vec<String>,
}

impl SeenSet {
    /// Returns true if the address was not seen before
    fn insert(&self, ip: &str) -> bool {
        let mut guard = self.inner.lock();
        if guard.members.contains(ip) {
            return false;
        }
        guard.members.insert(ip.to_string());
        guard.order.push(ip.to_string());
        true
    }

    fn into_ordered(self) -> Vec<String> {
        self.inner.into_inner().order
    }
}

/// Breadth-first crawler over peer-exchange endpoints
pub struct PeerDiscoverer {
    client: Client,
    settings: DiscoverySettings,
}

impl PeerDiscoverer {
    pub fn new(client: Client, settings: DiscoverySettings) -> Self {
        Self { client, settings }
    }

    /// Crawl from `seeds` and return every distinct address found.
    ///
    /// Depth 0 asks the seeds; each later depth asks the addresses first
    /// seen at the previous depth. Stops at `max_depth` levels or when a
    /// depth turns up nothing new. Failures only show up in the summaries.
    pub async fn discover(&self, seeds: &[String]) -> Discovery {
        let seen = SeenSet::default();
        let mut levels = Vec::new();

        if self.settings.max_depth == 0 {
            return Discovery::default();
        }

        let mut summary = DepthSummary::new(0);
        let mut frontier = Vec::new();

        for seed in seeds {
            summary.queried += 1;
            let outcome = fetch_peer_ips(&self.client, seed, self.settings.seed_timeout).await;
            summary.record(&outcome);

            match outcome {
                Ok(ips) => frontier.extend(self.admit_new(&seen, ips)),
                Err(e) => tracing::debug!("Seed {} gave no peers: {}", seed, e),
            }
        }

        summary.new_addresses = frontier.len();
        self.log_depth(&summary, &seen);
        levels.push(summary);

        let mut rng = SmallRng::from_entropy();
        let mut depth = 1;

        while depth < self.settings.max_depth && !frontier.is_empty() {
            frontier.shuffle(&mut rng);
            frontier.truncate(self.settings.per_depth_limit);

            let mut summary = DepthSummary::new(depth);
            summary.queried = frontier.len();

            let results = stream::iter(frontier)
                .map(|ip| {
                    let seen = &seen;
                    async move {
                        let outcome = self.expand_address(&ip).await;
                        let fresh = match &outcome {
                            Ok(ips) => self.admit_new(seen, ips.clone()),
                            Err(_) => Vec::new(),
                        };
                        (outcome, fresh)
                    }
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect::<Vec<_>>()
                .await;

            let mut next = Vec::new();
            for (outcome, fresh) in results {
                summary.record(&outcome);
                next.extend(fresh);
            }

            summary.new_addresses = next.len();
            self.log_depth(&summary, &seen);
            levels.push(summary);

            frontier = next;
            depth += 1;
        }

        let addresses = seen.into_ordered();

        tracing::info!(
            "Discovery complete: {} unique addresses over {} depth levels",
            addresses.len(),
            levels.len()
        );

        Discovery { addresses, levels }
    }

    /// Ask one address for its peers, trying each peer-exchange port until
    /// one answers. The last failure is returned if none do.
    async fn expand_address(&self, ip: &str) -> Result<Vec<String>, RemoteError> {
        let mut last_error = RemoteError::Unreachable(format!("no peer ports tried for {}", ip));

        for port in &self.settings.peer_ports {
            let base = endpoint_url(ip, *port);
            match fetch_peer_ips(&self.client, &base, self.settings.net_info_timeout).await {
                Ok(ips) => {
                    tracing::debug!("{} listed {} peers", base, ips.len());
                    return Ok(ips);
                }
                Err(e) => {
                    tracing::debug!("No peers from {}: {}", base, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Insert addresses into the seen set and return the ones that were new
    fn admit_new(&self, seen: &SeenSet, ips: Vec<String>) -> Vec<String> {
        ips.into_iter()
            .filter(|ip| !self.settings.public_only || is_valid_public_ip(ip))
            .filter(|ip| seen.insert(ip))
            .collect()
    }

    fn log_depth(&self, summary: &DepthSummary, seen: &SeenSet) {
        let total = seen.inner.lock().order.len();
        tracing::info!(
            "Depth {}: queried {} ({} answered, {} unreachable, {} protocol errors), {} new, {} total addresses",
            summary.depth,
            summary.queried,
            summary.answered,
            summary.unreachable,
            summary.protocol_errors,
            summary.new_addresses,
            total
        );
    }
}
