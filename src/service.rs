use crate::{
    error::AppError,
    models::Snapshot,
    report,
    scanner::{ScanOrchestrator, ScanOutcome},
};
use std::time::Duration;
use tokio::{sync::broadcast, time};

/// A finished scan and whatever went wrong saving it
pub struct CycleReport {
    pub outcome: ScanOutcome,
    /// One entry per artifact write or publish target that failed
    pub failures: Vec<AppError>,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run one scan and write its artifacts.
///
/// Every output is attempted even when an earlier one fails, and the
/// results are returned either way.
pub async fn run_once(orchestrator: &ScanOrchestrator) -> CycleReport {
    let config = orchestrator.config();
    let outcome = orchestrator.run().await;
    let mut failures = Vec::new();

    report::log_top(&outcome.results, 10);
    if let Err(e) = report::write_artifacts(&config.output_dir, &outcome.results).await {
        tracing::error!(
            "Failed to write results to {}: {}",
            config.output_dir.display(),
            e
        );
        failures.push(e);
    }

    if !config.publish_targets.is_empty() {
        let snapshot = Snapshot::new(
            &config.network_name,
            &config.probe.expected_chain_id,
            &outcome.results,
        );
        failures.extend(report::publish_snapshot(&snapshot, &config.publish_targets).await);
    }

    CycleReport { outcome, failures }
}

/// Scan immediately, then every `interval`, until a shutdown signal arrives.
///
/// A scan in progress always finishes; shutdown is only observed between
/// runs. A failed write is logged and the next run still happens.
pub async fn run_continuous(
    orchestrator: &ScanOrchestrator,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    tracing::info!(
        "Starting continuous scanning with interval of {} seconds",
        interval.as_secs()
    );

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cycle = run_once(orchestrator).await;
                if cycle.is_complete() {
                    tracing::info!(
                        "Scan cycle complete: {} endpoints from {} candidates",
                        cycle.outcome.results.len(),
                        cycle.outcome.scanned
                    );
                } else {
                    tracing::warn!(
                        "Scan cycle found {} endpoints but {} outputs failed",
                        cycle.outcome.results.len(),
                        cycle.failures.len()
                    );
                }
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("Received shutdown signal, stopping continuous scanning");
                break;
            }
        }
    }
}
