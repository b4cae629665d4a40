use clap::Parser;
use dotenv::dotenv;
use std::process::ExitCode;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod discovery;
mod error;
mod models;
mod report;
mod scanner;
mod service;
mod utils;

use cli::Cli;
use config::ScanConfig;
use scanner::ScanOrchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize environment
    dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = match ScanConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        "Scanning {} for chain id {} ({} RPC ports per address)",
        config.network_name,
        config.probe.expected_chain_id,
        config.probe.rpc_ports.len()
    );

    let orchestrator = match ScanOrchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if !cli.continuous {
        let cycle = service::run_once(&orchestrator).await;
        tracing::info!(
            "Found {} RPCs among {} scanned addresses",
            cycle.outcome.results.len(),
            cycle.outcome.scanned
        );

        return if cycle.is_complete() {
            ExitCode::SUCCESS
        } else {
            tracing::error!("{} outputs could not be written", cycle.failures.len());
            ExitCode::FAILURE
        };
    }

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Error handling shutdown signal: {}", err);
            // Dropping the sender would read as a shutdown request
            std::future::pending::<()>().await;
        }

        tracing::info!("Received shutdown signal, finishing current cycle...");

        if let Err(e) = shutdown_tx.send(()) {
            tracing::warn!("Failed to send shutdown signal: {}", e);
        }
    });

    service::run_continuous(&orchestrator, cli.scan_interval(), shutdown_rx).await;

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
