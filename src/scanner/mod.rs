// Modules
mod orchestrator;
mod prober;
mod rpc;

// Public exports
pub use orchestrator::{ScanOrchestrator, ScanOutcome};
