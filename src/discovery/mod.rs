// Modules
mod peer_exchange;
mod traversal;

// Public exports
pub use traversal::{Discovery, PeerDiscoverer};
