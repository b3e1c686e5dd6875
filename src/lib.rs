//! setu-ais — AIS sentence relay
//!
//! Core components for bridging an AIS transponder's TCP sentence stream
//! onto a UDP aggregation feed: CRLF sentence reassembly, vessel-report
//! filtering, fire-and-forget forwarding, and the connection lifecycle
//! supervisor that keeps the uplink alive indefinitely.

pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod forwarder;
pub mod framer;
pub mod liveness;
pub mod supervisor;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use supervisor::{Supervisor, Tunables};
