//! Error types for the relay daemon
//!
//! Only setup faults travel through this enum: transport-level failures
//! (connect, read, probe) are absorbed by the supervisor's reconnect
//! handling and never propagate past it.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Relay error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Address did not resolve to any usable endpoint
    #[error("Cannot resolve address: {0}")]
    Resolve(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
