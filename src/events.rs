//! Lifecycle event notification
//!
//! The supervisor reports four event kinds through this interface:
//! forwarding started (first-ever connect), connection restored,
//! connection lost, and reconnect failed. Sinks receive them
//! synchronously and their outcome is ignored — a broken notification
//! channel must never stall the relay.

/// Event severity for sink implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Critical,
}

/// Capability interface for lifecycle notifications
pub trait EventSink {
    fn notify(&self, title: &str, message: &str, severity: Severity);
}

/// Sink that writes notifications through the logging pipeline,
/// prefixed with the station identity
pub struct LogSink {
    station: String,
}

impl LogSink {
    pub fn new(station: impl Into<String>) -> Self {
        Self {
            station: station.into(),
        }
    }
}

impl EventSink for LogSink {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Normal => log::info!("[{}] {}: {}", self.station, title, message),
            Severity::Critical => log::error!("[{}] {}: {}", self.station, title, message),
        }
    }
}
