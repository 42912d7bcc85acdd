//! Store events and the sink they are reported to

use std::path::PathBuf;
use tracing::{debug, error, info};

/// Something worth reporting that happened during a reload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The backing file was read and the snapshot replaced
    Reloaded { path: PathBuf, keys: usize },

    /// The backing file does not exist; the snapshot was kept
    FileNotFound { path: PathBuf },

    /// The backing file could not be read or parsed; the snapshot was kept
    ReadFailed { path: PathBuf, error: String },
}

/// Receives store events
///
/// The store holds an `Arc<dyn EventSink>`, so tests and host applications
/// can inject their own sink instead of relying on a process-wide logger.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &StoreEvent);
}

/// Default sink: forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &StoreEvent) {
        match event {
            StoreEvent::Reloaded { path, keys } => {
                info!(path = %path.display(), keys, "Reloaded file: {}", path.display());
            }
            StoreEvent::FileNotFound { path } => {
                debug!(path = %path.display(), "File not found: {}", path.display());
            }
            StoreEvent::ReadFailed { path, error } => {
                error!(path = %path.display(), error = %error, "Failed to read file");
            }
        }
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &StoreEvent) {}
}
