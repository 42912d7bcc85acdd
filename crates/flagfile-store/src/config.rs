//! Store configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a commit replaces the backing file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Truncate the file in place and write the new content
    #[default]
    Truncate,
    /// Write to `<file>.tmp` and rename it over the target
    Atomic,
}

/// Options for a [`PropertiesFile`](crate::PropertiesFile)
///
/// Every field has a default, so the struct can be embedded in a host
/// application's YAML/TOML/JSON config with only the fields it cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// How commits replace the file
    pub write_mode: WriteMode,

    /// Write characters outside printable ASCII as `\uXXXX`
    pub escape_unicode: bool,

    /// Comment written at the top of the file on every commit
    pub header: Option<String>,

    /// Add a `#<timestamp>` comment line on every commit
    pub timestamp_comment: bool,

    /// Minimum time between two staleness checks, in milliseconds (0 = check every call)
    pub check_interval_ms: u64,

    /// Create missing parent directories before writing
    pub create_parent_dirs: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::Truncate,
            escape_unicode: true,
            header: None,
            timestamp_comment: false,
            check_interval_ms: 0,
            create_parent_dirs: false,
        }
    }
}

impl StoreOptions {
    /// Minimum time between staleness checks
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Set the minimum time between staleness checks
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the write mode
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Set the header comment
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}
