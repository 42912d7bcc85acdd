//! Reloadable properties file store for feature-flag state
//!
//! A [`PropertiesFile`] keeps an in-memory snapshot of a `key=value` file:
//! - Lazy reload: [`PropertiesFile::reload_if_updated`] re-reads the file only
//!   when its modification time moved past the last successful read
//! - Lock-free reads from an atomically swapped snapshot
//! - Bulk changes through a copy-on-write [`Editor`] that rewrites the whole file
//!
//! Reload problems (missing or unreadable file) are reported to an
//! [`EventSink`] and never surface as errors; commit failures do.
//!
//! # Example
//! ```no_run
//! use flagfile_store::PropertiesFile;
//!
//! # fn example() -> flagfile_store::StoreResult<()> {
//! let store = PropertiesFile::new("/etc/myapp/features.properties");
//! store.reload_if_updated();
//!
//! let enabled = store.get_value("FEATURE_ONE", "false");
//!
//! let mut editor = store.get_editor();
//! editor.set_value("FEATURE_ONE", "true");
//! editor.remove_keys_starting_with("FEATURE_ONE.param.");
//! editor.commit()?;
//! # let _ = enabled;
//! # Ok(())
//! # }
//! ```

mod atomic_writer;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod format;
pub mod snapshot;
pub mod store;

pub use config::{StoreOptions, WriteMode};
pub use editor::{Editor, ValueUpdate};
pub use error::{StoreError, StoreResult};
pub use events::{EventSink, NoopSink, StoreEvent, TracingSink};
pub use snapshot::Snapshot;
pub use store::{PropertiesFile, PropertiesFileBuilder, ReloadOutcome};
