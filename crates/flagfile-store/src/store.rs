//! File-backed properties store with lazy reload

use crate::atomic_writer::AtomicWriter;
use crate::config::{StoreOptions, WriteMode};
use crate::editor::Editor;
use crate::error::{StoreError, StoreResult};
use crate::events::{EventSink, StoreEvent, TracingSink};
use crate::format;
use crate::snapshot::Snapshot;
use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Instant, SystemTime};

/// What a call to [`PropertiesFile::reload_if_updated`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The snapshot is current (or the check was throttled)
    Unchanged,
    /// The file was read and the snapshot replaced
    Reloaded { keys: usize },
    /// The file does not exist; the previous snapshot is still served
    NotFound,
    /// The file could not be read or parsed; the previous snapshot is still served
    Failed,
}

/// Guarded by the store's mutex; reloads and commits both take it
#[derive(Debug, Default)]
struct ReloadState {
    /// Modification time of the file at the last successful load; `None` forces a reload
    last_read: Option<SystemTime>,
    last_check: Option<Instant>,
}

/// A key-value snapshot backed by a properties file
///
/// Reads are served from an immutable snapshot published through an atomic
/// pointer swap, so they never block on a reload. Reloads and commits are
/// serialized by one mutex per store.
pub struct PropertiesFile {
    path: PathBuf,
    values: ArcSwap<Snapshot>,
    state: Mutex<ReloadState>,
    options: StoreOptions,
    sink: Arc<dyn EventSink>,
}

/// Builder for [`PropertiesFile`]
pub struct PropertiesFileBuilder {
    path: PathBuf,
    options: StoreOptions,
    sink: Arc<dyn EventSink>,
}

impl PropertiesFileBuilder {
    /// Use `options` instead of the defaults
    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Report reload events to `sink` instead of `tracing`
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the store with an empty snapshot; nothing is read until the first reload
    pub fn build(self) -> PropertiesFile {
        PropertiesFile {
            path: self.path,
            values: ArcSwap::from_pointee(Snapshot::default()),
            state: Mutex::new(ReloadState::default()),
            options: self.options,
            sink: self.sink,
        }
    }
}

impl PropertiesFile {
    /// Create a store over `path` with default options and the tracing sink
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::builder(path).build()
    }

    /// Create a store with custom options
    pub fn with_options<P: AsRef<Path>>(path: P, options: StoreOptions) -> Self {
        Self::builder(path).options(options).build()
    }

    /// Start building a store over `path`
    pub fn builder<P: AsRef<Path>>(path: P) -> PropertiesFileBuilder {
        PropertiesFileBuilder {
            path: path.as_ref().to_path_buf(),
            options: StoreOptions::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Create a store and load the file right away
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let store = Self::new(path);
        store.reload_if_updated();
        store
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Options the store was built with
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    fn lock_state(&self) -> MutexGuard<'_, ReloadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-read the file if it was modified since the last successful load
    ///
    /// Never fails: a missing or unreadable file keeps the current snapshot
    /// and is reported to the event sink. The next call retries.
    pub fn reload_if_updated(&self) -> ReloadOutcome {
        let mut state = self.lock_state();

        let interval = self.options.check_interval();
        let now = Instant::now();
        if !interval.is_zero()
            && let Some(last_check) = state.last_check
            && now.duration_since(last_check) < interval
        {
            return ReloadOutcome::Unchanged;
        }
        state.last_check = Some(now);

        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => return self.report_read_error(StoreError::Io(e)),
        };

        let stale = match state.last_read {
            None => true,
            Some(last_read) => modified > last_read,
        };
        if !stale {
            return ReloadOutcome::Unchanged;
        }

        match self.read_file() {
            Ok(values) => {
                let keys = values.len();
                self.values.store(Arc::new(Snapshot::new(values)));
                state.last_read = Some(modified);
                self.sink.record(&StoreEvent::Reloaded {
                    path: self.path.clone(),
                    keys,
                });
                ReloadOutcome::Reloaded { keys }
            }
            Err(e) => self.report_read_error(e),
        }
    }

    fn read_file(&self) -> StoreResult<HashMap<String, String>> {
        let bytes = fs::read(&self.path)?;
        format::parse(&format::decode(bytes))
    }

    fn report_read_error(&self, err: StoreError) -> ReloadOutcome {
        match err {
            StoreError::Io(e) if e.kind() == io::ErrorKind::NotFound => {
                self.sink.record(&StoreEvent::FileNotFound {
                    path: self.path.clone(),
                });
                ReloadOutcome::NotFound
            }
            other => {
                self.sink.record(&StoreEvent::ReadFailed {
                    path: self.path.clone(),
                    error: other.to_string(),
                });
                ReloadOutcome::Failed
            }
        }
    }

    /// Value for `key` in the current snapshot, or `default` if not set
    ///
    /// Does not reload; call [`reload_if_updated`](Self::reload_if_updated) first
    /// when freshness matters.
    pub fn get_value(&self, key: &str, default: &str) -> String {
        self.values.load().get_or(key, default).to_string()
    }

    /// Value for `key` in the current snapshot
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.load().get(key).map(str::to_string)
    }

    /// Whether `key` is set in the current snapshot
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.load().contains_key(key)
    }

    /// Keys in the current snapshot that begin with `prefix`
    pub fn get_keys_starting_with(&self, prefix: &str) -> HashSet<String> {
        self.values.load().keys_starting_with(prefix)
    }

    /// Number of keys in the current snapshot
    pub fn len(&self) -> usize {
        self.values.load().len()
    }

    /// Whether the current snapshot has no keys
    pub fn is_empty(&self) -> bool {
        self.values.load().is_empty()
    }

    /// The current snapshot, for several reads that must agree with each other
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.values.load_full()
    }

    /// Start an edit seeded with a private copy of the current snapshot
    ///
    /// Editors do not see each other's changes; the last commit wins.
    pub fn get_editor(&self) -> Editor<'_> {
        Editor::new(self, self.values.load().to_map())
    }

    /// Replace the whole file with `new_values`
    ///
    /// Resets the last-read marker so the next reload re-reads the file even
    /// if its modification time did not visibly move.
    pub(crate) fn write(&self, new_values: &HashMap<String, String>) -> StoreResult<()> {
        let content = format::render(new_values, &self.options);

        let mut state = self.lock_state();
        self.write_content(content.as_bytes())
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        state.last_read = None;
        state.last_check = None;
        Ok(())
    }

    fn write_content(&self, content: &[u8]) -> io::Result<()> {
        if self.options.create_parent_dirs
            && let Some(parent) = self.path.parent()
        {
            fs::create_dir_all(parent)?;
        }

        match self.options.write_mode {
            WriteMode::Truncate => {
                let mut file = File::create(&self.path)?;
                file.write_all(content)?;
                file.flush()
            }
            WriteMode::Atomic => {
                let mut writer = AtomicWriter::create(&self.path)?;
                writer.write_all(content)?;
                writer.commit()
            }
        }
    }
}

impl fmt::Debug for PropertiesFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertiesFile")
            .field("path", &self.path)
            .field("keys", &self.len())
            .field("options", &self.options)
            .finish()
    }
}
