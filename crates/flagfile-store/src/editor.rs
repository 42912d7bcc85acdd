//! Copy-on-write editor for bulk changes

use crate::error::StoreResult;
use crate::format;
use crate::store::PropertiesFile;
use std::collections::HashMap;

/// A single change to one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueUpdate {
    Set(String),
    Remove,
}

/// `None` means "remove the key"
impl From<Option<String>> for ValueUpdate {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) => ValueUpdate::Set(v),
            None => ValueUpdate::Remove,
        }
    }
}

impl From<String> for ValueUpdate {
    fn from(value: String) -> Self {
        ValueUpdate::Set(value)
    }
}

impl From<&str> for ValueUpdate {
    fn from(value: &str) -> Self {
        ValueUpdate::Set(value.to_string())
    }
}

/// Pending changes against one [`PropertiesFile`]
///
/// Holds a private copy of the snapshot taken when the editor was created.
/// Nothing is visible to the store or on disk until [`commit`](Self::commit),
/// and dropping the editor discards the changes.
#[derive(Debug)]
#[must_use = "changes are discarded unless the editor is committed"]
pub struct Editor<'a> {
    store: &'a PropertiesFile,
    pending: HashMap<String, String>,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(store: &'a PropertiesFile, pending: HashMap<String, String>) -> Self {
        Self { store, pending }
    }

    /// Set or overwrite `key`
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pending.insert(key.into(), value.into());
        self
    }

    /// Remove `key`
    pub fn remove_value(&mut self, key: &str) -> &mut Self {
        self.pending.remove(key);
        self
    }

    /// Apply a tagged set or remove to `key`
    pub fn apply(&mut self, key: impl Into<String>, update: impl Into<ValueUpdate>) -> &mut Self {
        let key = key.into();
        match update.into() {
            ValueUpdate::Set(value) => {
                self.pending.insert(key, value);
            }
            ValueUpdate::Remove => {
                self.pending.remove(&key);
            }
        }
        self
    }

    /// Remove every pending key that begins with `prefix`, returning how many were removed
    pub fn remove_keys_starting_with(&mut self, prefix: &str) -> usize {
        let before = self.pending.len();
        self.pending.retain(|k, _| !k.starts_with(prefix));
        before - self.pending.len()
    }

    /// Pending value for `key`
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.pending.get(key).map(String::as_str)
    }

    /// Number of pending keys
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no keys are pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// File content a commit would write
    pub fn render(&self) -> String {
        format::render(&self.pending, self.store.options())
    }

    /// Replace the backing file with the pending values
    ///
    /// On failure the error is returned as-is; nothing is retried and the
    /// store's snapshot is left alone.
    pub fn commit(self) -> StoreResult<()> {
        self.store.write(&self.pending)
    }
}
