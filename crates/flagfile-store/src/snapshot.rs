//! Immutable key-value snapshot

use std::collections::{HashMap, HashSet};

/// The full mapping loaded from the backing file
///
/// A snapshot is never mutated after it is published; a reload builds a new
/// one and swaps it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    values: HashMap<String, String>,
}

impl Snapshot {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key`, or `default` if the key is not set
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// All keys whose text begins with `prefix`; an empty prefix matches every key
    pub fn keys_starting_with(&self, prefix: &str) -> HashSet<String> {
        self.values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Private copy of the mapping, used to seed an editor
    pub fn to_map(&self) -> HashMap<String, String> {
        self.values.clone()
    }
}

impl From<HashMap<String, String>> for Snapshot {
    fn from(values: HashMap<String, String>) -> Self {
        Self::new(values)
    }
}
