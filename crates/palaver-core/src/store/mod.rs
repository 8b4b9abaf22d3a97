//! Durable key/value store backed by a JSON file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PalaverResult;

/// A stored value with its write timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Crash-resistant key/value persistence with a synchronous in-memory
/// cache.
///
/// Every mutating call serializes the whole cache to the backing file
/// before reporting success. Writes go to a temp file in the same
/// directory and are swapped in with a rename, so a failed persist never
/// leaves a partially-written file behind. Entries are never
/// time-expired; they live until deleted or cleared.
pub struct DurableStore {
    path: PathBuf,
    cache: HashMap<String, StoreEntry>,
}

impl DurableStore {
    /// Open a store against `path`, loading any existing state.
    ///
    /// A missing file is an empty store. A corrupt file is logged and
    /// treated as empty (fails open).
    pub fn open(path: impl AsRef<Path>) -> PalaverResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let cache = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(cache) => cache,
                Err(e) => {
                    tracing::warn!(
                        "corrupt store file {}: {}; starting with empty store",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, cache })
    }

    /// Store a value under `key` and persist.
    ///
    /// Returns `false` when the file write fails; the value stays in the
    /// cache so the in-memory session keeps functioning, but durability of
    /// this write is lost.
    pub fn save(&mut self, key: impl Into<String>, value: Value) -> bool {
        self.cache.insert(
            key.into(),
            StoreEntry {
                data: value,
                timestamp: Utc::now(),
            },
        );
        self.persist_logged()
    }

    /// Look up the value stored under `key`.
    pub fn load(&self, key: &str) -> Option<Value> {
        self.cache.get(key).map(|entry| entry.data.clone())
    }

    /// Look up the full entry (value plus write timestamp) under `key`.
    pub fn load_entry(&self, key: &str) -> Option<&StoreEntry> {
        self.cache.get(key)
    }

    /// Whether `key` is present.
    pub fn exists(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Remove `key` and persist. Returns `false` when the key was absent
    /// or the persist failed.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.cache.remove(key).is_none() {
            return false;
        }
        self.persist_logged()
    }

    /// All stored keys, sorted.
    pub fn get_all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.cache.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove every entry and persist the empty store.
    pub fn clear(&mut self) -> bool {
        self.cache.clear();
        self.persist_logged()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist_logged(&self) -> bool {
        match self.persist() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("failed to persist store {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Write the whole cache atomically: temp file in the same directory,
    /// then rename over the target.
    fn persist(&self) -> PalaverResult<()> {
        let json = serde_json::to_string_pretty(&self.cache)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
