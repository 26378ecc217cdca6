//! Durable key/value storage and values mirrored into it.
//!
//! A [`DurableStore`] maps string keys to serialized text, the way browser
//! local storage does. [`PersistentState`] sits on top of one key: it reads
//! the stored value once when created and writes the whole value back on
//! every change.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// A single JSON object file, `{ "<key>": "<serialized value>", ... }`.
///
/// Writes are atomic (temp file + rename). The file is re-read on every
/// access so several keys can share it.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_raw(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            debug!("Store file {:?} does not exist yet", self.path);
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match self.read_raw()? {
            Some(content) => Ok(parse_entries(&content)?),
            None => Ok(BTreeMap::new()),
        }
    }
}

fn parse_entries(content: &str) -> serde_json::Result<BTreeMap<String, String>> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(content)
}

impl DurableStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    #[instrument(skip(self, value), fields(path = ?self.path))]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        // I/O failures propagate; only unparsable content is rewritten
        let mut entries = match self.read_raw()? {
            Some(content) => parse_entries(&content).unwrap_or_else(|e| {
                warn!("Store file is not valid JSON ({}), rewriting it", e);
                BTreeMap::new()
            }),
            None => BTreeMap::new(),
        };
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, serde_json::to_string_pretty(&entries)?)?;
        std::fs::rename(&temp_path, &self.path)?;
        debug!("Wrote {} bytes under {}", value.len(), key);
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: std::sync::Mutex<BTreeMap<String, String>>,
}

#[cfg(test)]
impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A value loaded from `key` on creation and saved back on every change.
///
/// Stored data that cannot be read or parsed is logged and replaced by the
/// default; it stays on disk until the next save overwrites it.
pub struct PersistentState<T> {
    value: T,
    key: String,
    store: std::sync::Arc<dyn DurableStore>,
}

impl<T> PersistentState<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn init(default: T, key: &str, store: std::sync::Arc<dyn DurableStore>) -> Self {
        let value = match store.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    info!("Loaded stored value for {}", key);
                    value
                }
                Err(e) => {
                    warn!("Stored value for {} is malformed ({}), using default", key, e);
                    default
                }
            },
            Ok(None) => {
                debug!("Nothing stored under {}, using default", key);
                default
            }
            Err(e) => {
                warn!("Failed to read {} from store ({}), using default", key, e);
                default
            }
        };

        Self {
            value,
            key: key.to_string(),
            store,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    #[cfg(test)]
    pub fn set(&mut self, value: T) -> Result<()> {
        self.value = value;
        self.save()
    }

    pub fn update(&mut self, f: impl FnOnce(&mut T)) -> Result<()> {
        f(&mut self.value);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let serialized = serde_json::to_string(&self.value)?;
        self.store.set(&self.key, &serialized)
    }
}
