//! Key-value store persisted as a single pretty-printed JSON file.
//!
//! The whole map is loaded at open time and rewritten on every change.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::KvStore;

pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store, loading existing contents if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store from {}", path.display()))?;
            let entries: BTreeMap<String, String> = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse store from {}", path.display()))?;
            info!(path = %path.display(), keys = entries.len(), "Store loaded from disk");
            entries
        } else {
            info!(path = %path.display(), "No saved store found, starting fresh");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries).context("Failed to serialise store")?;
        std::fs::write(&self.path, &json)
            .with_context(|| format!("Failed to write store to {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Store saved");
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}
