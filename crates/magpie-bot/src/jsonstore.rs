//! File-backed store.
//!
//! The whole dataset stays in memory; [`Store::sync`] rewrites the file
//! through a temp sibling and renames it into place, so a crash during
//! a write leaves the previous snapshot readable.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use magpie_core::error::{BotError, Result};
use magpie_core::store::Store;

#[cfg(test)]
#[path = "jsonstore_tests.rs"]
mod jsonstore_tests;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

pub struct JsonStore {
    path: PathBuf,
    data: Mutex<Collections>,
}

impl JsonStore {
    /// Loads the file, or starts empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let data = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse store file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Collections::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read store file {}", path.display()))
            }
        };
        info!(path = %path.display(), collections = data.len(), "store opened");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn get_all(&self, collection: &str) -> Result<BTreeMap<String, Value>> {
        Ok(self
            .data
            .lock()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_all(&self, collection: &str, entries: BTreeMap<String, Value>) -> Result<()> {
        self.data
            .lock()
            .await
            .insert(collection.to_string(), entries);
        Ok(())
    }

    async fn sync(&self) -> Result<()> {
        let snapshot = self.data.lock().await.clone();
        let encoded = serde_json::to_vec_pretty(&snapshot).map_err(store_err)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await.map_err(store_err)?;
        file.write_all(&encoded).await.map_err(store_err)?;
        file.sync_all().await.map_err(store_err)?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await.map_err(store_err)?;
        Ok(())
    }
}

fn store_err(err: impl std::fmt::Display) -> BotError {
    BotError::Store(err.to_string())
}
