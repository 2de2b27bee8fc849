//! Named-collection key-value persistence.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::{BotError, Result};

/// Collection names used by the bot.
pub mod collections {
    /// Sticker file id -> response rule.
    pub const STICKER_RESPONSE: &str = "sticker_response";
    /// Regex pattern -> response rule.
    pub const TEXT_RESPONSE: &str = "text_response";
    /// Username -> numeric user id.
    pub const USER_IDS: &str = "user_ids";
    /// `"{chat}_{message}"` -> stored quote.
    pub const QUOTES: &str = "quotes";
}

/// A key-value store of named collections. Values are JSON; durability is
/// explicit through [`Store::sync`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_all(&self, collection: &str) -> Result<BTreeMap<String, Value>>;
    async fn replace_all(&self, collection: &str, entries: BTreeMap<String, Value>) -> Result<()>;
    /// Flushes buffered writes to durable storage.
    async fn sync(&self) -> Result<()>;
}

/// Reads a collection and decodes every entry, dropping ones that fail to
/// decode.
pub async fn load_typed<T>(store: &dyn Store, collection: &str) -> Result<BTreeMap<String, T>>
where
    T: serde::de::DeserializeOwned,
{
    let raw = store.get_all(collection).await?;
    let mut out = BTreeMap::new();
    for (key, value) in raw {
        match serde_json::from_value(value) {
            Ok(decoded) => {
                out.insert(key, decoded);
            }
            Err(err) => {
                warn!(collection, key = %key, %err, "dropping undecodable store entry");
            }
        }
    }
    Ok(out)
}

/// Inserts or replaces one entry, then syncs.
pub async fn put_entry<T: serde::Serialize>(
    store: &dyn Store,
    collection: &str,
    key: &str,
    value: &T,
) -> Result<()> {
    let mut all = store.get_all(collection).await?;
    let encoded = serde_json::to_value(value).map_err(|e| BotError::Store(e.to_string()))?;
    all.insert(key.to_string(), encoded);
    store.replace_all(collection, all).await?;
    store.sync().await
}

/// Removes one entry, then syncs. Returns whether the key existed.
pub async fn remove_entry(store: &dyn Store, collection: &str, key: &str) -> Result<bool> {
    let mut all = store.get_all(collection).await?;
    let existed = all.remove(key).is_some();
    store.replace_all(collection, all).await?;
    store.sync().await?;
    Ok(existed)
}

/// In-memory store backing tests.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    syncs: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sync calls so far.
    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_all(&self, collection: &str) -> Result<BTreeMap<String, Value>> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_all(&self, collection: &str, entries: BTreeMap<String, Value>) -> Result<()> {
        self.data
            .lock()
            .unwrap()
            .insert(collection.to_string(), entries);
        Ok(())
    }

    async fn sync(&self) -> Result<()> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
