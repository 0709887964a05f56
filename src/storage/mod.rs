//! Key/value storage seam
//!
//! The link data lives in an external key/value store. This module defines
//! the adapter contract ([`KvStore`]), the stored record shapes, and the
//! concrete adapters the service ships with.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::Result;

pub mod memory;
pub mod models;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use memory::MemoryKvStore;
pub use models::{
    LEGACY_AUTHOR, LinkEntry, METADATA_PREFIX, StoredEntry, is_metadata_key, metadata_key,
};
#[cfg(feature = "redis-backend")]
pub use redis::RedisKvStore;

/// One key returned by [`KvStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvKey {
    pub name: String,
}

impl KvKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One page of keys.
///
/// When `list_complete` is false, `cursor` resumes the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvListResult {
    pub keys: Vec<KvKey>,
    pub list_complete: bool,
    pub cursor: Option<String>,
}

/// External key/value store.
///
/// Keys are flat strings; values are strings. The store provides no
/// transactions and no locking: each call stands alone, and a failed call
/// is reported as-is (no retries).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys in store order, one page per call.
    async fn list(&self, cursor: Option<&str>) -> Result<KvListResult>;

    fn backend_name(&self) -> &'static str;

    /// Read a value and parse it as JSON.
    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Walk every page of [`KvStore::list`] and return the key names.
    ///
    /// Names are de-duplicated (cursor-based stores may repeat a key across
    /// pages) while keeping first-seen order.
    async fn list_all(&self) -> Result<Vec<String>> {
        let mut seen = std::collections::HashSet::new();
        let mut names = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.list(cursor.as_deref()).await?;
            for key in page.keys {
                if seen.insert(key.name.clone()) {
                    names.push(key.name);
                }
            }
            match page.cursor {
                Some(next) if !page.list_complete => cursor = Some(next),
                _ => break,
            }
        }

        Ok(names)
    }
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn KvStore>> {
        let store: Arc<dyn KvStore> = match config.backend {
            StorageBackend::Memory => Arc::new(MemoryKvStore::with_page_size(config.memory.page_size)),
            #[cfg(feature = "redis-backend")]
            StorageBackend::Redis => Arc::new(RedisKvStore::connect(&config.redis).await?),
            #[cfg(not(feature = "redis-backend"))]
            StorageBackend::Redis => {
                return Err(crate::errors::LinkmapError::config(
                    "Redis backend requested but linkmap was built without the redis-backend feature",
                ));
            }
        };

        info!("Using storage backend: {}", store.backend_name());
        Ok(store)
    }
}
