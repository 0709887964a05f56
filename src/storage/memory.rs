//! In-process key/value store.
//!
//! Keeps keys in insertion order so listings are stable. Data is lost when
//! the process exits; meant for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{KvKey, KvListResult, KvStore};
use crate::errors::{LinkmapError, Result};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Default)]
struct MemoryInner {
    order: Vec<String>,
    values: HashMap<String, String>,
}

pub struct MemoryKvStore {
    inner: RwLock<MemoryInner>,
    page_size: usize,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
            page_size: page_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().values.contains_key(key)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().values.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if inner
            .values
            .insert(key.to_string(), value.to_string())
            .is_none()
        {
            inner.order.push(key.to_string());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.values.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
        Ok(())
    }

    async fn list(&self, cursor: Option<&str>) -> Result<KvListResult> {
        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| LinkmapError::storage(format!("Invalid list cursor: {}", c)))?,
            None => 0,
        };

        let inner = self.inner.read();
        let end = (start + self.page_size).min(inner.order.len());
        let keys = inner
            .order
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|name| KvKey::new(name.clone()))
            .collect();
        let list_complete = end >= inner.order.len();

        Ok(KvListResult {
            keys,
            list_complete,
            cursor: (!list_complete).then(|| end.to_string()),
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryKvStore::new();
        store.put("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.put("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.is_empty());

        // absent key
        store.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite_keeps_original_position() {
        let store = MemoryKvStore::new();
        store.put("x", "1").await.unwrap();
        store.put("y", "1").await.unwrap();
        store.put("x", "2").await.unwrap();

        let page = store.list(None).await.unwrap();
        let names: Vec<_> = page.keys.into_iter().map(|k| k.name).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(page.list_complete);
        assert!(page.cursor.is_none());
    }

    #[tokio::test]
    async fn test_paged_listing() {
        let store = MemoryKvStore::with_page_size(2);
        for key in ["a", "b", "c"] {
            store.put(key, "v").await.unwrap();
        }

        let first = store.list(None).await.unwrap();
        assert_eq!(first.keys.len(), 2);
        assert!(!first.list_complete);

        let second = store.list(first.cursor.as_deref()).await.unwrap();
        assert_eq!(second.keys, vec![KvKey::new("c")]);
        assert!(second.list_complete);
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_storage_error() {
        let store = MemoryKvStore::new();
        assert!(matches!(
            store.list(Some("not-a-number")).await,
            Err(LinkmapError::Storage(_))
        ));
    }
}
