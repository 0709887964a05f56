//! Link lifecycle on top of the key/value store
//!
//! Each link occupies two slots: the primary slot (`key -> url`) read by the
//! redirect path, and the metadata slot (`meta:key -> LinkEntry JSON`) read
//! by the management API. The two writes are not atomic; concurrent writers
//! on the same key can leave the slots disagreeing. [`LinkRepository::reconcile`]
//! repairs what it can.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::Identity;
use crate::errors::{LinkmapError, Result};
use crate::services::is_redirectable;
use crate::storage::{KvStore, LinkEntry, METADATA_PREFIX, StoredEntry, is_metadata_key, metadata_key};

/// Outcome of a [`LinkRepository::reconcile`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Metadata slots whose primary slot no longer exists.
    pub orphans_removed: usize,
    /// Metadata slots rewritten because their `url` disagreed with the primary slot.
    pub metadata_repaired: usize,
    /// Primary slots without usable metadata. Left untouched.
    pub legacy_entries: usize,
}

#[derive(Clone)]
pub struct LinkRepository {
    store: Arc<dyn KvStore>,
}

impl LinkRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// All links in store order. Legacy entries are synthesized with the
    /// current time and `createdBy = "unknown"`.
    pub async fn list(&self) -> Result<Vec<LinkEntry>> {
        let now = Utc::now();
        let names = self.store.list_all().await?;
        let mut links = Vec::with_capacity(names.len());

        for name in names.iter().filter(|n| !is_metadata_key(n)) {
            // 列举与读取之间被删除的 key 直接跳过
            let Some(target_url) = self.store.get(name).await? else {
                debug!("Key '{}' vanished during listing", name);
                continue;
            };
            let metadata = self.store.get(&metadata_key(name)).await?;
            let entry = StoredEntry::resolve(name, target_url, metadata.as_deref());
            links.push(entry.into_link_entry(now));
        }

        Ok(links)
    }

    /// Look up a single link by key.
    pub async fn get(&self, key: &str) -> Result<Option<LinkEntry>> {
        if key.is_empty() || is_metadata_key(key) {
            return Ok(None);
        }
        Ok(self
            .load(key)
            .await?
            .map(|entry| entry.into_link_entry(Utc::now())))
    }

    pub async fn create(&self, key: &str, target_url: &str, identity: &Identity) -> Result<LinkEntry> {
        if key.is_empty() || target_url.is_empty() {
            return Err(LinkmapError::invalid_input("Missing required fields: key and url"));
        }
        validate_key(key)?;
        validate_target(target_url)?;

        if self.store.get(key).await?.is_some() {
            return Err(LinkmapError::conflict("Key already exists"));
        }

        let entry = LinkEntry::new(key, target_url, identity.email.as_str());
        self.write(&entry).await?;

        info!("LinkRepository: created '{}' -> {} by {}", key, target_url, entry.created_by);
        Ok(entry)
    }

    /// Replace the target. `createdAt`/`createdBy` are reset to the updater
    /// and the current time.
    pub async fn update(&self, key: &str, target_url: &str, identity: &Identity) -> Result<LinkEntry> {
        if target_url.is_empty() {
            return Err(LinkmapError::invalid_input("Missing required field: url"));
        }
        validate_target(target_url)?;

        if key.is_empty() || is_metadata_key(key) || self.store.get(key).await?.is_none() {
            return Err(LinkmapError::not_found("Key not found"));
        }

        let entry = LinkEntry::new(key, target_url, identity.email.as_str());
        self.write(&entry).await?;

        info!("LinkRepository: updated '{}' -> {} by {}", key, target_url, entry.created_by);
        Ok(entry)
    }

    /// Remove both slots and return what was there.
    pub async fn delete(&self, key: &str) -> Result<LinkEntry> {
        if key.is_empty() || is_metadata_key(key) {
            return Err(LinkmapError::not_found("Key not found"));
        }
        let Some(existing) = self.load(key).await? else {
            return Err(LinkmapError::not_found("Key not found"));
        };

        self.store.delete(key).await?;
        self.store.delete(&metadata_key(key)).await?;

        info!("LinkRepository: deleted '{}'", key);
        Ok(existing.into_link_entry(Utc::now()))
    }

    /// Repair pass over the whole store.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let names = self.store.list_all().await?;

        for name in &names {
            if let Some(primary) = name.strip_prefix(METADATA_PREFIX) {
                if self.store.get(primary).await?.is_none() {
                    warn!("Removing orphaned metadata for '{}'", primary);
                    self.store.delete(name).await?;
                    report.orphans_removed += 1;
                }
                continue;
            }

            let Some(entry) = self.load(name).await? else {
                continue;
            };
            match entry {
                StoredEntry::Legacy { .. } => report.legacy_entries += 1,
                StoredEntry::Structured(mut link) => {
                    let Some(target_url) = self.store.get(name).await? else {
                        continue;
                    };
                    if link.target_url != target_url {
                        warn!(
                            "Metadata for '{}' points to {} but primary slot holds {}; rewriting",
                            name, link.target_url, target_url
                        );
                        link.target_url = target_url;
                        self.store
                            .put(&metadata_key(name), &serde_json::to_string(&link)?)
                            .await?;
                        report.metadata_repaired += 1;
                    }
                }
            }
        }

        info!(
            "LinkRepository: reconcile finished (orphans removed: {}, repaired: {}, legacy: {})",
            report.orphans_removed, report.metadata_repaired, report.legacy_entries
        );
        Ok(report)
    }

    async fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        let Some(target_url) = self.store.get(key).await? else {
            return Ok(None);
        };
        let metadata = self.store.get(&metadata_key(key)).await?;
        Ok(Some(StoredEntry::resolve(key, target_url, metadata.as_deref())))
    }

    /// Primary slot first, then metadata.
    async fn write(&self, entry: &LinkEntry) -> Result<()> {
        let metadata = serde_json::to_string(entry)?;
        self.store.put(&entry.key, &entry.target_url).await?;
        self.store.put(&metadata_key(&entry.key), &metadata).await?;
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.contains('/') {
        return Err(LinkmapError::invalid_input("Key must not contain '/'"));
    }
    if is_metadata_key(key) {
        return Err(LinkmapError::invalid_input(format!(
            "Key must not start with '{}'",
            METADATA_PREFIX
        )));
    }
    Ok(())
}

fn validate_target(target_url: &str) -> Result<()> {
    if !is_redirectable(target_url) {
        return Err(LinkmapError::invalid_input("Invalid URL format"));
    }
    Url::parse(target_url)
        .map(|_| ())
        .map_err(|_| LinkmapError::invalid_input("Invalid URL format"))
}
