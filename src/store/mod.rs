pub mod rest;
pub mod row;
pub mod sqlite;

use crate::errors::JournalResult;
use crate::markup::types::decode_entries_lenient;
use crate::markup::MarkupEntry;
use async_trait::async_trait;
use std::path::Path;

/// Authoritative persistence for entries, keyed by id.
/// Every operation stands alone: there is no transaction across entries.
#[async_trait]
pub trait EntryStore: Send + Sync + 'static {
    /// Every stored entry, in no particular order.
    async fn list(&self) -> JournalResult<Vec<MarkupEntry>>;

    /// Fails with `Conflict` when the id is already stored.
    async fn create(&self, entry: &MarkupEntry) -> JournalResult<()>;

    /// Full-record replace. Fails with `NotFound` for an unknown id.
    async fn update(&self, entry: &MarkupEntry) -> JournalResult<()>;

    /// Fails with `NotFound` for an unknown id.
    async fn remove(&self, id: &str) -> JournalResult<()>;
}

/// Copy entries from the old JSON cache file into `store`, once.
/// Nothing happens when the store already holds entries or the file is missing.
pub async fn migrate_legacy_cache(store: &dyn EntryStore, path: &Path) -> JournalResult<usize> {
    if !store.list().await?.is_empty() {
        tracing::debug!("store not empty, skipping legacy cache migration");
        return Ok(0);
    }

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no legacy cache");
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let entries = decode_entries_lenient(&raw);
    let mut migrated = 0usize;
    for entry in &entries {
        store.create(&entry.clone().normalized()).await?;
        migrated += 1;
    }

    tracing::info!(path = %path.display(), migrated, "legacy cache migrated");
    Ok(migrated)
}
