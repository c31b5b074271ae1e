use crate::errors::{JournalError, JournalResult};
use crate::markup::sample::sample_markups;
use crate::markup::MarkupEntry;
use crate::store::EntryStore;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of a bulk replace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// In-memory view of the journal mirrored against an `EntryStore`.
///
/// The store is written first and the cache only follows a successful
/// write, so a failed call leaves the cache as it was. The write lock is
/// held across the store call: there is a single writer at a time.
pub struct MarkupRepository {
    store: Arc<dyn EntryStore>,
    cache: RwLock<Vec<MarkupEntry>>,
}

impl MarkupRepository {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(Vec::new()),
        }
    }

    /// Load the store into the cache. An empty store is seeded with the
    /// sample markups when `seed_samples` is set. Returns the entry count.
    ///
    /// Every sample is attempted even when one fails; the cache keeps the
    /// ones persisted and the first failure is returned.
    pub async fn hydrate(&self, seed_samples: bool) -> JournalResult<usize> {
        let mut cache = self.cache.write().await;
        let mut stored: Vec<MarkupEntry> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(MarkupEntry::normalized)
            .collect();

        let mut seed_error = None;
        if stored.is_empty() && seed_samples {
            for entry in sample_markups() {
                match self.store.create(&entry).await {
                    Ok(()) => stored.push(entry),
                    Err(e) => {
                        tracing::error!(id = %entry.id, error = %e, "sample seeding failed");
                        seed_error.get_or_insert(e);
                    }
                }
            }
            tracing::info!(count = stored.len(), "empty journal seeded with samples");
        }

        *cache = stored;
        match seed_error {
            Some(e) => Err(e),
            None => Ok(cache.len()),
        }
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<MarkupEntry> {
        let mut entries = self.cache.read().await.clone();
        entries.sort_by(|a, b| b.datetime_local.cmp(&a.datetime_local));
        entries
    }

    pub async fn get(&self, id: &str) -> Option<MarkupEntry> {
        self.cache.read().await.iter().find(|e| e.id == id).cloned()
    }

    pub async fn add(&self, entry: MarkupEntry) -> JournalResult<MarkupEntry> {
        let mut cache = self.cache.write().await;
        if cache.iter().any(|e| e.id == entry.id) {
            return Err(JournalError::Conflict(entry.id));
        }
        let entry = entry.normalized();

        if let Err(e) = self.store.create(&entry).await {
            tracing::error!(id = %entry.id, error = %e, "create failed, cache untouched");
            return Err(e);
        }
        cache.push(entry.clone());
        Ok(entry)
    }

    /// Read the current entry, apply `transform`, persist, then replace.
    /// The id is kept whatever the transform does.
    pub async fn update<F>(&self, id: &str, transform: F) -> JournalResult<MarkupEntry>
    where
        F: FnOnce(MarkupEntry) -> MarkupEntry + Send,
    {
        let mut cache = self.cache.write().await;
        let pos = cache
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| JournalError::NotFound(id.to_string()))?;

        let mut next = transform(cache[pos].clone()).normalized();
        next.id = id.to_string();

        if let Err(e) = self.store.update(&next).await {
            tracing::error!(id, error = %e, "update failed, cache untouched");
            return Err(e);
        }
        cache[pos] = next.clone();
        Ok(next)
    }

    pub async fn remove(&self, id: &str) -> JournalResult<()> {
        let mut cache = self.cache.write().await;
        if !cache.iter().any(|e| e.id == id) {
            return Err(JournalError::NotFound(id.to_string()));
        }

        if let Err(e) = self.store.remove(id).await {
            tracing::error!(id, error = %e, "remove failed, cache untouched");
            return Err(e);
        }
        cache.retain(|e| e.id != id);
        Ok(())
    }

    /// Make the journal equal to `next`: new ids are created, missing ids
    /// deleted, changed entries updated. Stops at the first store failure;
    /// the cache then reflects exactly what was persisted.
    pub async fn replace_all(&self, next: Vec<MarkupEntry>) -> JournalResult<SyncReport> {
        let mut cache = self.cache.write().await;
        let next: Vec<MarkupEntry> = next.into_iter().map(MarkupEntry::normalized).collect();
        let next_ids: HashSet<&str> = next.iter().map(|e| e.id.as_str()).collect();
        let mut report = SyncReport::default();

        let current: HashMap<String, MarkupEntry> = cache.iter().map(|e| (e.id.clone(), e.clone())).collect();

        for entry in &next {
            match current.get(&entry.id) {
                None => {
                    self.store.create(entry).await?;
                    cache.push(entry.clone());
                    report.created += 1;
                }
                Some(prev) if prev != entry => {
                    self.store.update(entry).await?;
                    if let Some(slot) = cache.iter_mut().find(|e| e.id == entry.id) {
                        *slot = entry.clone();
                    }
                    report.updated += 1;
                }
                Some(_) => {}
            }
        }

        for id in current.keys().filter(|id| !next_ids.contains(id.as_str())) {
            self.store.remove(id).await?;
            cache.retain(|e| &e.id != id);
            report.deleted += 1;
        }

        tracing::info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            "journal replaced"
        );
        Ok(report)
    }
}
