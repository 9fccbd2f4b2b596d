//! In-memory record store.
//!
//! Queries read a snapshot; the only mutation is a wholesale reload.

use crate::models::Record;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Shared, cloneable handle to the record table.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<RwLock<Vec<Record>>>,
    loaded_at: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Held for the whole of a reload so two reloads never interleave.
    reload_lock: Arc<Mutex<()>>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records.
    #[cfg(test)]
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            loaded_at: Arc::new(RwLock::new(Some(Utc::now()))),
            reload_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Copy of every record, in load order.
    pub async fn snapshot(&self) -> Vec<Record> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Distinct lowercased locations, in order of first appearance.
    pub async fn locations(&self) -> Vec<String> {
        known_locations(&self.records.read().await)
    }

    pub async fn loaded_at(&self) -> Option<DateTime<Utc>> {
        *self.loaded_at.read().await
    }

    /// Delete everything, then bulk-insert.
    ///
    /// The two steps take the write lock separately, so a reader running in
    /// between sees an empty table. Concurrent reloads run one at a time.
    pub async fn replace_all(&self, records: Vec<Record>) -> usize {
        let _reload = self.reload_lock.lock().await;

        let removed = {
            let mut guard = self.records.write().await;
            let removed = guard.len();
            guard.clear();
            removed
        };
        debug!("Deleted {} existing records", removed);

        let inserted = records.len();
        self.records.write().await.extend(records);
        *self.loaded_at.write().await = Some(Utc::now());
        debug!("Inserted {} records", inserted);

        inserted
    }
}

/// Distinct lowercased location names, in order of first appearance.
pub fn known_locations(records: &[Record]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        let name = record.final_location.to_lowercase();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}
