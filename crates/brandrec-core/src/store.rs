//! Snapshot persistence contract.
//!
//! The core only ever talks to a [`SnapshotStore`]; the Postgres
//! implementation lives in `brandrec-db`. [`MemorySnapshotStore`] serves
//! tests and callers without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::comparison::ComparisonRecord;

pub type SnapshotId = i64;

/// Listing entry for a saved comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotMeta {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    pub source_a_identifier: String,
    pub source_b_identifier: String,
    pub name: Option<String>,
}

impl SnapshotMeta {
    /// The snapshot's name, or `ID <id> (<timestamp>)` when it has none.
    #[must_use]
    pub fn label(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "ID {} ({})",
                self.id,
                self.created_at.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }

    /// Whether this snapshot compares `source_a` against `source_b`.
    #[must_use]
    pub fn matches_pair(&self, source_a: &str, source_b: &str) -> bool {
        self.source_a_identifier == source_a && self.source_b_identifier == source_b
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Durable storage for comparison records.
///
/// Implementations never retry; a failure surfaces once as [`StoreError`].
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist `record`, optionally under a display `name`, returning its id.
    async fn save(
        &self,
        record: &ComparisonRecord,
        name: Option<&str>,
    ) -> Result<SnapshotId, StoreError>;

    /// Fetch a record; `Ok(None)` when the id is unknown.
    async fn load(&self, id: SnapshotId) -> Result<Option<ComparisonRecord>, StoreError>;

    /// Snapshots of one source pair, newest first.
    async fn list_by_source_pair(
        &self,
        source_a: &str,
        source_b: &str,
    ) -> Result<Vec<SnapshotMeta>, StoreError>;

    /// Every snapshot, newest first.
    async fn list(&self) -> Result<Vec<SnapshotMeta>, StoreError>;

    /// Remove a snapshot; `Ok(false)` when the id is unknown.
    async fn delete(&self, id: SnapshotId) -> Result<bool, StoreError>;
}

struct StoredSnapshot {
    meta: SnapshotMeta,
    data: serde_json::Value,
}

/// Process-local store. Records are kept in their serialized form so loads
/// go through the same repair path as the database store.
pub struct MemorySnapshotStore {
    snapshots: RwLock<BTreeMap<SnapshotId, StoredSnapshot>>,
    next_id: AtomicI64,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Unavailable("memory store lock poisoned".to_string())
    }

    fn newest_first(mut metas: Vec<SnapshotMeta>) -> Vec<SnapshotMeta> {
        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        metas
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(
        &self,
        record: &ComparisonRecord,
        name: Option<&str>,
    ) -> Result<SnapshotId, StoreError> {
        let data = record.to_json()?;
        let mut snapshots = self.snapshots.write().map_err(Self::poisoned)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        snapshots.insert(
            id,
            StoredSnapshot {
                meta: SnapshotMeta {
                    id,
                    created_at: record.created_at,
                    source_a_identifier: record.source_a_identifier.clone(),
                    source_b_identifier: record.source_b_identifier.clone(),
                    name: name.map(str::to_string),
                },
                data,
            },
        );
        tracing::info!(id, rows = record.rows.len(), "saved comparison snapshot");
        Ok(id)
    }

    async fn load(&self, id: SnapshotId) -> Result<Option<ComparisonRecord>, StoreError> {
        let snapshots = self.snapshots.read().map_err(Self::poisoned)?;
        snapshots
            .get(&id)
            .map(|s| ComparisonRecord::from_json(s.data.clone()))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn list_by_source_pair(
        &self,
        source_a: &str,
        source_b: &str,
    ) -> Result<Vec<SnapshotMeta>, StoreError> {
        let snapshots = self.snapshots.read().map_err(Self::poisoned)?;
        let metas = snapshots
            .values()
            .filter(|s| s.meta.matches_pair(source_a, source_b))
            .map(|s| s.meta.clone())
            .collect();
        Ok(Self::newest_first(metas))
    }

    async fn list(&self) -> Result<Vec<SnapshotMeta>, StoreError> {
        let snapshots = self.snapshots.read().map_err(Self::poisoned)?;
        let metas = snapshots.values().map(|s| s.meta.clone()).collect();
        Ok(Self::newest_first(metas))
    }

    async fn delete(&self, id: SnapshotId) -> Result<bool, StoreError> {
        let mut snapshots = self.snapshots.write().map_err(Self::poisoned)?;
        let removed = snapshots.remove(&id).is_some();
        if removed {
            tracing::info!(id, "deleted comparison snapshot");
        }
        Ok(removed)
    }
}
