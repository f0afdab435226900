//! [`SnapshotStore`] backed by the `comparisons` table.

use async_trait::async_trait;
use brandrec_core::{ComparisonRecord, SnapshotId, SnapshotMeta, SnapshotStore, StoreError};
use sqlx::PgPool;

use crate::comparisons::{
    delete_comparison, get_comparison, insert_comparison, list_comparisons,
    list_comparisons_by_source_pair,
};
use crate::DbError;

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::MissingDatabaseUrl => StoreError::Unavailable(err.to_string()),
            DbError::Sqlx(
                e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => StoreError::Unavailable(e.to_string()),
            DbError::Serialization(e) => StoreError::Serialization(e),
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

/// Postgres snapshot store. Each call is a single statement, so writes are
/// atomic without an explicit transaction.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn save(
        &self,
        record: &ComparisonRecord,
        name: Option<&str>,
    ) -> Result<SnapshotId, StoreError> {
        let row = insert_comparison(&self.pool, record, name).await?;
        tracing::info!(
            id = row.id,
            public_id = %row.public_id,
            source_a = %row.source_a_identifier,
            source_b = %row.source_b_identifier,
            rows = record.rows.len(),
            "saved comparison snapshot"
        );
        Ok(row.id)
    }

    async fn load(&self, id: SnapshotId) -> Result<Option<ComparisonRecord>, StoreError> {
        match get_comparison(&self.pool, id).await? {
            Some(row) => Ok(Some(row.into_record()?)),
            None => Ok(None),
        }
    }

    async fn list_by_source_pair(
        &self,
        source_a: &str,
        source_b: &str,
    ) -> Result<Vec<SnapshotMeta>, StoreError> {
        let rows = list_comparisons_by_source_pair(&self.pool, source_a, source_b).await?;
        Ok(rows.into_iter().map(SnapshotMeta::from).collect())
    }

    async fn list(&self) -> Result<Vec<SnapshotMeta>, StoreError> {
        let rows = list_comparisons(&self.pool).await?;
        Ok(rows.into_iter().map(SnapshotMeta::from).collect())
    }

    async fn delete(&self, id: SnapshotId) -> Result<bool, StoreError> {
        let deleted = delete_comparison(&self.pool, id).await?;
        if deleted {
            tracing::info!(id, "deleted comparison snapshot");
        }
        Ok(deleted)
    }
}
