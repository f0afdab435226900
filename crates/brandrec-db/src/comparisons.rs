//! Database operations for the `comparisons` table.

use brandrec_core::{ComparisonRecord, SnapshotMeta};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A full row from the `comparisons` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ComparisonRow {
    pub id: i64,
    pub public_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source_a_identifier: String,
    pub source_b_identifier: String,
    pub comparison_name: Option<String>,
    pub comparison_data: Value,
    pub saved_at: DateTime<Utc>,
}

/// A `comparisons` row without its JSONB payload, for listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ComparisonSummaryRow {
    pub id: i64,
    pub public_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source_a_identifier: String,
    pub source_b_identifier: String,
    pub comparison_name: Option<String>,
}

impl From<ComparisonSummaryRow> for SnapshotMeta {
    fn from(row: ComparisonSummaryRow) -> Self {
        SnapshotMeta {
            id: row.id,
            created_at: row.created_at,
            source_a_identifier: row.source_a_identifier,
            source_b_identifier: row.source_b_identifier,
            name: row.comparison_name,
        }
    }
}

impl ComparisonRow {
    /// Decode the stored payload into a [`ComparisonRecord`].
    ///
    /// Payloads written before the record carried its own timestamp and
    /// source identifiers get them from the row's columns.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the payload is not a record.
    pub fn into_record(self) -> Result<ComparisonRecord, DbError> {
        let mut data = self.comparison_data;
        if let Value::Object(map) = &mut data {
            map.entry("created_at")
                .or_insert_with(|| Value::String(self.created_at.to_rfc3339()));
            map.entry("source_a_identifier")
                .or_insert_with(|| Value::String(self.source_a_identifier.clone()));
            map.entry("source_b_identifier")
                .or_insert_with(|| Value::String(self.source_b_identifier.clone()));
        }
        Ok(ComparisonRecord::from_json(data)?)
    }
}

const SUMMARY_COLUMNS: &str =
    "id, public_id, created_at, source_a_identifier, source_b_identifier, comparison_name";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a comparison record and returns the new row's listing columns.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if the record cannot be encoded, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_comparison(
    pool: &PgPool,
    record: &ComparisonRecord,
    name: Option<&str>,
) -> Result<ComparisonSummaryRow, DbError> {
    let public_id = Uuid::new_v4();
    let data = record.to_json()?;
    let name = name.map(str::trim).filter(|n| !n.is_empty());

    let row = sqlx::query_as::<_, ComparisonSummaryRow>(&format!(
        "INSERT INTO comparisons \
             (public_id, created_at, source_a_identifier, source_b_identifier, \
              comparison_name, comparison_data) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {SUMMARY_COLUMNS}"
    ))
    .bind(public_id)
    .bind(record.created_at)
    .bind(&record.source_a_identifier)
    .bind(&record.source_b_identifier)
    .bind(name)
    .bind(data)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a comparison by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_comparison(pool: &PgPool, id: i64) -> Result<Option<ComparisonRow>, DbError> {
    let row = sqlx::query_as::<_, ComparisonRow>(
        "SELECT id, public_id, created_at, source_a_identifier, source_b_identifier, \
                comparison_name, comparison_data, saved_at \
         FROM comparisons \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every comparison, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_comparisons(pool: &PgPool) -> Result<Vec<ComparisonSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, ComparisonSummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM comparisons ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the comparisons of one source pair, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_comparisons_by_source_pair(
    pool: &PgPool,
    source_a: &str,
    source_b: &str,
) -> Result<Vec<ComparisonSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, ComparisonSummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM comparisons \
         WHERE source_a_identifier = $1 AND source_b_identifier = $2 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(source_a)
    .bind(source_b)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes a comparison. Returns `false` if no row had that id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_comparison(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM comparisons WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
