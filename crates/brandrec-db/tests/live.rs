//! Live integration tests for brandrec-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness, which needs `DATABASE_URL`. The `migrations` path is
//! relative to the crate root (`crates/brandrec-db/`), so `"../../migrations"`
//! resolves to the workspace migration directory.

use brandrec_core::{build_at, BrandEntry, ComparisonRecord, Matcher, SnapshotStore};
use brandrec_db::{
    delete_comparison, get_comparison, insert_comparison, list_comparisons,
    list_comparisons_by_source_pair, PgSnapshotStore,
};
use chrono::{TimeZone, Utc};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn record(day: u32, source_a: &str) -> ComparisonRecord {
    build_at(
        &[BrandEntry::new("Gucci", 50), BrandEntry::new("Prada Beauty", 10)],
        &[BrandEntry::new("GUCCI", 45), BrandEntry::new("Chanel", 5)],
        source_a,
        "https://b.example/designers",
        &Matcher::default(),
        Utc.with_ymd_and_hms(2025, 4, day, 9, 0, 0).unwrap(),
    )
    .expect("build failed")
}

// ---------------------------------------------------------------------------
// Section 1: comparisons queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_then_get_round_trips_record(pool: sqlx::PgPool) {
    let original = record(1, "https://a.example/designers");
    let inserted = insert_comparison(&pool, &original, Some("  April  "))
        .await
        .expect("insert_comparison failed");
    assert_eq!(inserted.comparison_name.as_deref(), Some("April"));

    let row = get_comparison(&pool, inserted.id)
        .await
        .expect("get_comparison failed")
        .expect("row should exist");
    assert_eq!(row.public_id, inserted.public_id);
    assert_eq!(row.into_record().expect("decode failed"), original);
}

#[sqlx::test(migrations = "../../migrations")]
async fn blank_name_is_stored_as_null(pool: sqlx::PgPool) {
    let inserted = insert_comparison(&pool, &record(1, "a"), Some("   "))
        .await
        .expect("insert_comparison failed");
    assert!(inserted.comparison_name.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn listings_are_newest_first(pool: sqlx::PgPool) {
    insert_comparison(&pool, &record(1, "a"), None).await.unwrap();
    insert_comparison(&pool, &record(3, "a"), None).await.unwrap();
    insert_comparison(&pool, &record(2, "other"), None).await.unwrap();

    let all = list_comparisons(&pool).await.expect("list failed");
    let days: Vec<String> = all
        .iter()
        .map(|r| r.created_at.format("%d").to_string())
        .collect();
    assert_eq!(days, vec!["03", "02", "01"]);

    let pair = list_comparisons_by_source_pair(&pool, "a", "https://b.example/designers")
        .await
        .expect("list by pair failed");
    assert_eq!(pair.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_reports_whether_a_row_was_removed(pool: sqlx::PgPool) {
    let inserted = insert_comparison(&pool, &record(1, "a"), None).await.unwrap();
    assert!(delete_comparison(&pool, inserted.id).await.unwrap());
    assert!(!delete_comparison(&pool, inserted.id).await.unwrap());
    assert!(get_comparison(&pool, inserted.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Section 2: SnapshotStore contract
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn pg_store_satisfies_contract(pool: sqlx::PgPool) {
    let store = PgSnapshotStore::new(pool);
    let original = record(5, "a");

    let id = store.save(&original, Some("weekly")).await.expect("save failed");
    assert_eq!(store.load(id).await.unwrap(), Some(original));

    let metas = store
        .list_by_source_pair("a", "https://b.example/designers")
        .await
        .unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].label(), "weekly");

    assert!(store.delete(id).await.unwrap());
    assert!(store.load(id).await.unwrap().is_none());
    assert!(store.list().await.unwrap().is_empty());
}
