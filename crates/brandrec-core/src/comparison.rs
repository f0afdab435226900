//! Comparison records: the reconciled, ordered table persisted per run.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reconcile::{display_name_for, fallback_key, reconcile, FuzzyOutcome, JoinedRow, MatchKind, Matcher};
use crate::{BrandEntry, Source, ValidationError};

/// The full result of one comparison run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub created_at: DateTime<Utc>,
    pub source_a_identifier: String,
    pub source_b_identifier: String,
    pub rows: Vec<JoinedRow>,
    #[serde(default)]
    pub fuzzy: FuzzyOutcome,
}

/// Derived counts over a record's rows. Recomputed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub brands_in_a: usize,
    pub brands_in_b: usize,
    pub products_in_a: i64,
    pub products_in_b: i64,
    pub common: usize,
    pub only_a: usize,
    pub only_b: usize,
}

impl ComparisonRecord {
    #[must_use]
    pub fn summary(&self) -> ComparisonSummary {
        let mut summary = ComparisonSummary {
            brands_in_a: 0,
            brands_in_b: 0,
            products_in_a: 0,
            products_in_b: 0,
            common: 0,
            only_a: 0,
            only_b: 0,
        };

        for row in &self.rows {
            let in_a = row.count_a > 0;
            let in_b = row.count_b > 0;
            summary.products_in_a = summary.products_in_a.saturating_add(row.count_a);
            summary.products_in_b = summary.products_in_b.saturating_add(row.count_b);
            match (in_a, in_b) {
                (true, true) => {
                    summary.brands_in_a += 1;
                    summary.brands_in_b += 1;
                    summary.common += 1;
                }
                (true, false) => {
                    summary.brands_in_a += 1;
                    summary.only_a += 1;
                }
                (false, true) => {
                    summary.brands_in_b += 1;
                    summary.only_b += 1;
                }
                (false, false) => {}
            }
        }

        summary
    }

    /// Rows listed by both sources.
    pub fn common_rows(&self) -> impl Iterator<Item = &JoinedRow> {
        self.rows.iter().filter(|r| r.is_common())
    }

    /// Rows listed only by `side`.
    pub fn exclusive_rows(&self, side: Source) -> impl Iterator<Item = &JoinedRow> {
        self.rows.iter().filter(move |r| match side {
            Source::A => r.count_a > 0 && r.count_b == 0,
            Source::B => r.count_b > 0 && r.count_a == 0,
        })
    }

    /// Whether both records compare the same pair of sources.
    #[must_use]
    pub fn same_source_pair(&self, other: &ComparisonRecord) -> bool {
        self.source_a_identifier == other.source_a_identifier
            && self.source_b_identifier == other.source_b_identifier
    }

    /// Serialize into the self-describing JSON shape handed to snapshot stores.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Restore a record from stored JSON.
    ///
    /// Older rows may lack `difference`, `display_name`, `canonical_key` or
    /// `match_kind`; those are re-derived from the counts and raw names.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the value does not have the record shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Reconcile two brand lists into an ordered [`ComparisonRecord`] stamped now.
///
/// # Errors
///
/// Returns [`ValidationError::NegativeCount`] if any entry has a negative count.
pub fn build(
    entries_a: &[BrandEntry],
    entries_b: &[BrandEntry],
    source_a_id: &str,
    source_b_id: &str,
    matcher: &Matcher,
) -> Result<ComparisonRecord, ValidationError> {
    build_at(entries_a, entries_b, source_a_id, source_b_id, matcher, Utc::now())
}

/// Like [`build`] with an explicit timestamp.
///
/// # Errors
///
/// Returns [`ValidationError::NegativeCount`] if any entry has a negative count.
pub fn build_at(
    entries_a: &[BrandEntry],
    entries_b: &[BrandEntry],
    source_a_id: &str,
    source_b_id: &str,
    matcher: &Matcher,
    created_at: DateTime<Utc>,
) -> Result<ComparisonRecord, ValidationError> {
    validate(entries_a, Source::A)?;
    validate(entries_b, Source::B)?;

    let deduped_a = merge_duplicate_names(entries_a);
    let deduped_b = merge_duplicate_names(entries_b);

    let reconciliation = reconcile(&deduped_a, &deduped_b, matcher);
    let mut rows = reconciliation.rows;
    sort_rows(&mut rows);

    Ok(ComparisonRecord {
        created_at,
        source_a_identifier: source_a_id.to_string(),
        source_b_identifier: source_b_id.to_string(),
        rows,
        fuzzy: reconciliation.fuzzy,
    })
}

fn validate(entries: &[BrandEntry], side: Source) -> Result<(), ValidationError> {
    match entries.iter().find(|e| e.count < 0) {
        Some(entry) => Err(ValidationError::NegativeCount {
            side,
            raw_name: entry.raw_name.clone(),
            count: entry.count,
        }),
        None => Ok(()),
    }
}

/// Collapse identical raw names within one source, keeping the max count.
///
/// Extractors sometimes list a brand twice (e.g. once per facet); the counts
/// overlap rather than add up.
fn merge_duplicate_names(entries: &[BrandEntry]) -> Vec<BrandEntry> {
    let mut merged: Vec<BrandEntry> = Vec::with_capacity(entries.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(entries.len());

    for entry in entries {
        if let Some(&at) = index.get(entry.raw_name.as_str()) {
            merged[at].count = merged[at].count.max(entry.count);
        } else {
            index.insert(entry.raw_name.as_str(), merged.len());
            merged.push(entry.clone());
        }
    }

    merged
}

/// Combined count descending, then display name (case-insensitive), then key.
fn sort_rows(rows: &mut [JoinedRow]) {
    rows.sort_by_cached_key(|r| {
        (
            Reverse(r.total()),
            r.display_name.to_lowercase(),
            r.display_name.clone(),
            r.canonical_key.clone(),
        )
    });
}

/// Stored row shape. Every derived field is optional so that rows written
/// before a field existed still load.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredRow {
    display_name: Option<String>,
    canonical_key: Option<String>,
    count_a: Option<i64>,
    count_b: Option<i64>,
    raw_name_a: Option<String>,
    raw_name_b: Option<String>,
    match_kind: Option<MatchKind>,
}

impl From<StoredRow> for JoinedRow {
    fn from(stored: StoredRow) -> Self {
        let count_a = stored.count_a.unwrap_or(0);
        let count_b = stored.count_b.unwrap_or(0);

        let display_name = stored
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                display_name_for(
                    stored.canonical_key.as_deref().unwrap_or_default(),
                    stored.raw_name_a.as_deref(),
                    stored.raw_name_b.as_deref(),
                    count_a,
                    count_b,
                )
            });

        let canonical_key = stored
            .canonical_key
            .unwrap_or_else(|| fallback_key(&display_name));

        let match_kind = stored.match_kind.unwrap_or(
            match (stored.raw_name_a.is_some(), stored.raw_name_b.is_some()) {
                (true, true) => MatchKind::Exact,
                (false, true) => MatchKind::OnlyB,
                _ => MatchKind::OnlyA,
            },
        );

        JoinedRow {
            display_name,
            canonical_key,
            count_a,
            count_b,
            // Stored `difference` is ignored; it can go stale.
            difference: count_a.saturating_sub(count_b),
            raw_name_a: stored.raw_name_a,
            raw_name_b: stored.raw_name_b,
            match_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn entries(pairs: &[(&str, i64)]) -> Vec<BrandEntry> {
        pairs
            .iter()
            .map(|(name, count)| BrandEntry::new(*name, *count))
            .collect()
    }

    fn scenario() -> ComparisonRecord {
        build(
            &entries(&[("Gucci", 50), ("Prada Beauty", 10)]),
            &entries(&[("GUCCI", 45), ("Chanel", 5)]),
            "https://a.example/women/shoes",
            "https://b.example/women/shoes",
            &Matcher::default(),
        )
        .unwrap()
    }

    #[test]
    fn end_to_end_scenario() {
        let record = scenario();

        let names: Vec<&str> = record.rows.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["Gucci", "Prada Beauty", "Chanel"]);

        let gucci = &record.rows[0];
        assert_eq!((gucci.count_a, gucci.count_b, gucci.difference), (50, 45, 5));
        let prada = &record.rows[1];
        assert_eq!(prada.canonical_key, "PRADA");
        assert_eq!((prada.count_a, prada.count_b, prada.difference), (10, 0, 10));
        let chanel = &record.rows[2];
        assert_eq!((chanel.count_a, chanel.count_b, chanel.difference), (0, 5, -5));

        let summary = record.summary();
        assert_eq!(summary.common, 1);
        assert_eq!(summary.only_a, 1);
        assert_eq!(summary.only_b, 1);
        assert_eq!(summary.brands_in_a, 2);
        assert_eq!(summary.brands_in_b, 2);
        assert_eq!(summary.products_in_a, 60);
        assert_eq!(summary.products_in_b, 50);
    }

    #[test]
    fn negative_count_is_rejected() {
        let err = build(
            &entries(&[("Gucci", 1)]),
            &entries(&[("Prada", -2)]),
            "a",
            "b",
            &Matcher::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::NegativeCount {
                side: Source::B,
                raw_name: "Prada".to_string(),
                count: -2,
            }
        );
    }

    #[test]
    fn huge_counts_saturate_in_rows_and_summary() {
        let record = build(
            &entries(&[("Gucci", i64::MAX), ("GUCCI", 1), ("Prada", 3)]),
            &[],
            "a",
            "b",
            &Matcher::default(),
        )
        .unwrap();

        assert_eq!(record.rows[0].count_a, i64::MAX);
        assert_eq!(record.summary().products_in_a, i64::MAX);
    }

    #[test]
    fn empty_inputs_build_an_empty_record() {
        let record = build(&[], &[], "a", "b", &Matcher::default()).unwrap();
        assert!(record.rows.is_empty());
        assert_eq!(record.summary().common, 0);
    }

    #[test]
    fn one_empty_side_builds_a_one_sided_record() {
        let record = build(&entries(&[("Loewe", 3)]), &[], "a", "b", &Matcher::default()).unwrap();
        assert_eq!(record.summary().only_a, 1);
        assert_eq!(record.exclusive_rows(Source::A).count(), 1);
        assert_eq!(record.exclusive_rows(Source::B).count(), 0);
    }

    #[test]
    fn duplicate_raw_names_take_the_max_count() {
        let record = build(
            &entries(&[("Gucci", 5), ("Gucci", 8), ("Gucci", 2)]),
            &[],
            "a",
            "b",
            &Matcher::default(),
        )
        .unwrap();
        assert_eq!(record.rows.len(), 1);
        assert_eq!(record.rows[0].count_a, 8);
    }

    #[test]
    fn ties_on_total_sort_case_insensitively() {
        let record = build(
            &entries(&[("bally", 5), ("Alaia", 5), ("Celine", 5)]),
            &[],
            "a",
            "b",
            &Matcher::exact_only(crate::Normalizer::default()),
        )
        .unwrap();
        let names: Vec<&str> = record.rows.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alaia", "bally", "Celine"]);
    }

    #[test]
    fn repeated_builds_order_rows_identically() {
        let a = entries(&[("Loewe", 3), ("Khaite", 3), ("Toteme", 7), ("Ganni", 1)]);
        let b = entries(&[("GANNI", 6), ("Jacquemus", 3)]);
        let matcher = Matcher::default();
        let first = build(&a, &b, "a", "b", &matcher).unwrap();
        let second = build(&a, &b, "a", "b", &matcher).unwrap();
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn json_round_trip_preserves_record() {
        let record = build_at(
            &entries(&[("Gucci", 50), ("Prada Beauty", 10)]),
            &entries(&[("GUCCI", 45), ("Chanel", 5)]),
            "a",
            "b",
            &Matcher::default(),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        )
        .unwrap();
        let value = record.to_json().unwrap();
        assert_eq!(value["rows"][0]["display_name"], "Gucci");
        assert_eq!(value["rows"][0]["raw_name_b"], "GUCCI");
        assert_eq!(value["rows"][1]["raw_name_b"], serde_json::Value::Null);
        assert_eq!(ComparisonRecord::from_json(value).unwrap(), record);
    }

    #[test]
    fn legacy_rows_are_repaired_on_load() {
        let value = json!({
            "created_at": "2024-11-02T09:30:00Z",
            "source_a_identifier": "a",
            "source_b_identifier": "b",
            "rows": [
                { "count_a": 7, "count_b": 2, "raw_name_a": "Jimmy Choo", "raw_name_b": "JIMMY CHOO", "difference": 99 },
                { "count_b": 4, "raw_name_b": "Amina Muaddi" },
                { "display_name": "Aquazzura", "count_a": 1 }
            ]
        });
        let record = ComparisonRecord::from_json(value).unwrap();

        let choo = &record.rows[0];
        assert_eq!(choo.display_name, "Jimmy Choo");
        assert_eq!(choo.difference, 5);
        assert_eq!(choo.canonical_key, "JIMMYCHOO");
        assert_eq!(choo.match_kind, MatchKind::Exact);

        let amina = &record.rows[1];
        assert_eq!(amina.display_name, "Amina Muaddi");
        assert_eq!(amina.count_a, 0);
        assert_eq!(amina.difference, -4);
        assert_eq!(amina.match_kind, MatchKind::OnlyB);

        let aquazzura = &record.rows[2];
        assert_eq!(aquazzura.canonical_key, "AQUAZZURA");
        assert_eq!(record.fuzzy, FuzzyOutcome::Disabled);
    }
}
