use std::collections::HashMap;

use brandrec_core::{build, normalize, BrandEntry, Matcher, Normalizer};
use proptest::prelude::*;

const NAMES: &[&str] = &[
    "Gucci",
    "GUCCI",
    "Gucci Beauty",
    "Dior",
    "dior",
    "Dior Parfums",
    "Prada",
    "Chanel",
    "Loewe",
    "L'Oréal",
    "LOREAL",
    "Balenciaga",
    "Balenciagaa",
    "Dolce & Gabbana",
    "™",
    "",
];

fn entries() -> impl Strategy<Value = Vec<BrandEntry>> {
    prop::collection::vec(
        (prop::sample::select(NAMES), 0i64..200).prop_map(|(name, count)| BrandEntry::new(name, count)),
        0..12,
    )
}

fn name_with_qualifier() -> impl Strategy<Value = String> {
    (
        "[A-Za-z0-9 &'.\\-éÉèüöÖñç]{0,40}",
        prop::sample::select(vec!["", " Beauty", " Parfums", " COSMETICS", " beauty beauty"]),
    )
        .prop_map(|(stem, suffix)| format!("{stem}{suffix}"))
}

/// Arbitrary printable Unicode, optionally followed by a qualifier.
fn any_name() -> impl Strategy<Value = String> {
    (
        "\\PC{0,40}",
        prop::sample::select(vec!["", " Beauty", " Parfums"]),
    )
        .prop_map(|(stem, suffix)| format!("{stem}{suffix}"))
}

/// Sum of counts after collapsing identical raw names to their max.
fn expected_products(entries: &[BrandEntry]) -> i64 {
    let mut by_name: HashMap<&str, i64> = HashMap::new();
    for e in entries {
        let slot = by_name.entry(e.raw_name.as_str()).or_insert(0);
        *slot = (*slot).max(e.count);
    }
    by_name.values().sum()
}

/// Per-key totals after the same max-merge, keeping only positive totals.
fn expected_keys(entries: &[BrandEntry]) -> HashMap<String, i64> {
    let mut by_name: HashMap<&str, i64> = HashMap::new();
    for e in entries {
        let slot = by_name.entry(e.raw_name.as_str()).or_insert(0);
        *slot = (*slot).max(e.count);
    }
    let mut by_key: HashMap<String, i64> = HashMap::new();
    for (name, count) in by_name {
        *by_key.entry(normalize(name)).or_insert(0) += count;
    }
    by_key.retain(|_, total| *total > 0);
    by_key
}

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in any_name()) {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once.clone(), "raw: {:?}", raw);
    }

    #[test]
    fn keys_are_uppercase_alphanumeric(raw in name_with_qualifier()) {
        let key = normalize(&raw);
        prop_assert!(key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()), "key: {:?}", key);
    }

    #[test]
    fn summary_partitions_brands(a in entries(), b in entries()) {
        let record = build(&a, &b, "a", "b", &Matcher::default()).unwrap();
        let summary = record.summary();
        prop_assert_eq!(summary.brands_in_a, summary.common + summary.only_a);
        prop_assert_eq!(summary.brands_in_b, summary.common + summary.only_b);
        prop_assert_eq!(summary.products_in_a, expected_products(&a));
        prop_assert_eq!(summary.products_in_b, expected_products(&b));
    }

    #[test]
    fn difference_matches_counts(a in entries(), b in entries()) {
        let record = build(&a, &b, "a", "b", &Matcher::default()).unwrap();
        for row in &record.rows {
            prop_assert_eq!(row.difference, row.count_a - row.count_b);
            prop_assert!(row.count_a > 0 || row.count_b > 0);
            prop_assert!(!row.display_name.is_empty());
        }
    }

    #[test]
    fn every_key_lands_in_exactly_one_row(a in entries(), b in entries()) {
        let matcher = Matcher::exact_only(Normalizer::default());
        let record = build(&a, &b, "a", "b", &matcher).unwrap();

        let keys_a = expected_keys(&a);
        let keys_b = expected_keys(&b);

        for (key, total) in &keys_a {
            let rows: Vec<_> = record.rows.iter().filter(|r| &r.canonical_key == key).collect();
            prop_assert_eq!(rows.len(), 1, "key {:?}", key);
            prop_assert_eq!(rows[0].count_a, *total);
        }
        for (key, total) in &keys_b {
            let rows: Vec<_> = record.rows.iter().filter(|r| &r.canonical_key == key).collect();
            prop_assert_eq!(rows.len(), 1, "key {:?}", key);
            prop_assert_eq!(rows[0].count_b, *total);
        }

        let mut all: Vec<&String> = keys_a.keys().chain(keys_b.keys()).collect();
        all.sort();
        all.dedup();
        prop_assert_eq!(record.rows.len(), all.len());
    }

    #[test]
    fn ordering_is_stable_and_descending(a in entries(), b in entries()) {
        let matcher = Matcher::default();
        let first = build(&a, &b, "a", "b", &matcher).unwrap();
        let second = build(&a, &b, "a", "b", &matcher).unwrap();
        prop_assert_eq!(&first.rows, &second.rows);
        for pair in first.rows.windows(2) {
            prop_assert!(pair[0].total() >= pair[1].total());
        }
    }
}
