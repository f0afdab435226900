//! Two-pass join of two brand lists on their canonical keys.
//!
//! Pass one is an exact outer join on the normalized key. Pass two (optional)
//! pairs the leftover one-sided rows by raw-name similarity. A row settled by
//! the exact pass is never reopened by the fuzzy pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::match_config::MatchConfig;
use crate::normalize::{normalize, Normalizer};
use crate::similarity::{CompositeScorer, SimilarityScorer};
use crate::BrandEntry;

/// How a [`JoinedRow`] came to hold its raw names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// Both sides normalized to the same key.
    Exact,
    /// Two one-sided rows merged by the fuzzy pass.
    Fuzzy { score: f64 },
    OnlyA,
    OnlyB,
}

/// One reconciled brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "crate::comparison::StoredRow")]
pub struct JoinedRow {
    pub display_name: String,
    pub canonical_key: String,
    pub count_a: i64,
    pub count_b: i64,
    pub difference: i64,
    pub raw_name_a: Option<String>,
    pub raw_name_b: Option<String>,
    pub match_kind: MatchKind,
}

impl JoinedRow {
    /// Assemble a row, deriving `display_name` and `difference`.
    #[must_use]
    pub fn new(
        canonical_key: String,
        raw_name_a: Option<String>,
        raw_name_b: Option<String>,
        count_a: i64,
        count_b: i64,
        match_kind: MatchKind,
    ) -> Self {
        let display_name = display_name_for(
            &canonical_key,
            raw_name_a.as_deref(),
            raw_name_b.as_deref(),
            count_a,
            count_b,
        );
        Self {
            display_name,
            canonical_key,
            count_a,
            count_b,
            difference: count_a.saturating_sub(count_b),
            raw_name_a,
            raw_name_b,
            match_kind,
        }
    }

    #[must_use]
    pub fn total(&self) -> i64 {
        self.count_a.saturating_add(self.count_b)
    }

    #[must_use]
    pub fn is_common(&self) -> bool {
        self.count_a > 0 && self.count_b > 0
    }
}

/// Pick the label shown for a row.
///
/// Prefers the raw name of a side that actually lists the brand (source A
/// first), then any raw name, then the key. Never returns an empty string.
pub(crate) fn display_name_for(
    canonical_key: &str,
    raw_name_a: Option<&str>,
    raw_name_b: Option<&str>,
    count_a: i64,
    count_b: i64,
) -> String {
    fn usable(name: Option<&str>) -> Option<&str> {
        name.filter(|n| !n.trim().is_empty())
    }

    let chosen = if count_a > 0 && usable(raw_name_a).is_some() {
        usable(raw_name_a)
    } else if count_b > 0 && usable(raw_name_b).is_some() {
        usable(raw_name_b)
    } else {
        usable(raw_name_a).or(usable(raw_name_b))
    };

    match chosen {
        Some(name) => name.to_string(),
        None if !canonical_key.is_empty() => canonical_key.to_string(),
        None => "Unknown".to_string(),
    }
}

/// What the fuzzy pass did for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FuzzyOutcome {
    #[default]
    Disabled,
    Applied { merged: usize },
    /// The scorer misbehaved; output is exact-match only.
    Degraded { reason: String },
}

impl FuzzyOutcome {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, FuzzyOutcome::Degraded { .. })
    }
}

/// Rows produced by [`reconcile`], in no particular order.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub rows: Vec<JoinedRow>,
    pub fuzzy: FuzzyOutcome,
}

/// Everything a reconciliation run needs besides the two lists.
pub struct Matcher {
    normalizer: Normalizer,
    scorer: Option<Box<dyn SimilarityScorer>>,
    threshold: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::from_config(&MatchConfig::default())
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("normalizer", &self.normalizer)
            .field("fuzzy", &self.scorer.is_some())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl Matcher {
    /// Build a matcher with the composite scorer when fuzzy matching is on.
    #[must_use]
    pub fn from_config(config: &MatchConfig) -> Self {
        let scorer: Option<Box<dyn SimilarityScorer>> = if config.fuzzy_enabled {
            Some(Box::new(CompositeScorer))
        } else {
            None
        };
        Self {
            normalizer: Normalizer::new(&config.qualifiers),
            scorer,
            threshold: config.fuzzy_threshold,
        }
    }

    /// Exact-match only.
    #[must_use]
    pub fn exact_only(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            scorer: None,
            threshold: 100.0,
        }
    }

    /// Swap in a different similarity capability.
    #[must_use]
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>, threshold: f64) -> Self {
        self.scorer = Some(scorer);
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    #[must_use]
    pub fn key(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }
}

/// All entries of one side that share a canonical key.
struct KeyGroup {
    key: String,
    raw_name: String,
    count: i64,
    best_count: i64,
}

/// Group one side by canonical key, summing counts. The raw name of the
/// largest contributing entry represents the group. First-seen order is kept.
fn group_by_key(entries: &[BrandEntry], matcher: &Matcher) -> Vec<KeyGroup> {
    let mut groups: Vec<KeyGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let key = matcher.key(&entry.raw_name);
        if let Some(&at) = index.get(&key) {
            let group = &mut groups[at];
            group.count = group.count.saturating_add(entry.count);
            if entry.count > group.best_count {
                group.best_count = entry.count;
                group.raw_name.clone_from(&entry.raw_name);
            }
        } else {
            index.insert(key.clone(), groups.len());
            groups.push(KeyGroup {
                key,
                raw_name: entry.raw_name.clone(),
                count: entry.count,
                best_count: entry.count,
            });
        }
    }

    groups
}

/// Join `entries_a` and `entries_b`.
///
/// Never fails: a misbehaving scorer downgrades the run to exact matching and
/// is reported through [`Reconciliation::fuzzy`]. Rows whose counts are both
/// zero are dropped.
#[must_use]
pub fn reconcile(
    entries_a: &[BrandEntry],
    entries_b: &[BrandEntry],
    matcher: &Matcher,
) -> Reconciliation {
    let groups_a = group_by_key(entries_a, matcher);
    let groups_b = group_by_key(entries_b, matcher);

    let mut rows = exact_pass(groups_a, groups_b);
    let exact_matches = rows
        .iter()
        .filter(|r| r.match_kind == MatchKind::Exact)
        .count();

    let fuzzy = match &matcher.scorer {
        None => FuzzyOutcome::Disabled,
        Some(scorer) => match fuzzy_pass(&rows, scorer.as_ref(), matcher.threshold) {
            Ok(pairs) => {
                let merged = pairs.len();
                rows = merge_pairs(rows, &pairs);
                FuzzyOutcome::Applied { merged }
            }
            Err(reason) => {
                tracing::warn!(%reason, "fuzzy pass abandoned; falling back to exact matches");
                FuzzyOutcome::Degraded { reason }
            }
        },
    };

    let before_drop = rows.len();
    rows.retain(|r| r.count_a != 0 || r.count_b != 0);

    tracing::debug!(
        entries_a = entries_a.len(),
        entries_b = entries_b.len(),
        exact_matches,
        rows = rows.len(),
        dropped_empty = before_drop - rows.len(),
        fuzzy = ?fuzzy,
        "reconciled brand lists"
    );

    Reconciliation { rows, fuzzy }
}

fn exact_pass(groups_a: Vec<KeyGroup>, groups_b: Vec<KeyGroup>) -> Vec<JoinedRow> {
    let mut b_by_key: HashMap<String, KeyGroup> = HashMap::with_capacity(groups_b.len());
    let mut b_order: Vec<String> = Vec::with_capacity(groups_b.len());
    for group in groups_b {
        b_order.push(group.key.clone());
        b_by_key.insert(group.key.clone(), group);
    }

    let mut rows = Vec::with_capacity(groups_a.len() + b_order.len());

    for a in groups_a {
        match b_by_key.remove(&a.key) {
            Some(b) => rows.push(JoinedRow::new(
                a.key,
                Some(a.raw_name),
                Some(b.raw_name),
                a.count,
                b.count,
                MatchKind::Exact,
            )),
            None => rows.push(JoinedRow::new(
                a.key,
                Some(a.raw_name),
                None,
                a.count,
                0,
                MatchKind::OnlyA,
            )),
        }
    }

    for key in b_order {
        if let Some(b) = b_by_key.remove(&key) {
            rows.push(JoinedRow::new(
                b.key,
                None,
                Some(b.raw_name),
                0,
                b.count,
                MatchKind::OnlyB,
            ));
        }
    }

    rows
}

/// A fuzzy pairing: indexes into the row list plus the score.
#[derive(Debug, Clone, Copy)]
struct FuzzyPair {
    a: usize,
    b: usize,
    score: f64,
}

/// Score every one-sided A row against every one-sided B row and assign
/// pairs greedily, best score first. Each row is used at most once.
///
/// Rows with an empty key or a zero count never take part.
fn fuzzy_pass(
    rows: &[JoinedRow],
    scorer: &dyn SimilarityScorer,
    threshold: f64,
) -> Result<Vec<FuzzyPair>, String> {
    let eligible = |r: &JoinedRow, kind: MatchKind| {
        r.match_kind == kind && !r.canonical_key.is_empty() && r.total() > 0
    };

    let only_a: Vec<usize> = (0..rows.len())
        .filter(|&i| eligible(&rows[i], MatchKind::OnlyA))
        .collect();
    let only_b: Vec<usize> = (0..rows.len())
        .filter(|&i| eligible(&rows[i], MatchKind::OnlyB))
        .collect();

    let mut candidates = Vec::new();
    for &a in &only_a {
        let name_a = rows[a].raw_name_a.as_deref().unwrap_or_default();
        for &b in &only_b {
            let name_b = rows[b].raw_name_b.as_deref().unwrap_or_default();
            let score = scorer.score(name_a, name_b);
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                return Err(format!(
                    "scorer returned {score} for '{name_a}' / '{name_b}'"
                ));
            }
            if score >= threshold {
                candidates.push(FuzzyPair { a, b, score });
            }
        }
    }

    candidates.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then(x.a.cmp(&y.a))
            .then(x.b.cmp(&y.b))
    });

    let mut used_a = vec![false; rows.len()];
    let mut used_b = vec![false; rows.len()];
    let mut pairs = Vec::new();
    for pair in candidates {
        if used_a[pair.a] || used_b[pair.b] {
            continue;
        }
        used_a[pair.a] = true;
        used_b[pair.b] = true;
        tracing::debug!(
            a = rows[pair.a].raw_name_a.as_deref().unwrap_or_default(),
            b = rows[pair.b].raw_name_b.as_deref().unwrap_or_default(),
            score = pair.score,
            "fuzzy match"
        );
        pairs.push(pair);
    }

    Ok(pairs)
}

/// Fold each B row of a pair into its A row; the A row keeps its key.
fn merge_pairs(rows: Vec<JoinedRow>, pairs: &[FuzzyPair]) -> Vec<JoinedRow> {
    let mut partner: HashMap<usize, FuzzyPair> = HashMap::with_capacity(pairs.len());
    let mut absorbed = vec![false; rows.len()];
    for pair in pairs {
        partner.insert(pair.a, *pair);
        absorbed[pair.b] = true;
    }

    let snapshot: Vec<(Option<String>, i64)> = rows
        .iter()
        .map(|r| (r.raw_name_b.clone(), r.count_b))
        .collect();

    rows.into_iter()
        .enumerate()
        .filter(|(i, _)| !absorbed[*i])
        .map(|(i, row)| match partner.get(&i) {
            Some(pair) => {
                let (raw_name_b, count_b) = snapshot[pair.b].clone();
                JoinedRow::new(
                    row.canonical_key,
                    row.raw_name_a,
                    raw_name_b,
                    row.count_a,
                    count_b,
                    MatchKind::Fuzzy { score: pair.score },
                )
            }
            None => row,
        })
        .collect()
}

/// Canonical key for a row restored from storage without one.
pub(crate) fn fallback_key(display_name: &str) -> String {
    normalize(display_name)
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
