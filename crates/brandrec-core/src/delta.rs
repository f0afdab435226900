//! Brand-level changes between two snapshots of the same source pair.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::comparison::ComparisonRecord;
use crate::Source;

/// How one source's count for a brand moved between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Absent (zero) earlier, listed later.
    New,
    /// Listed earlier, absent later.
    Dropped,
    Increased,
    Decreased,
    Unchanged,
}

impl ChangeKind {
    #[must_use]
    pub fn classify(earlier: i64, later: i64) -> Self {
        match (earlier > 0, later > 0) {
            (false, true) => ChangeKind::New,
            (true, false) => ChangeKind::Dropped,
            _ if later > earlier => ChangeKind::Increased,
            _ if later < earlier => ChangeKind::Decreased,
            _ => ChangeKind::Unchanged,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::New => "new",
            ChangeKind::Dropped => "dropped",
            ChangeKind::Increased => "increased",
            ChangeKind::Decreased => "decreased",
            ChangeKind::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change record for one display name. Each source is classified on its own,
/// so a brand can be new on A while decreasing on B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandChange {
    pub display_name: String,
    pub count_a_t1: i64,
    pub count_a_t2: i64,
    pub count_b_t1: i64,
    pub count_b_t2: i64,
    pub change_a: i64,
    pub change_b: i64,
    pub kind_a: ChangeKind,
    pub kind_b: ChangeKind,
}

impl BrandChange {
    #[must_use]
    pub fn kind(&self, side: Source) -> ChangeKind {
        match side {
            Source::A => self.kind_a,
            Source::B => self.kind_b,
        }
    }

    #[must_use]
    pub fn change(&self, side: Source) -> i64 {
        match side {
            Source::A => self.change_a,
            Source::B => self.change_b,
        }
    }
}

/// Per-bucket brand counts and net product change for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub new: usize,
    pub dropped: usize,
    pub increased: usize,
    pub decreased: usize,
    pub unchanged: usize,
    pub net_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeDelta {
    pub earlier_at: DateTime<Utc>,
    pub later_at: DateTime<Utc>,
    /// Sorted by display name, case-insensitive.
    pub changes: Vec<BrandChange>,
    pub net_change_a: i64,
    pub net_change_b: i64,
}

impl TimeDelta {
    /// Changes on `side` that fall in `kind`.
    pub fn brands(&self, side: Source, kind: ChangeKind) -> impl Iterator<Item = &BrandChange> {
        self.changes.iter().filter(move |c| c.kind(side) == kind)
    }

    #[must_use]
    pub fn summary(&self, side: Source) -> ChangeSummary {
        let mut summary = ChangeSummary {
            net_change: match side {
                Source::A => self.net_change_a,
                Source::B => self.net_change_b,
            },
            ..ChangeSummary::default()
        };
        for change in &self.changes {
            match change.kind(side) {
                ChangeKind::New => summary.new += 1,
                ChangeKind::Dropped => summary.dropped += 1,
                ChangeKind::Increased => summary.increased += 1,
                ChangeKind::Decreased => summary.decreased += 1,
                ChangeKind::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }
}

/// Order two records oldest first.
///
/// [`compute_delta`] assumes its arguments are already in this order; callers
/// that accept snapshots in arbitrary order go through here first.
#[must_use]
pub fn chronological<'r>(
    first: &'r ComparisonRecord,
    second: &'r ComparisonRecord,
) -> (&'r ComparisonRecord, &'r ComparisonRecord) {
    if second.created_at < first.created_at {
        (second, first)
    } else {
        (first, second)
    }
}

/// Compute brand-level changes from `earlier` to `later`.
///
/// Expects `earlier.created_at <= later.created_at`; reversed arguments yield
/// a delta with inverted signs rather than an error. Rows are joined on
/// display name, and rows sharing a display name within one record are summed.
///
/// The join is exact and case-sensitive. A row's display name follows the
/// side that lists it, so when source A stops listing "Gucci" while source B
/// still lists "GUCCI", the delta shows "Gucci" dropped and "GUCCI" new
/// rather than one changed brand.
#[must_use]
pub fn compute_delta(earlier: &ComparisonRecord, later: &ComparisonRecord) -> TimeDelta {
    if later.created_at < earlier.created_at {
        tracing::debug!(
            earlier_at = %earlier.created_at,
            later_at = %later.created_at,
            "delta arguments are not in chronological order"
        );
    }

    let before = counts_by_name(earlier);
    let after = counts_by_name(later);

    let mut names: Vec<&str> = before.keys().chain(after.keys()).copied().collect();
    names.sort_by_cached_key(|n| (n.to_lowercase(), (*n).to_string()));
    names.dedup();

    let changes: Vec<BrandChange> = names
        .into_iter()
        .map(|name| {
            let (a1, b1) = before.get(name).copied().unwrap_or_default();
            let (a2, b2) = after.get(name).copied().unwrap_or_default();
            BrandChange {
                display_name: name.to_string(),
                count_a_t1: a1,
                count_a_t2: a2,
                count_b_t1: b1,
                count_b_t2: b2,
                change_a: a2.saturating_sub(a1),
                change_b: b2.saturating_sub(b1),
                kind_a: ChangeKind::classify(a1, a2),
                kind_b: ChangeKind::classify(b1, b2),
            }
        })
        .collect();

    let net_change_a = changes.iter().fold(0i64, |acc, c| acc.saturating_add(c.change_a));
    let net_change_b = changes.iter().fold(0i64, |acc, c| acc.saturating_add(c.change_b));

    tracing::debug!(
        brands = changes.len(),
        net_change_a,
        net_change_b,
        "computed snapshot delta"
    );

    TimeDelta {
        earlier_at: earlier.created_at,
        later_at: later.created_at,
        changes,
        net_change_a,
        net_change_b,
    }
}

fn counts_by_name(record: &ComparisonRecord) -> HashMap<&str, (i64, i64)> {
    let mut counts: HashMap<&str, (i64, i64)> = HashMap::with_capacity(record.rows.len());
    for row in &record.rows {
        let entry = counts.entry(row.display_name.as_str()).or_default();
        entry.0 = entry.0.saturating_add(row.count_a);
        entry.1 = entry.1.saturating_add(row.count_b);
    }
    counts
}
