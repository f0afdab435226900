//! Brand-list reconciliation for two-retailer catalog comparisons.
//!
//! The pipeline is `normalize` -> `reconcile` -> `comparison::build`, with
//! optional persistence through a [`SnapshotStore`] and historical diffs via
//! [`delta::compute_delta`]. Everything except the store contract is pure and
//! synchronous.

pub mod app_config;
pub mod comparison;
pub mod config;
pub mod delta;
pub mod extract;
pub mod match_config;
pub mod normalize;
pub mod reconcile;
pub mod similarity;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use comparison::{build, build_at, ComparisonRecord, ComparisonSummary};
pub use config::{load_app_config, load_app_config_from_env};
pub use delta::{chronological, compute_delta, BrandChange, ChangeKind, ChangeSummary, TimeDelta};
pub use extract::{BrandExtractor, ExtractError, JsonBrandListExtractor};
pub use match_config::{load_match_config, MatchConfig, DEFAULT_QUALIFIERS};
pub use normalize::{normalize, Normalizer};
pub use reconcile::{reconcile, FuzzyOutcome, JoinedRow, MatchKind, Matcher, Reconciliation};
pub use similarity::{CompositeScorer, SimilarityScorer};
pub use store::{MemorySnapshotStore, SnapshotId, SnapshotMeta, SnapshotStore, StoreError};

/// One `(brand, product count)` pair as produced by an extractor for a single
/// source. Carries no identity beyond its position in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    pub raw_name: String,
    pub count: i64,
}

impl BrandEntry {
    pub fn new(raw_name: impl Into<String>, count: i64) -> Self {
        Self {
            raw_name: raw_name.into(),
            count,
        }
    }
}

/// Which side of a comparison a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    A,
    B,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::A => write!(f, "source A"),
            Source::B => write!(f, "source B"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read match config {path}: {source}")]
    MatchFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse match config: {0}")]
    MatchFileParse(#[from] serde_yaml::Error),

    #[error("invalid match config: {0}")]
    Validation(String),
}

/// Input rejected by [`comparison::build`] before any reconciliation happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{side} entry '{raw_name}' has negative count {count}")]
    NegativeCount {
        side: Source,
        raw_name: String,
        count: i64,
    },
}
