//! Matching configuration: the marketing-qualifier list stripped by the
//! normalizer and the fuzzy-pass settings.
//!
//! Defaults suit luxury fashion and beauty catalogs. Deployments override them
//! with a YAML file:
//!
//! ```yaml
//! qualifiers: [BEAUTY, PARFUMS, "HAIR CARE"]
//! fuzzy_threshold: 92
//! fuzzy_enabled: true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Trailing words retailers append to a house name for a sub-line.
pub const DEFAULT_QUALIFIERS: &[&str] = &[
    "BEAUTY",
    "PARFUMS",
    "PARFUM",
    "COSMETICS",
    "SKINCARE",
    "COUTURE",
    "FRAGRANCES",
];

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub qualifiers: Vec<String>,
    pub fuzzy_threshold: f64,
    pub fuzzy_enabled: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            qualifiers: DEFAULT_QUALIFIERS.iter().map(|q| (*q).to_string()).collect(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fuzzy_enabled: true,
        }
    }
}

/// On-disk shape: every key is optional and falls back to the environment
/// (or built-in default) when omitted.
#[derive(Debug, Default, Deserialize)]
struct MatchConfigFile {
    qualifiers: Option<Vec<String>>,
    fuzzy_threshold: Option<f64>,
    fuzzy_enabled: Option<bool>,
}

impl MatchConfig {
    /// Resolve the match configuration for a run.
    ///
    /// Values from `BRANDREC_MATCH_CONFIG_PATH` win over the env-derived
    /// threshold and toggle; the qualifier list comes from the file or the
    /// built-in default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or the
    /// resolved configuration fails validation.
    pub fn from_app_config(app: &AppConfig) -> Result<Self, ConfigError> {
        let file = match &app.match_config_path {
            Some(path) => read_match_file(path)?,
            None => MatchConfigFile::default(),
        };

        let config = Self {
            qualifiers: file
                .qualifiers
                .unwrap_or_else(|| Self::default().qualifiers),
            fuzzy_threshold: file.fuzzy_threshold.unwrap_or(app.fuzzy_threshold),
            fuzzy_enabled: file.fuzzy_enabled.unwrap_or(app.fuzzy_enabled),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for an out-of-range threshold or a
    /// blank/duplicate qualifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fuzzy_threshold.is_finite() || !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::Validation(format!(
                "fuzzy_threshold {} must be within 0..=100",
                self.fuzzy_threshold
            )));
        }

        let mut seen = HashSet::new();
        for qualifier in &self.qualifiers {
            let canonical = qualifier
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_uppercase();
            if canonical.is_empty() {
                return Err(ConfigError::Validation(
                    "qualifiers must be non-empty".to_string(),
                ));
            }
            if !seen.insert(canonical.clone()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate qualifier: '{canonical}'"
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate a standalone match configuration file, filling omitted
/// keys from [`MatchConfig::default`].
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_match_config(path: &Path) -> Result<MatchConfig, ConfigError> {
    let file = read_match_file(path)?;
    let defaults = MatchConfig::default();
    let config = MatchConfig {
        qualifiers: file.qualifiers.unwrap_or(defaults.qualifiers),
        fuzzy_threshold: file.fuzzy_threshold.unwrap_or(defaults.fuzzy_threshold),
        fuzzy_enabled: file.fuzzy_enabled.unwrap_or(defaults.fuzzy_enabled),
    };
    config.validate()?;
    Ok(config)
}

fn read_match_file(path: &Path) -> Result<MatchConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MatchFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    // An empty document deserializes to `None`; treat it as "all defaults".
    let file: Option<MatchConfigFile> = serde_yaml::from_str(&content)?;
    Ok(file.unwrap_or_default())
}
