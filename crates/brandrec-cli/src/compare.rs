//! `compare` command: read two extracted brand lists and reconcile them.

use std::path::{Path, PathBuf};

use anyhow::Context;
use brandrec_core::{
    build, AppConfig, BrandEntry, BrandExtractor, ComparisonRecord, JsonBrandListExtractor,
    MatchConfig, Matcher,
};

#[derive(Debug, Clone)]
pub(crate) struct CompareArgs {
    pub source_a: PathBuf,
    pub source_b: PathBuf,
    pub id_a: Option<String>,
    pub id_b: Option<String>,
    pub no_fuzzy: bool,
}

/// Build a comparison record from the two files named in `args`.
///
/// Matching options come from `config` and, when configured, the YAML match
/// file; `--no-fuzzy` overrides both.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, the match
/// configuration is invalid, or a count is negative.
pub(crate) fn run_compare(config: &AppConfig, args: &CompareArgs) -> anyhow::Result<ComparisonRecord> {
    let mut match_config =
        MatchConfig::from_app_config(config).context("invalid match configuration")?;
    if args.no_fuzzy {
        match_config.fuzzy_enabled = false;
    }
    let matcher = Matcher::from_config(&match_config);

    let entries_a = read_brand_list(&args.source_a)?;
    let entries_b = read_brand_list(&args.source_b)?;

    let id_a = args
        .id_a
        .clone()
        .unwrap_or_else(|| args.source_a.display().to_string());
    let id_b = args
        .id_b
        .clone()
        .unwrap_or_else(|| args.source_b.display().to_string());

    let record = build(&entries_a, &entries_b, &id_a, &id_b, &matcher)?;

    if let brandrec_core::FuzzyOutcome::Degraded { reason } = &record.fuzzy {
        eprintln!("warning: fuzzy matching disabled for this run: {reason}");
    }

    tracing::info!(
        source_a = %id_a,
        source_b = %id_b,
        entries_a = entries_a.len(),
        entries_b = entries_b.len(),
        rows = record.rows.len(),
        "comparison built"
    );

    Ok(record)
}

fn read_brand_list(path: &Path) -> anyhow::Result<Vec<BrandEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read brand list {}", path.display()))?;
    let entries = JsonBrandListExtractor::new(path.display().to_string()).extract(&content)?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use brandrec_core::{Environment, MatchKind};

    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            database_url: None,
            env: Environment::Test,
            log_level: "info".to_string(),
            match_config_path: None,
            fuzzy_enabled: true,
            fuzzy_threshold: 90.0,
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
        }
    }

    fn brand_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn args(a: &tempfile::NamedTempFile, b: &tempfile::NamedTempFile) -> CompareArgs {
        CompareArgs {
            source_a: a.path().to_path_buf(),
            source_b: b.path().to_path_buf(),
            id_a: Some("level".to_string()),
            id_b: None,
            no_fuzzy: false,
        }
    }

    #[test]
    fn compares_two_files() {
        let a = brand_file(r#"[{"brand": "Gucci", "count": 50}, {"brand": "Prada Beauty", "count": 10}]"#);
        let b = brand_file(r#"[{"brand": "GUCCI", "count": 45}, {"designer": "Chanel", "count": 5}]"#);

        let record = run_compare(&config(), &args(&a, &b)).unwrap();
        assert_eq!(record.rows.len(), 3);
        assert_eq!(record.source_a_identifier, "level");
        assert_eq!(record.source_b_identifier, b.path().display().to_string());
        assert_eq!(record.summary().common, 1);
    }

    #[test]
    fn no_fuzzy_flag_keeps_typos_apart() {
        let a = brand_file(r#"[{"brand": "Balenciaga", "count": 12}]"#);
        let b = brand_file(r#"[{"brand": "Balenciagaa", "count": 7}]"#);

        let fuzzy = run_compare(&config(), &args(&a, &b)).unwrap();
        assert!(matches!(fuzzy.rows[0].match_kind, MatchKind::Fuzzy { .. }));

        let exact = run_compare(
            &config(),
            &CompareArgs {
                no_fuzzy: true,
                ..args(&a, &b)
            },
        )
        .unwrap();
        assert_eq!(exact.rows.len(), 2);
    }

    #[test]
    fn negative_count_is_an_error() {
        let a = brand_file(r#"[{"brand": "Gucci", "count": 5}]"#);
        let b = brand_file(r#"[{"brand": "Dior", "count": -1}]"#);
        assert!(run_compare(&config(), &args(&a, &b)).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let b = brand_file("[]");
        let err = run_compare(
            &config(),
            &CompareArgs {
                source_a: PathBuf::from("/nonexistent/brands-a.json"),
                ..args(&b, &b)
            },
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("brands-a.json"));
    }
}
