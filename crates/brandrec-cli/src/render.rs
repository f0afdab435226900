//! Text and JSON rendering for command output.

use std::fmt::Write;

use brandrec_core::{
    ChangeKind, ComparisonRecord, FuzzyOutcome, MatchKind, SnapshotMeta, Source, TimeDelta,
};
use clap::ValueEnum;
use serde_json::json;

const NAME_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

/// Render a comparison: summary header followed by one line per brand.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub(crate) fn comparison(record: &ComparisonRecord, format: OutputFormat) -> anyhow::Result<String> {
    let summary = record.summary();
    if format == OutputFormat::Json {
        let value = json!({ "summary": summary, "comparison": record });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut out = String::new();
    writeln!(
        out,
        "Comparison: {} vs {}",
        record.source_a_identifier, record.source_b_identifier
    )?;
    writeln!(out, "Created:    {}", fmt_ts(record.created_at))?;
    writeln!(
        out,
        "Source A:   {} brands, {} products",
        summary.brands_in_a, summary.products_in_a
    )?;
    writeln!(
        out,
        "Source B:   {} brands, {} products",
        summary.brands_in_b, summary.products_in_b
    )?;
    writeln!(
        out,
        "Common: {}  Only A: {}  Only B: {}",
        summary.common, summary.only_a, summary.only_b
    )?;
    match &record.fuzzy {
        FuzzyOutcome::Disabled => {}
        FuzzyOutcome::Applied { merged } => writeln!(out, "Fuzzy matches: {merged}")?,
        FuzzyOutcome::Degraded { reason } => {
            writeln!(out, "Fuzzy matching degraded: {reason}")?;
        }
    }
    writeln!(out)?;

    if record.rows.is_empty() {
        writeln!(out, "no brands in either source")?;
        return Ok(out);
    }

    writeln!(
        out,
        "{:<NAME_WIDTH$}{:>10}{:>10}{:>8}  MATCH",
        "BRAND", "SOURCE A", "SOURCE B", "DIFF"
    )?;
    for row in &record.rows {
        writeln!(
            out,
            "{:<NAME_WIDTH$}{:>10}{:>10}{:>8}  {}",
            truncate(&row.display_name),
            row.count_a,
            row.count_b,
            fmt_signed(row.difference),
            fmt_match(row.match_kind)
        )?;
    }

    Ok(out)
}

/// Render snapshot listings grouped by source pair, keeping the incoming
/// (newest-first) order inside each group.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub(crate) fn snapshot_list(metas: &[SnapshotMeta], format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        let value: Vec<_> = metas
            .iter()
            .map(|m| json!({ "label": m.label(), "snapshot": m }))
            .collect();
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    if metas.is_empty() {
        return Ok("no saved snapshots\n".to_string());
    }

    let mut groups: Vec<(&str, &str, Vec<&SnapshotMeta>)> = Vec::new();
    for meta in metas {
        match groups
            .iter_mut()
            .find(|(a, b, _)| meta.matches_pair(a, b))
        {
            Some((_, _, members)) => members.push(meta),
            None => groups.push((
                meta.source_a_identifier.as_str(),
                meta.source_b_identifier.as_str(),
                vec![meta],
            )),
        }
    }

    let mut out = String::new();
    for (i, (a, b, members)) in groups.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "{a} vs {b}")?;
        writeln!(out, "{:<8}{:<22}LABEL", "ID", "CREATED")?;
        for meta in members {
            writeln!(
                out,
                "{:<8}{:<22}{}",
                meta.id,
                fmt_ts(meta.created_at),
                meta.label()
            )?;
        }
    }

    Ok(out)
}

/// Render a time delta: per-source summaries, then every brand that moved.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub(crate) fn delta(delta: &TimeDelta, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        let value = json!({
            "summary_a": delta.summary(Source::A),
            "summary_b": delta.summary(Source::B),
            "delta": delta,
        });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut out = String::new();
    writeln!(
        out,
        "Changes from {} to {}",
        fmt_ts(delta.earlier_at),
        fmt_ts(delta.later_at)
    )?;
    for side in [Source::A, Source::B] {
        let s = delta.summary(side);
        writeln!(
            out,
            "{side}: {} new, {} dropped, {} increased, {} decreased, net {} products",
            s.new,
            s.dropped,
            s.increased,
            s.decreased,
            fmt_signed(s.net_change)
        )?;
    }
    writeln!(out)?;

    let moved: Vec<_> = delta
        .changes
        .iter()
        .filter(|c| c.kind_a != ChangeKind::Unchanged || c.kind_b != ChangeKind::Unchanged)
        .collect();
    if moved.is_empty() {
        writeln!(out, "no brand-level changes")?;
        return Ok(out);
    }

    writeln!(
        out,
        "{:<NAME_WIDTH$}{:>14}{:>10}{:>14}{:>10}",
        "BRAND", "SOURCE A", "CHANGE", "SOURCE B", "CHANGE"
    )?;
    for change in moved {
        writeln!(
            out,
            "{:<NAME_WIDTH$}{:>14}{:>10}{:>14}{:>10}",
            truncate(&change.display_name),
            format!("{} -> {}", change.count_a_t1, change.count_a_t2),
            fmt_signed(change.change_a),
            format!("{} -> {}", change.count_b_t1, change.count_b_t2),
            fmt_signed(change.change_b),
        )?;
    }

    Ok(out)
}

fn fmt_ts(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn fmt_signed(n: i64) -> String {
    if n > 0 {
        format!("+{n}")
    } else {
        n.to_string()
    }
}

fn fmt_match(kind: MatchKind) -> String {
    match kind {
        MatchKind::Exact => "exact".to_string(),
        MatchKind::Fuzzy { score } => format!("fuzzy ({score:.0})"),
        MatchKind::OnlyA => "only A".to_string(),
        MatchKind::OnlyB => "only B".to_string(),
    }
}

fn truncate(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH - 2 {
        format!("{}...", name.chars().take(NAME_WIDTH - 5).collect::<String>())
    } else {
        name.to_string()
    }
}
