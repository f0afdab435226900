//! Extractor contract and the JSON brand-list extractor.
//!
//! Fetching and page parsing happen upstream; an extractor only turns one
//! source's already-fetched content into [`BrandEntry`] values.

use serde_json::Value;
use thiserror::Error;

use crate::BrandEntry;

/// Field names tried, in order, for the brand label of one JSON object.
const BRAND_FIELDS: &[&str] = &["brand", "name", "designer"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to parse {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected brand list shape: {0}")]
    UnexpectedShape(String),

    #[error("invalid count for '{raw_name}': {value}")]
    InvalidCount { raw_name: String, value: String },
}

/// Turns one source's raw content into brand entries.
pub trait BrandExtractor {
    /// # Errors
    ///
    /// Returns [`ExtractError`] when `content` is not in the expected shape.
    fn extract(&self, content: &str) -> Result<Vec<BrandEntry>, ExtractError>;
}

/// Reads a JSON array of objects such as
/// `[{"brand": "Gucci", "count": 50}, {"designer": "Loewe", "count": "12"}]`.
///
/// The brand label is taken from `brand`, `name` or `designer` (first present
/// wins; a non-string value becomes the empty string). `count` may be an
/// integer, an integral float or a numeric string; missing or null means 0.
#[derive(Debug, Clone, Default)]
pub struct JsonBrandListExtractor {
    context: String,
}

impl JsonBrandListExtractor {
    /// `context` names the input in error messages, e.g. a file path.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }
}

impl BrandExtractor for JsonBrandListExtractor {
    fn extract(&self, content: &str) -> Result<Vec<BrandEntry>, ExtractError> {
        let context = if self.context.is_empty() {
            "brand list"
        } else {
            self.context.as_str()
        };

        let value: Value =
            serde_json::from_str(content).map_err(|source| ExtractError::Deserialize {
                context: context.to_string(),
                source,
            })?;

        let Value::Array(items) = value else {
            return Err(ExtractError::UnexpectedShape(format!(
                "{context}: expected a JSON array"
            )));
        };

        let entries = items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_item(item).map_err(|e| locate(e, context, i)))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(context, entries = entries.len(), "extracted brand list");
        Ok(entries)
    }
}

fn parse_item(item: &Value) -> Result<BrandEntry, ExtractError> {
    let Value::Object(map) = item else {
        return Err(ExtractError::UnexpectedShape(
            "expected an object".to_string(),
        ));
    };

    let raw_name = BRAND_FIELDS
        .iter()
        .find_map(|field| map.get(*field))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let count = match map.get("count") {
        None | Some(Value::Null) => 0,
        Some(value) => parse_count(value).ok_or_else(|| ExtractError::InvalidCount {
            raw_name: raw_name.clone(),
            value: value.to_string(),
        })?,
    };

    Ok(BrandEntry { raw_name, count })
}

/// Non-negative integer from a number or numeric string.
#[allow(clippy::cast_possible_truncation)]
fn parse_count(value: &Value) -> Option<i64> {
    let count = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && (0.0..=9.0e15).contains(f))
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().replace(',', "").parse::<i64>().ok(),
        _ => None,
    }?;
    (count >= 0).then_some(count)
}

fn locate(error: ExtractError, context: &str, index: usize) -> ExtractError {
    match error {
        ExtractError::UnexpectedShape(msg) => {
            ExtractError::UnexpectedShape(format!("{context}[{index}]: {msg}"))
        }
        other => other,
    }
}
