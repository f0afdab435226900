//! Brand-name normalization into canonical matching keys.
//!
//! The key is what the reconciler joins on, so two spellings of the same
//! house ("Dior Beauty", "DIOR", "dior") must collapse to one string. The
//! pipeline order matters: qualifiers are stripped while word boundaries still
//! exist, before symbols and spaces are squeezed out.

use std::collections::HashSet;
use std::sync::LazyLock;

use unicode_normalization::UnicodeNormalization;

use crate::match_config::DEFAULT_QUALIFIERS;

/// Characters treated as word separators before the final alphanumeric pass.
const SYMBOLS: &[char] = &[
    '-', '\u{2010}', '\u{2013}', '\u{2014}', '&', '.', '\'', '\u{2018}', '\u{2019}', '`', '"',
    '\u{201C}', '\u{201D}', '\u{2122}', '\u{00AE}', '\u{00A9}', '(', ')', '[', ']', '{', '}', '/',
    '\\', ',', '+',
];

static DEFAULT_NORMALIZER: LazyLock<Normalizer> = LazyLock::new(Normalizer::default);

/// Normalize `raw` with the built-in qualifier list.
#[must_use]
pub fn normalize(raw: &str) -> String {
    DEFAULT_NORMALIZER.normalize(raw)
}

/// A normalizer bound to one qualifier list.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Tokenized, uppercased qualifiers, longest (most tokens) first.
    qualifiers: Vec<Vec<String>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_QUALIFIERS.iter().copied())
    }
}

impl Normalizer {
    pub fn new<I, S>(qualifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokenized: Vec<Vec<String>> = qualifiers
            .into_iter()
            .map(|q| {
                q.as_ref()
                    .nfc()
                    .collect::<String>()
                    .to_uppercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|tokens| !tokens.is_empty())
            .collect();

        let mut seen = HashSet::new();
        tokenized.retain(|tokens| seen.insert(tokens.clone()));
        // Stable sort keeps configured order among equal lengths.
        tokenized.sort_by(|a, b| b.len().cmp(&a.len()));

        Self {
            qualifiers: tokenized,
        }
    }

    /// Derive the canonical key for `raw`.
    ///
    /// The result is uppercase and contains only alphanumerics. It is empty
    /// only when `raw` has no alphanumeric content at all.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let composed: String = raw.nfc().collect();
        let upper = composed.to_uppercase();
        let stripped = self.strip_qualifiers(&upper);
        let spaced = replace_symbols(&stripped);
        let key = ascii_alnum(&spaced);

        if key.is_empty() {
            fallback_key(&upper)
        } else {
            key
        }
    }

    /// Remove trailing qualifier tokens until the tail no longer matches.
    fn strip_qualifiers(&self, upper: &str) -> String {
        let mut tokens: Vec<&str> = upper.split_whitespace().collect();

        loop {
            let matched = self.qualifiers.iter().find(|q| {
                tokens.len() >= q.len()
                    && tokens[tokens.len() - q.len()..]
                        .iter()
                        .zip(q.iter())
                        .all(|(token, word)| *token == word.as_str())
            });
            match matched {
                Some(q) => tokens.truncate(tokens.len() - q.len()),
                None => break,
            }
        }

        tokens.join(" ")
    }
}

fn replace_symbols(s: &str) -> String {
    s.chars()
        .map(|c| if SYMBOLS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decompose, drop everything outside ASCII, keep alphanumerics.
///
/// Uppercases again because compatibility decomposition can surface lowercase
/// letters (`ª` decomposes to `a`).
fn ascii_alnum(s: &str) -> String {
    s.nfkd()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Key for names that the full pipeline reduced to nothing, e.g. a bare
/// qualifier ("Beauty") or a purely non-Latin name.
///
/// Only alphanumerics of the original survive, so symbols that decompose to
/// letters (`™`) never produce a key here. Unicode letters are kept, in NFC,
/// only when nothing folds to ASCII.
fn fallback_key(upper: &str) -> String {
    let alnum: String = upper.chars().filter(|c| c.is_alphanumeric()).collect();
    let folded = ascii_alnum(&alnum);
    if !folded.is_empty() {
        return folded;
    }
    alnum.nfc().collect()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
