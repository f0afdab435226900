//! String-similarity scoring for the reconciler's fuzzy pass.
//!
//! Scores are on a `0.0..=100.0` scale. The edit-distance primitive comes from
//! `strsim`; this module only composes it into the measures the fuzzy pass
//! needs to tolerate reordered tokens ("Saint Laurent Yves" / "Yves Saint
//! Laurent") and abbreviations ("Bottega" / "Bottega Veneta").

use std::collections::BTreeSet;

/// Anything that can score two raw brand names.
///
/// Implementations must return a finite value within `0.0..=100.0`; anything
/// else makes the reconciler abandon the fuzzy pass for that run.
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

impl<F> SimilarityScorer for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Shorter strings than this skip the substring measure; a two-letter name
/// would otherwise match inside almost anything.
const PARTIAL_MIN_CHARS: usize = 4;

/// Maximum of [`ratio`], [`partial_ratio`], [`token_sort_ratio`] and
/// [`token_set_ratio`] over lowercased, punctuation-free input.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeScorer;

impl SimilarityScorer for CompositeScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a = preprocess(a);
        let b = preprocess(b);
        [
            ratio(&a, &b),
            partial_ratio(&a, &b),
            token_sort_ratio(&a, &b),
            token_set_ratio(&a, &b),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }
}

/// Lowercase, turn every non-alphanumeric into a space, collapse whitespace.
#[must_use]
pub fn preprocess(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized Levenshtein similarity. Empty input scores 0.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best [`ratio`] of the shorter string against every same-length window of
/// the longer one.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let short_len = short.chars().count();
    if short_len < PARTIAL_MIN_CHARS {
        return ratio(a, b);
    }

    let long_chars: Vec<char> = long.chars().collect();
    if long_chars.len() == short_len {
        return ratio(short, long);
    }

    long_chars
        .windows(short_len)
        .map(|window| ratio(short, &window.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

/// [`ratio`] after sorting whitespace tokens.
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Compares the shared token set against each side's full token set, so a
/// name that is a token subset of the other scores 100.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    let common = join(set_a.intersection(&set_b));
    let only_a = join(set_a.difference(&set_b));
    let only_b = join(set_b.difference(&set_a));

    let combined_a = concat(&common, &only_a);
    let combined_b = concat(&common, &only_b);

    [
        ratio(&common, &combined_a),
        ratio(&common, &combined_b),
        ratio(&combined_a, &combined_b),
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<S: AsRef<str>>(tokens: impl Iterator<Item = S>) -> String {
    tokens
        .map(|t| t.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn concat(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ratio_identical_is_100() {
        assert!(approx(ratio("gucci", "gucci"), 100.0));
    }

    #[test]
    fn ratio_empty_is_zero() {
        assert!(approx(ratio("", "gucci"), 0.0));
        assert!(approx(ratio("", ""), 0.0));
    }

    #[test]
    fn ratio_single_typo_scores_high() {
        // One substitution across 13 characters.
        let score = ratio("balenciaga sa", "balenciagi sa");
        assert!(score > 90.0, "score {score}");
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert!(approx(partial_ratio("bottega", "bottega veneta"), 100.0));
    }

    #[test]
    fn partial_ratio_ignores_very_short_needles() {
        assert!(partial_ratio("ab", "fabulous") < 50.0);
    }

    #[test]
    fn token_sort_ratio_ignores_order() {
        assert!(approx(
            token_sort_ratio("laurent saint yves", "yves saint laurent"),
            100.0
        ));
    }

    #[test]
    fn token_set_ratio_subset_scores_100() {
        assert!(approx(token_set_ratio("dior", "dior homme"), 100.0));
    }

    #[test]
    fn token_set_ratio_disjoint_is_plain_ratio() {
        let expected = ratio("chanel", "prada");
        assert!(approx(token_set_ratio("chanel", "prada"), expected));
    }

    #[test]
    fn preprocess_strips_punctuation_and_case() {
        assert_eq!(preprocess("  Dolce & Gabbana!! "), "dolce gabbana");
    }

    #[test]
    fn composite_takes_best_measure() {
        let scorer = CompositeScorer;
        assert!(approx(scorer.score("Yves Saint-Laurent", "SAINT LAURENT YVES"), 100.0));
        assert!(scorer.score("Chanel", "Prada Beauty") < 60.0);
    }

    #[test]
    fn closures_are_scorers() {
        let stub = |_: &str, _: &str| 42.0;
        assert!(approx(stub.score("a", "b"), 42.0));
    }
}
