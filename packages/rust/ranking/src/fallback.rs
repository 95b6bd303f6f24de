//! Deterministic lexical-overlap relevance score.
//!
//! Used for the whole batch whenever the external ranking service cannot be
//! used. Each distinct query term contributes `1 - 0.5 / tf` when it occurs
//! `tf > 0` times in the content (0.5 for one hit, approaching 1.0 with
//! repetition) and nothing when absent; the sum is divided by the number of
//! distinct query terms. The result is total and always lies in `[0, 1]`.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Lexical relevance of `content` to `query`, rounded to 4 decimals.
///
/// Returns 0.0 for empty content or a query without word characters.
pub fn score_fallback(query: &str, content: &str) -> f64 {
    let mut seen = HashSet::new();
    let terms: Vec<String> = tokenize(query)
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if terms.is_empty() || content.trim().is_empty() {
        return 0.0;
    }

    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for token in tokenize(content) {
        *frequencies.entry(token).or_default() += 1;
    }

    let total: f64 = terms
        .iter()
        .map(|term| match frequencies.get(term) {
            Some(&tf) if tf > 0 => 1.0 - 0.5 / tf as f64,
            _ => 0.0,
        })
        .sum();

    round_score(total / terms.len() as f64)
}

/// Clamp into `[0, 1]` and round to 4 decimal places.
pub fn round_score(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    (score.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

/// Lowercased runs of letters and digits.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"));

    WORD_RE.find_iter(text).map(|m| m.as_str().to_lowercase())
}
