//! Entity resolution for fuzzy name matching
//!
//! Predicts whether two artist/title strings refer to the same entity by
//! blending several string-similarity measures. Used by the fuzzy search
//! source to re-score relaxed matches before they reach the scorer.

use crate::scoring::names::normalize_name;
use strsim::{jaro_winkler, normalized_levenshtein, sorensen_dice};

/// Minimum blended score for two strings to count as the same entity
const DEFAULT_MATCH_THRESHOLD: f64 = 0.65;

#[derive(Debug, Clone)]
pub struct EntityResolver {
    match_threshold: f64,
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl EntityResolver {
    pub fn with_threshold(match_threshold: f64) -> Self {
        Self { match_threshold }
    }

    /// Blended similarity in [0.0, 1.0] between two strings.
    ///
    /// Combines edit distance, prefix-weighted similarity and token overlap;
    /// token order is neutralized so "Cole, Nat King" matches "Nat King Cole".
    pub fn predict(&self, a: &str, b: &str) -> f64 {
        let norm_a = normalize_name(a);
        let norm_b = normalize_name(b);
        if norm_a.is_empty() || norm_b.is_empty() {
            return 0.0;
        }
        if norm_a == norm_b {
            return 1.0;
        }

        let sorted_a = sorted_tokens(&norm_a);
        let sorted_b = sorted_tokens(&norm_b);

        let edit = normalized_levenshtein(&norm_a, &norm_b);
        let prefix = jaro_winkler(&norm_a, &norm_b);
        let tokens = sorensen_dice(&sorted_a, &sorted_b);
        let token_edit = normalized_levenshtein(&sorted_a, &sorted_b);

        (0.25 * edit + 0.25 * prefix + 0.25 * tokens + 0.25 * token_edit).clamp(0.0, 1.0)
    }

    /// Whether the blended score clears the match threshold
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        self.predict(a, b) >= self.match_threshold
    }

    /// Best match for a query among candidates, with its score
    pub fn find_best_match<'a>(&self, query: &str, candidates: &'a [String]) -> Option<(&'a str, f64)> {
        candidates
            .iter()
            .map(|c| (c.as_str(), self.predict(query, c)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
