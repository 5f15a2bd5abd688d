//! Name normalization and similarity
//!
//! Credit names arrive from different sources with inconsistent quoting,
//! punctuation and casing ("Nat King Cole" vs "Nat 'King' Cole"). Grouping
//! and fuzzy matching both work on the normalized form.

use strsim::normalized_levenshtein;

/// Normalize a name for comparison: lowercase, strip punctuation that does
/// not affect pronunciation, collapse whitespace.
///
/// Idempotent: `normalize_name(normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_space = true;

    for c in name.chars() {
        if matches!(
            c,
            '\'' | '"' | ',' | '.' | ':' | ';' | '!' | '?' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            continue;
        }
        if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
            continue;
        }
        for lower in c.to_lowercase() {
            result.push(lower);
        }
        last_was_space = false;
    }

    // Drop a trailing separator left by terminal whitespace
    if result.ends_with(' ') {
        result.pop();
    }
    result
}

/// Similarity between two names in [0.0, 1.0].
///
/// Exact match after normalization scores 1.0, substring containment 0.9,
/// anything else falls back to a normalized edit-distance ratio.
pub fn name_similarity(name1: &str, name2: &str) -> f64 {
    let norm1 = normalize_name(name1);
    let norm2 = normalize_name(name2);

    if norm1 == norm2 {
        return 1.0;
    }
    if !norm1.is_empty() && !norm2.is_empty() && (norm2.contains(&norm1) || norm1.contains(&norm2))
    {
        return 0.9;
    }
    normalized_levenshtein(&norm1, &norm2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_quotes_and_collapses_whitespace() {
        assert_eq!(normalize_name("Nat 'King' Cole"), "nat king cole");
        assert_eq!(normalize_name("  COLE,   Nat  "), "cole nat");
        assert_eq!(normalize_name("J.S. Bach"), "js bach");
    }

    #[test]
    fn normalization_is_idempotent() {
        for name in ["Nat 'King' Cole", "  A.B.  \"C\"  ", "plain name"] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[test]
    fn quoted_variant_scores_exact() {
        assert_eq!(name_similarity("Nat King Cole", "Nat 'King' Cole"), 1.0);
    }

    #[test]
    fn containment_scores_point_nine() {
        assert_eq!(name_similarity("Nat Cole", "Nat Cole Trio"), 0.9);
    }

    #[test]
    fn fuzzy_fallback_stays_in_range() {
        let sim = name_similarity("Irving Berlin", "Irving Burlin");
        assert!(sim > 0.7 && sim < 1.0);
        let far = name_similarity("Irving Berlin", "Duke Ellington");
        assert!((0.0..1.0).contains(&far));
    }
}
