//! Shared text-similarity primitive, used by both rule evaluation and
//! normalization suggestions.

/// Lowercase, trim, and collapse internal whitespace runs to single spaces.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized similarity ratio in [0,1] between the normalized forms of two
/// strings. Two blank strings are identical (1.0); blank vs. non-blank is 0.0.
pub fn text_ratio(a: &str, b: &str) -> f64 {
    let na = normalize_text(a);
    let nb = normalize_text(b);
    strsim::normalized_levenshtein(&na, &nb)
}
