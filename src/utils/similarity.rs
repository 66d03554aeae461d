//! Normalized string similarity scoring.
//!
//! All country-matching decisions are threshold/argmax based, so the score
//! must be the classic Levenshtein distance normalized by the longer string,
//! nothing cleverer.

use strsim::levenshtein;

/// Case-insensitive similarity between two strings in `[0.0, 1.0]`.
///
/// Defined as `(max_len - levenshtein(a, b)) / max_len` over lowercased
/// input. Two empty strings compare as identical (`1.0`).
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    (max_len - levenshtein(&a, &b)) as f64 / max_len as f64
}
