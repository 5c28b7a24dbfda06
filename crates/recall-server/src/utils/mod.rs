//! crates/recall-server/src/utils/mod.rs
//! Shared utility functions used across the engine

pub mod json;

use std::collections::HashSet;

/// Truncate a string to `max_chars` characters with an ellipsis.
///
/// Counts characters, not bytes: queries are routinely CJK text and a byte
/// cut would split a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

/// Lowercased keyword bag: alphanumeric runs plus individual CJK characters.
///
/// CJK text carries no whitespace between words, so each ideograph counts as
/// its own token. Good enough for overlap scoring; never used for backend
/// keyword extraction (that comes from the analyzer's concept list).
pub fn keyword_bag(text: &str) -> HashSet<String> {
    let mut bag = HashSet::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if is_cjk(ch) {
                if !current.is_empty() {
                    bag.insert(std::mem::take(&mut current));
                }
                bag.insert(ch.to_string());
            } else {
                current.extend(ch.to_lowercase());
            }
        } else if !current.is_empty() {
            bag.insert(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        bag.insert(current);
    }
    bag
}

/// Jaccard similarity between two keyword bags.
///
/// Two empty bags are identical, so the result is 1.0; this keeps
/// `similarity(x, x) == 1` for degenerate inputs.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Jaccard similarity of the keyword bags of two texts
pub fn text_jaccard(a: &str, b: &str) -> f64 {
    jaccard(&keyword_bag(a), &keyword_bag(b))
}

/// Clamp a score into [0,1]; NaN collapses to 0
pub fn clamp_score(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn is_cjk(ch: char) -> bool {
    matches!(ch as u32,
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF)
}
