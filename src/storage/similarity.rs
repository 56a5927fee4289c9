//! Bag-of-words similarity used for near-duplicate detection
//!
//! Text is lowercased, stripped of everything that is not a letter, digit,
//! underscore or whitespace (letters of any script are kept), and split on
//! whitespace into a token set. Two texts are compared with the Jaccard
//! index of their token sets.

use std::collections::HashSet;

/// Normalize text for comparison.
///
/// Punctuation is removed rather than replaced, so `"U.S."` becomes `"us"`.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split normalized text into a set of tokens.
pub fn tokenize(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

/// Jaccard index `|a ∩ b| / |a ∪ b|`.
///
/// Returns 0.0 when the union is empty.
pub fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Similarity of two already-normalized strings.
pub fn score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaccard(&tokenize(a), &tokenize(b))
}

/// Normalize both inputs, then score them.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    score(&normalize_text(a), &normalize_text(b))
}

/// First `max_chars` characters of `text`.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_text("  Hello, World!  "), "hello world");
        assert_eq!(normalize_text("U.S. markets"), "us markets");
        assert_eq!(normalize_text("snake_case stays"), "snake_case stays");
    }

    #[test]
    fn test_normalize_keeps_other_scripts() {
        assert_eq!(normalize_text("خبر عاجل!"), "خبر عاجل");
        assert_eq!(normalize_text("경제 뉴스."), "경제 뉴스");
        assert_eq!(normalize_text("Ünïcödé Straße"), "ünïcödé straße");
    }

    #[test]
    fn test_score_identical() {
        assert_eq!(text_similarity("Market rally", "market rally!"), 1.0);
    }

    #[test]
    fn test_score_empty_is_zero() {
        assert_eq!(text_similarity("", ""), 0.0);
        assert_eq!(text_similarity("something", ""), 0.0);
        assert_eq!(text_similarity("", "something"), 0.0);
        assert_eq!(text_similarity("!!!", "???"), 0.0);
    }

    #[test]
    fn test_score_partial_overlap() {
        // {x, wins, award} vs {x, wins, award, today}
        let s = text_similarity("X wins award", "X wins award today");
        assert!((s - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duplicate_tokens_collapse() {
        assert_eq!(text_similarity("news news news", "news"), 1.0);
    }

    #[test]
    fn test_prefix_chars_respects_char_boundaries() {
        assert_eq!(prefix_chars("abcdef", 3), "abc");
        assert_eq!(prefix_chars("ab", 10), "ab");
        assert_eq!(prefix_chars("خبرعاجل", 3), "خبر");
        assert_eq!(prefix_chars("", 3), "");
    }
}
