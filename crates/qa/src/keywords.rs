//! Keyword extraction.
//!
//! The same keyword list drives the sparse search and the sentence scoring
//! in the context builder.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Tokens shorter than this (in characters) are dropped.
pub const MIN_KEYWORD_CHARS: usize = 3;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s]").unwrap();
    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "an", "the", "is", "are", "was", "were", "what", "which", "who", "when", "where",
        "how", "can", "could", "would", "should", "will", "do", "does", "did", "have", "has",
        "had", "be", "been", "am", "or", "and", "but", "if", "then", "than", "for", "with",
    ]
    .into_iter()
    .collect();
}

/// Extract salient lowercase terms from a query.
///
/// Punctuation becomes whitespace, stopwords and short tokens are dropped,
/// and repeats are removed keeping first occurrence order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let cleaned = PUNCTUATION.replace_all(&lower, " ");

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() >= MIN_KEYWORD_CHARS)
        .filter(|word| !STOPWORDS.contains(word))
        .filter(|word| seen.insert(word.to_string()))
        .map(str::to_string)
        .collect()
}
