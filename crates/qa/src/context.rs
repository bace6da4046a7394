//! Context assembly: keyword-relevant excerpts from ranked documents under a
//! hard character budget.
//!
//! All lengths are counted in characters, not bytes.

use crate::config::ContextLimits;
use crate::types::{CandidateDocument, QueryType};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]+").unwrap();
}

#[derive(Debug)]
struct ScoredSentence<'a> {
    text: &'a str,
    score: u32,
    index: usize,
}

/// Build the context blob handed to the answer model.
///
/// Documents are rendered in rank order as `=== {filename} ===\n{excerpt}\n\n`.
/// The block that would cross `limits.total_chars` is cut to the remaining
/// budget and assembly stops there.
pub fn build_context(
    docs: &[CandidateDocument],
    keywords: &[String],
    query_type: QueryType,
    limits: &ContextLimits,
) -> String {
    let max_doc_chars = limits.doc_chars(query_type);
    let mut context = String::new();
    let mut used = 0usize;

    for doc in docs {
        let name = if doc.filename.is_empty() {
            "Unknown"
        } else {
            doc.filename.as_str()
        };
        let excerpt = extract_relevant_context(&doc.extracted_text, keywords, max_doc_chars, limits);
        let block = format!("=== {} ===\n{}\n\n", name, excerpt);
        let block_chars = block.chars().count();
        let remaining = limits.total_chars.saturating_sub(used);

        if block_chars > remaining {
            context.extend(block.chars().take(remaining));
            tracing::debug!(
                "Context budget of {} chars reached at document {}",
                limits.total_chars,
                doc.id
            );
            break;
        }

        context.push_str(&block);
        used += block_chars;
    }

    context
}

/// Pick the sentences of `text` that mention the most keywords.
///
/// Falls back to the first `max_chars` characters when there are no keywords
/// or the selected sentences are too short to be useful.
pub fn extract_relevant_context(
    text: &str,
    keywords: &[String],
    max_chars: usize,
    limits: &ContextLimits,
) -> String {
    if text.is_empty() || keywords.is_empty() {
        return prefix(text, max_chars);
    }

    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut scored: Vec<ScoredSentence> = SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, sentence)| ScoredSentence {
            text: sentence,
            score: score_sentence(sentence, &keywords, limits),
            index,
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));

    let mut result = String::new();
    let mut result_chars = 0usize;
    let mut added = 0usize;

    for sentence in &scored {
        let sentence_chars = sentence.text.chars().count();
        if added >= limits.max_sentences || result_chars + sentence_chars > max_chars {
            break;
        }
        if sentence.score > 0 {
            result.push_str(sentence.text);
            result.push_str(". ");
            result_chars += sentence_chars + 2;
            added += 1;
        }
    }

    if result_chars < limits.min_excerpt_chars {
        return prefix(text, max_chars);
    }

    result.trim_end().to_string()
}

fn score_sentence(sentence: &str, keywords: &[String], limits: &ContextLimits) -> u32 {
    let lower = sentence.to_lowercase();

    keywords
        .iter()
        .filter_map(|keyword| lower.find(keyword.as_str()))
        .map(|byte_pos| {
            let position = lower[..byte_pos].chars().count();
            if position < limits.lead_window_chars {
                limits.keyword_hit_score + limits.lead_bonus_score
            } else {
                limits.keyword_hit_score
            }
        })
        .sum()
}

fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
