//! Rule-based query classification.

use crate::types::QueryType;
use lazy_static::lazy_static;
use regex::Regex;

/// Phrases that mark a question as needing arithmetic over document figures.
const CALCULATION_TERMS: &[&str] = &[
    "profit",
    "loss",
    "calculate",
    "total",
    "sum",
    "difference",
    "subtract",
    "add",
    "multiply",
    "divide",
    "percentage",
    "ratio",
    "average",
    "mean",
    "revenue minus",
    "expenses from",
    "how much",
];

lazy_static! {
    static ref SPECIFIC_PATTERN: Regex =
        Regex::new(r"\b(who|whose|which person|what is the name|prepared by|created by|author)\b")
            .unwrap();
    static ref LIST_PATTERN: Regex =
        Regex::new(r"\b(list|show all|what are|give me all|enumerate)\b").unwrap();
}

/// Classify a query. Calculation is checked first, then specific, then list;
/// anything else is a summary.
pub fn classify(text: &str) -> QueryType {
    let lower = text.to_lowercase();

    if CALCULATION_TERMS.iter().any(|term| lower.contains(term)) {
        return QueryType::Calculation;
    }

    if SPECIFIC_PATTERN.is_match(&lower) {
        return QueryType::Specific;
    }

    if LIST_PATTERN.is_match(&lower) {
        return QueryType::List;
    }

    QueryType::Summary
}
