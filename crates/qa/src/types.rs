//! Query-answering type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of documents an answer is grounded on.
pub const DEFAULT_TOP_K: usize = 3;

/// A user question as received by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Issuing user; scopes retrieval and caching
    pub user_id: String,

    /// Raw question text
    pub text: String,

    /// Number of documents in the final ranked list
    pub top_k: usize,

    /// Whether the query may be broadened by the expansion model
    pub use_expansion: bool,
}

impl Query {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            top_k: DEFAULT_TOP_K,
            use_expansion: true,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_expansion(mut self, use_expansion: bool) -> Self {
        self.use_expansion = use_expansion;
        self
    }
}

/// Category of a question; selects the answer prompt and context budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Specific,
    Summary,
    List,
    Calculation,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Specific => "specific",
            QueryType::Summary => "summary",
            QueryType::List => "list",
            QueryType::Calculation => "calculation",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document surfaced by dense or sparse retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDocument {
    pub id: String,

    /// Original file name; empty when unknown
    pub filename: String,

    pub extracted_text: String,

    /// Document type (e.g., "text/plain")
    #[serde(rename = "type")]
    pub doc_type: String,

    /// Similarity score from retrieval, then the fused rank score
    pub score: f64,
}

/// Per-request retrieval counters reported alongside an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalStats {
    pub dense_results: usize,
    pub sparse_results: usize,
    pub final_results: usize,
    pub context_length: usize,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub answer: String,

    /// Ranked source documents the answer is grounded on
    pub results: Vec<CandidateDocument>,

    pub response_time_seconds: f64,

    pub query_type: QueryType,

    pub cached: bool,

    /// Hint for the user when nothing was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    pub stats: RetrievalStats,
}

/// A document as stored for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Character count of the extracted text
    pub text_chars: usize,
    pub has_embedding: bool,
    pub created_at: DateTime<Utc>,
}

/// A document about to be inserted.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: String,
    pub filename: String,
    pub doc_type: String,
    pub extracted_text: String,
    pub embedding: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = Query::new("u1", "who prepared the report");
        assert_eq!(query.top_k, 3);
        assert!(query.use_expansion);

        let query = query.with_top_k(5).with_expansion(false);
        assert_eq!(query.top_k, 5);
        assert!(!query.use_expansion);
    }

    #[test]
    fn test_answer_result_wire_format() {
        let result = AnswerResult {
            answer: "**Jane Doe**".to_string(),
            results: vec![CandidateDocument {
                id: "d1".to_string(),
                filename: "report.txt".to_string(),
                extracted_text: "Prepared by Jane Doe, Analyst.".to_string(),
                doc_type: "text/plain".to_string(),
                score: 1.5,
            }],
            response_time_seconds: 0.25,
            query_type: QueryType::Specific,
            cached: false,
            suggestion: None,
            stats: RetrievalStats::default(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["queryType"], "specific");
        assert_eq!(json["responseTimeSeconds"], 0.25);
        assert_eq!(json["results"][0]["extractedText"], "Prepared by Jane Doe, Analyst.");
        assert_eq!(json["results"][0]["type"], "text/plain");
        assert!(json.get("suggestion").is_none());
        assert_eq!(json["stats"]["finalResults"], 0);
    }
}
