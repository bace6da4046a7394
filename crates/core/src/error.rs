//! Error types for KnowHub.
//!
//! One enum covers every failure category in the workspace: configuration,
//! I/O, the LLM and embedding services, the document store, prompts, and the
//! two request-level conditions the query pipeline surfaces to its caller
//! (invalid input and an unavailable answering model).

use thiserror::Error;

/// Unified error type for KnowHub.
///
/// All fallible functions return `Result<T, AppError>`. Callers that need a
/// stable discriminator (an HTTP layer, the CLI's JSON output) use
/// [`AppError::kind`]; the `Display` text is meant for humans.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Document store and analytics storage errors
    #[error("Store error: {0}")]
    Store(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The request was rejected before any external call was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The answering model could not produce an answer
    #[error("AI service is unavailable. Please try again later. ({0})")]
    AiUnavailable(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable, machine-checkable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Llm(_) => "llm",
            AppError::Embedding(_) => "embedding",
            AppError::Store(_) => "store",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::AiUnavailable(_) => "ai_unavailable",
            AppError::Other(_) => "other",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
