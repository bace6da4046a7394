//! Document store interface.

pub mod sqlite;

pub use sqlite::{open_database, open_in_memory, SharedConnection, SqliteDocumentStore};

use crate::types::CandidateDocument;
use async_trait::async_trait;
use knowhub_core::AppResult;

/// Read access the pipeline needs from the document store.
///
/// Both searches are scoped to one user. The pipeline never writes through
/// this trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Nearest neighbours of `embedding` among the user's embedded documents,
    /// most similar first. `score` carries the similarity.
    async fn find_by_embedding_similarity(
        &self,
        user_id: &str,
        embedding: &[f32],
        exclude_deleted: bool,
        limit: usize,
    ) -> AppResult<Vec<CandidateDocument>>;

    /// The user's documents whose filename or text contains any keyword,
    /// case-insensitively. `score` is zero.
    async fn find_by_keyword_match(
        &self,
        user_id: &str,
        keywords: &[String],
        exclude_deleted: bool,
        limit: usize,
    ) -> AppResult<Vec<CandidateDocument>>;
}
