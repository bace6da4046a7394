//! Concurrent dense and sparse retrieval.

use crate::store::DocumentStore;
use crate::types::CandidateDocument;
use knowhub_core::AppResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Raw results of both search paths, before fusion.
#[derive(Debug, Default)]
pub struct Retrieved {
    pub dense: Vec<CandidateDocument>,
    pub sparse: Vec<CandidateDocument>,
}

pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl Retriever {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Run both searches for `user_id` at once.
    ///
    /// Dense search asks for `2 * top_k` neighbours and is skipped without an
    /// embedding; sparse search asks for `top_k` matches and is skipped
    /// without keywords. A failed or slow path contributes nothing.
    pub async fn retrieve(
        &self,
        user_id: &str,
        embedding: Option<&[f32]>,
        keywords: &[String],
        top_k: usize,
    ) -> Retrieved {
        let dense = async {
            match embedding {
                Some(vector) => {
                    self.bounded(
                        "dense",
                        self.store
                            .find_by_embedding_similarity(user_id, vector, true, top_k.saturating_mul(2)),
                    )
                    .await
                }
                None => Vec::new(),
            }
        };

        let sparse = async {
            if keywords.is_empty() {
                return Vec::new();
            }
            self.bounded(
                "sparse",
                self.store.find_by_keyword_match(user_id, keywords, true, top_k),
            )
            .await
        };

        let (dense, sparse) = tokio::join!(dense, sparse);

        tracing::debug!(
            "Retrieved {} dense and {} sparse candidates",
            dense.len(),
            sparse.len()
        );

        Retrieved { dense, sparse }
    }

    async fn bounded<F>(&self, path: &str, search: F) -> Vec<CandidateDocument>
    where
        F: Future<Output = AppResult<Vec<CandidateDocument>>>,
    {
        match tokio::time::timeout(self.timeout, search).await {
            Ok(Ok(docs)) => docs,
            Ok(Err(e)) => {
                tracing::warn!("{} search failed: {}", path, e);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("{} search timed out after {}s", path, self.timeout.as_secs());
                Vec::new()
            }
        }
    }
}
