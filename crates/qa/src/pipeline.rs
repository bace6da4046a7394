//! The query-answering pipeline.
//!
//! Stages run in a fixed order: cache check, classification, optional
//! expansion, embedding and keyword extraction, concurrent retrieval, fusion,
//! context assembly, generation, cache write and analytics. Every upstream
//! call except generation degrades to an empty or unexpanded value on
//! failure.

use crate::analytics::{AnalyticsLog, QueryRecord};
use crate::cache::ResponseCache;
use crate::classifier::classify;
use crate::config::PipelineConfig;
use crate::context::build_context;
use crate::embeddings::EmbeddingProvider;
use crate::expander::QueryExpander;
use crate::generator::AnswerGenerator;
use crate::keywords::extract_keywords;
use crate::merger::merge;
use crate::retriever::Retriever;
use crate::store::DocumentStore;
use crate::types::{AnswerResult, Query, QueryType, RetrievalStats};
use knowhub_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Answer given when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str =
    "I couldn't find any relevant documents in your knowledge base that match your query.";

/// Suggestion attached to [`NO_RESULTS_ANSWER`].
pub const NO_RESULTS_SUGGESTION: &str =
    "Try uploading documents related to your query or rephrase your question with different terms.";

/// Collaborators the pipeline is assembled from.
pub struct PipelineDeps {
    pub store: Arc<dyn DocumentStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub expander: QueryExpander,
    pub generator: AnswerGenerator,
    pub cache: Arc<dyn ResponseCache>,
    pub analytics: AnalyticsLog,
}

pub struct QaPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    expander: QueryExpander,
    generator: AnswerGenerator,
    retriever: Retriever,
    cache: Arc<dyn ResponseCache>,
    analytics: AnalyticsLog,
    config: PipelineConfig,
}

impl QaPipeline {
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        Self {
            retriever: Retriever::new(deps.store, config.timeouts.retrieval()),
            embedder: deps.embedder,
            expander: deps.expander,
            generator: deps.generator,
            cache: deps.cache,
            analytics: deps.analytics,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer a question from the user's documents.
    ///
    /// # Errors
    /// - `AppError::InvalidInput` for a blank query or a zero `top_k`
    /// - `AppError::AiUnavailable` when the answering model fails
    pub async fn answer(&self, query: Query) -> AppResult<AnswerResult> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidInput("Query is required".to_string()));
        }
        if query.top_k == 0 {
            return Err(AppError::InvalidInput("topK must be at least 1".to_string()));
        }

        let span = tracing::info_span!(
            "answer",
            user = %query.user_id,
            query_type = tracing::field::Empty
        );

        self.run(&query, text).instrument(span).await
    }

    async fn run(&self, query: &Query, text: &str) -> AppResult<AnswerResult> {
        let start = Instant::now();
        let user_id = query.user_id.as_str();

        if let Some(mut hit) = self.cache.get(user_id, text).await {
            hit.cached = true;
            hit.response_time_seconds = start.elapsed().as_secs_f64();
            tracing::info!("Cache hit ({})", hit.query_type);
            return Ok(hit);
        }

        let query_type = classify(text);
        tracing::Span::current().record("query_type", query_type.as_str());
        tracing::debug!("Classified as {}", query_type);

        let search_text = if query.use_expansion && query_type != QueryType::Specific {
            self.expander.expand(text).await
        } else {
            text.to_string()
        };

        let keywords = extract_keywords(text);
        tracing::debug!("Keywords: {:?}", keywords);

        let embedding = self.embed_query(&search_text).await;

        let retrieved = self
            .retriever
            .retrieve(user_id, embedding.as_deref(), &keywords, query.top_k)
            .await;

        let mut stats = RetrievalStats {
            dense_results: retrieved.dense.len(),
            sparse_results: retrieved.sparse.len(),
            ..RetrievalStats::default()
        };

        let ranked = merge(retrieved.dense, retrieved.sparse, query.top_k, &self.config.merge);
        stats.final_results = ranked.len();

        if ranked.is_empty() {
            let elapsed = start.elapsed().as_secs_f64();
            tracing::info!("No relevant documents, query processed in {:.2}s ({})", elapsed, query_type);
            self.analytics.log(QueryRecord::new(user_id, text, elapsed));

            return Ok(AnswerResult {
                answer: NO_RESULTS_ANSWER.to_string(),
                results: Vec::new(),
                response_time_seconds: elapsed,
                query_type,
                cached: false,
                suggestion: Some(NO_RESULTS_SUGGESTION.to_string()),
                stats,
            });
        }

        let context = build_context(&ranked, &keywords, query_type, &self.config.context);
        stats.context_length = context.chars().count();
        tracing::debug!(
            "Context built from {} documents ({} chars)",
            ranked.len(),
            stats.context_length
        );

        let answer = self.generator.generate(text, &context, query_type).await?;

        let elapsed = start.elapsed().as_secs_f64();
        let result = AnswerResult {
            answer,
            results: ranked,
            response_time_seconds: elapsed,
            query_type,
            cached: false,
            suggestion: None,
            stats,
        };

        self.cache.put(user_id, text, result.clone()).await;
        self.analytics.log(QueryRecord::new(user_id, text, elapsed));

        tracing::info!("Query processed in {:.2}s ({})", elapsed, query_type);
        Ok(result)
    }

    async fn embed_query(&self, text: &str) -> Option<Vec<f32>> {
        let timeout = self.config.timeouts.embedding();

        match tokio::time::timeout(timeout, self.embedder.embed(text)).await {
            Ok(Ok(vector)) => Some(vector),
            Ok(Err(e)) => {
                tracing::warn!("Query embedding failed, continuing without dense search: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Query embedding timed out after {}s, continuing without dense search",
                    timeout.as_secs()
                );
                None
            }
        }
    }
}
