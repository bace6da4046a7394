//! Question answering over a user's documents.
//!
//! Hybrid retrieval (embedding similarity plus keyword match) feeds a
//! query-type-specific answer prompt. The entry point is
//! [`QaPipeline::answer`]; [`build_pipeline`] wires it from an [`AppConfig`].

pub mod analytics;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod expander;
pub mod generator;
pub mod ingest;
pub mod keywords;
pub mod merger;
pub mod pipeline;
pub mod retriever;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use analytics::{AnalyticsLog, AnalyticsSink, QueryRecord, SqliteAnalyticsSink, UsageSummary};
pub use cache::{InMemoryResponseCache, ResponseCache};
pub use config::PipelineConfig;
pub use ingest::{DocumentIngestor, IngestedDocument};
pub use pipeline::{PipelineDeps, QaPipeline};
pub use store::{DocumentStore, SharedConnection, SqliteDocumentStore};
pub use types::{AnswerResult, CandidateDocument, Query, QueryType, RetrievalStats, StoredDocument};

use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use knowhub_core::{AppConfig, AppResult};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Open the workspace database, creating `.knowhub/` if needed.
pub fn open_store(config: &AppConfig) -> AppResult<SharedConnection> {
    config.ensure_state_dir()?;
    store::open_database(&config.database_path())
}

/// Embedding provider selected by `llm.activeEmbeddingProvider`.
pub fn create_embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let embedding_config = EmbeddingConfig::from_app_config(config);
    let api_key = match embedding_config.provider.as_str() {
        "mock" | "ollama" => None,
        provider => config.resolve_api_key(provider),
    };

    tracing::debug!(
        "Using {} embeddings ({})",
        embedding_config.provider,
        embedding_config.model
    );

    create_provider(&embedding_config, api_key.as_deref())
}

/// Assemble the pipeline for the configured provider.
///
/// Returns the analytics writer task alongside the pipeline; it finishes once
/// the pipeline is dropped, so callers await it before exiting to flush
/// pending records.
pub fn build_pipeline(
    config: &AppConfig,
    conn: SharedConnection,
) -> AppResult<(QaPipeline, JoinHandle<()>)> {
    config.validate()?;
    let pipeline_config = PipelineConfig::load(&config.workspace)?;

    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.and_then(|pc| pc.endpoint());
    let api_key = config.resolve_api_key(&config.provider);
    let llm = knowhub_llm::create_client(
        &config.provider,
        endpoint,
        api_key.as_deref(),
        pipeline_config.timeouts.generation(),
    )?;

    let expander = expander::QueryExpander::from_workspace(
        &config.workspace,
        Arc::clone(&llm),
        config.expansion_model.clone(),
        pipeline_config.timeouts.expansion(),
    )?;
    let generator = generator::AnswerGenerator::from_workspace(
        &config.workspace,
        llm,
        config.model.clone(),
        pipeline_config.timeouts.generation(),
    )?;

    let embedder = create_embedder(config)?;

    let sink = Arc::new(SqliteAnalyticsSink::new(Arc::clone(&conn)));
    let (analytics, analytics_task) = AnalyticsLog::spawn(sink);

    let deps = PipelineDeps {
        store: Arc::new(SqliteDocumentStore::new(conn)),
        embedder,
        expander,
        generator,
        cache: Arc::new(InMemoryResponseCache::new(&pipeline_config.cache)),
        analytics,
    };

    tracing::debug!(
        "Pipeline ready: provider={}, model={}, expansion_model={}",
        config.provider,
        config.model,
        config.expansion_model
    );

    Ok((QaPipeline::new(deps, pipeline_config), analytics_task))
}
