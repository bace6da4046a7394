//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use knowhub_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.provider.as_str() {
        "mock" => {
            let provider = super::providers::mock::MockProvider::new(config.dimensions);
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = super::providers::ollama::OllamaProvider::new(config, timeout)?;
            Ok(Arc::new(provider))
        }

        "openai" | "openrouter" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config(format!(
                    "{} embedding provider requires an API key",
                    config.provider
                ))
            })?;
            let provider =
                super::providers::openai::OpenAiEmbeddingProvider::new(config, api_key, timeout)?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai, openrouter",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&EmbeddingConfig::default(), None).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "gguf".to_string(),
            ..EmbeddingConfig::default()
        };

        let result = create_provider(&config, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[test]
    fn test_hosted_provider_needs_key() {
        let config = EmbeddingConfig {
            provider: "openrouter".to_string(),
            model: "cohere/embed-english-v3".to_string(),
            dimensions: 1024,
            endpoint: Some("https://openrouter.ai/api/v1".to_string()),
            timeout_secs: 30,
        };

        let err = create_provider(&config, None).unwrap_err();
        assert_eq!(err.kind(), "config");

        let provider = create_provider(&config, Some("sk-test")).unwrap();
        assert_eq!(provider.provider_name(), "openrouter");
        assert_eq!(provider.model_name(), "cohere/embed-english-v3");
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingConfig::default(), None).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
