//! Ollama embedding provider.
//!
//! Calls the local `/api/embeddings` endpoint (e.g. `nomic-embed-text`).
//! Failed requests are retried with exponential backoff. The API embeds one
//! text per request, so batches are sent sequentially.

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use knowhub_core::AppError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts per text
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Arc<Client>,
    base_url: String,
    model: String,
    /// Expected vector length; 0 disables the check
    dimensions: usize,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider. No request is made until the first embed.
    pub fn new(config: &EmbeddingConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_with_retries(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let mut attempt = 0;

        loop {
            match self.embed_single(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }

                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    async fn embed_single(&self, text: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if self.dimensions > 0 && body.embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }

        self.embed_with_retries(text).await
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama"))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: endpoint.map(str::to_string),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_construction_is_offline() {
        let provider = OllamaProvider::new(&config(Some("http://gpu-box:11434/")), Duration::from_secs(1)).unwrap();
        assert_eq!(provider.base_url, "http://gpu-box:11434");
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
        assert_eq!(provider.dimensions(), 768);

        let provider = OllamaProvider::new(&config(None), Duration::from_secs(1)).unwrap();
        assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_request() {
        let provider = OllamaProvider::new(&config(None), Duration::from_secs(1)).unwrap();
        let err = provider.embed("   ").await.unwrap_err();
        assert_eq!(err.kind(), "embedding");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_error() {
        // Port 9 (discard) is closed on any test machine.
        let provider = OllamaProvider::new(&config(Some("http://127.0.0.1:9")), Duration::from_secs(1)).unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert_eq!(err.kind(), "embedding");
    }
}
