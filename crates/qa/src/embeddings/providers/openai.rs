//! OpenAI-compatible embedding provider (OpenAI, OpenRouter).

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use knowhub_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    client: Client,
    provider: String,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig, api_key: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);

        Ok(Self {
            client,
            provider: config.provider.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        tracing::debug!("Embedding {} texts via {}", texts.len(), url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        collect_embeddings(body, texts.len(), self.dimensions)
    }
}

/// Order the returned vectors by `index` and check count and length.
fn collect_embeddings(
    mut body: EmbedResponse,
    expected: usize,
    dimensions: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if body.data.len() != expected {
        return Err(AppError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            body.data.len()
        )));
    }

    body.data.sort_by_key(|d| d.index.unwrap_or(0));

    let embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();
    if dimensions > 0 {
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(AppError::Embedding(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                bad.len(),
                dimensions
            )));
        }
    }

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> EmbedResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_reorders_by_index() {
        let body = parse(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        );
        let embeddings = collect_embeddings(body, 2, 2).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_count_mismatch() {
        let body = parse(r#"{"data": []}"#);
        let err = collect_embeddings(body, 1, 0).unwrap_err();
        assert_eq!(err.kind(), "embedding");
    }

    #[test]
    fn test_dimension_check_skipped_when_unknown() {
        let body = parse(r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#);
        assert!(collect_embeddings(body, 1, 0).is_ok());

        let body = parse(r#"{"data": [{"embedding": [0.1, 0.2, 0.3]}]}"#);
        assert!(collect_embeddings(body, 1, 1024).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let config = EmbeddingConfig {
            provider: "openrouter".to_string(),
            model: "cohere/embed-english-v3".to_string(),
            dimensions: 1024,
            endpoint: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
        };
        let provider = OpenAiEmbeddingProvider::new(&config, "sk-test", Duration::from_secs(1)).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
