//! OpenAI-compatible chat completions provider.
//!
//! Groq, OpenRouter and OpenAI all accept the same
//! `POST {base}/chat/completions` body, so one client serves the three.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use knowhub_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<LlmUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatClient {
    provider: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for `provider` rooted at `base_url`.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(
        &self,
        request: &LlmRequest,
        response: ChatResponse,
    ) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm(format!("No choices returned by {}", self.provider)))?
            .message
            .content
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model.unwrap_or_else(|| request.model.clone()),
            usage: response.usage.unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(
            "Sending chat completion to {} (model {})",
            self.provider,
            request.model
        );

        let url = format!("{}/chat/completions", self.base_url);
        let body = self.to_chat_request(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider, status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        self.convert_response(request, chat_response)
    }
}
