//! LLM provider factory.
//!
//! Builds an [`LlmClient`] from a provider name, an optional endpoint and an
//! optional API key.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatClient};
use crate::types::ProviderType;
use knowhub_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("groq", "openrouter", "openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by every hosted provider
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a hosted
/// provider has no API key.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    if !provider_type.is_openai_compatible() {
        return Ok(Arc::new(OllamaClient::new(base_url, timeout)?));
    }

    let api_key = api_key.ok_or_else(|| {
        AppError::Config(format!(
            "{} provider requires an API key",
            provider_type.as_str()
        ))
    })?;

    tracing::debug!("Creating {} client at {}", provider_type.as_str(), base_url);

    Ok(Arc::new(OpenAiCompatClient::new(
        provider_type.as_str(),
        base_url,
        api_key,
        timeout,
    )?))
}
