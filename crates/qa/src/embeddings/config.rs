//! Embedding configuration.

use knowhub_core::AppConfig;
use knowhub_llm::ProviderType;
use serde::{Deserialize, Serialize};

/// Resolved embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama", "openai", "openrouter"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Expected vector length; 0 accepts whatever the service returns
    pub dimensions: usize,

    /// Service base URL; `None` for the in-process mock
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve from the `llm.activeEmbeddingProvider` setting.
    ///
    /// Without one, or with `mock`, the offline trigram provider is used.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let provider = match config.embedding_provider() {
            Some(name) if name != "mock" => name,
            _ => return Self::default(),
        };

        let provider_config = config.get_provider_config(provider);
        let model = provider_config
            .and_then(|pc| pc.embedding_model())
            .map(str::to_string)
            .unwrap_or_else(|| default_model(provider).to_string());
        let dimensions = known_dimensions(&model);
        let endpoint = provider_config
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
            .or_else(|| ProviderType::parse(provider).map(|p| p.default_endpoint().to_string()));
        let timeout_secs = provider_config
            .and_then(|pc| pc.timeout_secs())
            .unwrap_or_else(default_timeout_secs);

        Self {
            provider: provider.to_string(),
            model,
            dimensions,
            endpoint,
            timeout_secs,
        }
    }
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        "ollama" => "nomic-embed-text",
        "openrouter" => "cohere/embed-english-v3",
        _ => "text-embedding-3-small",
    }
}

fn known_dimensions(model: &str) -> usize {
    match model {
        "nomic-embed-text" => 768,
        "cohere/embed-english-v3" => 1024,
        "text-embedding-3-small" => 1536,
        "text-embedding-3-large" => 3072,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowhub_core::config::{LlmConfig, ProviderConfig};
    use std::collections::HashMap;

    fn app_config(active: Option<&str>, providers: HashMap<String, ProviderConfig>) -> AppConfig {
        AppConfig {
            llm: Some(LlmConfig {
                active_provider: "groq".to_string(),
                active_embedding_provider: active.map(str::to_string),
                providers,
            }),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_is_mock() {
        let config = EmbeddingConfig::from_app_config(&AppConfig::default());
        assert_eq!(config, EmbeddingConfig::default());
        assert_eq!(config.provider, "mock");
        assert_eq!(config.dimensions, 384);
    }

    #[test]
    fn test_ollama_from_provider_section() {
        let mut providers = HashMap::new();
        providers.insert(
            "ollama".to_string(),
            ProviderConfig::Ollama {
                endpoint: "http://gpu-box:11434".to_string(),
                model: "llama3".to_string(),
                expansion_model: None,
                embedding_model: None,
                timeout: Some(60),
            },
        );

        let config = EmbeddingConfig::from_app_config(&app_config(Some("ollama"), providers));
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_openrouter_defaults_without_section() {
        let config = EmbeddingConfig::from_app_config(&app_config(Some("openrouter"), HashMap::new()));
        assert_eq!(config.model, "cohere/embed-english-v3");
        assert_eq!(config.dimensions, 1024);
        assert_eq!(config.endpoint.as_deref(), Some("https://openrouter.ai/api/v1"));
    }

    #[test]
    fn test_unknown_model_accepts_any_dimensions() {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig::OpenAI {
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-4o-mini".to_string(),
                expansion_model: None,
                embedding_model: Some("custom-embedder".to_string()),
                endpoint: None,
            },
        );

        let config = EmbeddingConfig::from_app_config(&app_config(Some("openai"), providers));
        assert_eq!(config.model, "custom-embedder");
        assert_eq!(config.dimensions, 0);
    }
}
