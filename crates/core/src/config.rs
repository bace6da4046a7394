//! Configuration management for KnowHub.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - The workspace config file (`.knowhub/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Pipeline tuning (budgets, timeouts, cache TTL) lives next to the pipeline
//! in `knowhub-qa`; this module only covers process-wide settings and the
//! LLM/embedding provider table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".knowhub";

/// Providers the LLM factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 4] = ["groq", "openrouter", "openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .knowhub/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider (e.g., "groq", "openrouter", "ollama")
    pub provider: String,

    /// Model used to generate answers
    pub model: String,

    /// Model used for query expansion (usually a smaller, faster model)
    pub expansion_model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider", default)]
    pub active_embedding_provider: Option<String>,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Any OpenAI-compatible chat/embeddings API (OpenAI, Groq, OpenRouter).
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "expansionModel", default)]
        expansion_model: Option<String>,
        #[serde(rename = "embeddingModel", default)]
        embedding_model: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "expansionModel", default)]
        expansion_model: Option<String>,
        #[serde(rename = "embeddingModel", default)]
        embedding_model: Option<String>,
        #[serde(default)]
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn expansion_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                expansion_model, ..
            }
            | Self::Ollama {
                expansion_model, ..
            } => expansion_model.as_deref(),
        }
    }

    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }

    /// Request timeout in seconds, when the provider config pins one.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            Self::Ollama { timeout, .. } => *timeout,
            Self::OpenAI { .. } => None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "groq".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            expansion_model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the workspace config file and the
    /// environment.
    ///
    /// Environment variables:
    /// - `KNOWHUB_WORKSPACE`: Override workspace path
    /// - `KNOWHUB_CONFIG`: Path to config file
    /// - `KNOWHUB_PROVIDER`: LLM provider
    /// - `KNOWHUB_MODEL`: Answer model
    /// - `KNOWHUB_EXPANSION_MODEL`: Query expansion model
    /// - `KNOWHUB_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use knowhub_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("KNOWHUB_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("KNOWHUB_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("KNOWHUB_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("KNOWHUB_MODEL") {
            config.model = model;
        }

        if let Ok(model) = std::env::var("KNOWHUB_EXPANSION_MODEL") {
            config.expansion_model = model;
        }

        config.api_key = std::env::var("KNOWHUB_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
                if let Some(expansion) = provider_config.expansion_model() {
                    result.expansion_model = expansion.to_string();
                }
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .knowhub directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Path to the SQLite database holding documents and query analytics.
    pub fn database_path(&self) -> PathBuf {
        self.state_dir().join("knowhub.db")
    }

    /// Ensure the .knowhub directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Look up a provider entry from the `llm.providers` table.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Name of the provider used for embeddings, if one is configured.
    pub fn embedding_provider(&self) -> Option<&str> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.active_embedding_provider.as_deref())
    }

    /// Resolve the API key for a provider.
    ///
    /// `KNOWHUB_API_KEY` wins; otherwise the provider's `apiKeyEnv` variable
    /// is read; otherwise the conventional `<PROVIDER>_API_KEY` variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
            self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        std::env::var(format!("{}_API_KEY", provider.to_uppercase())).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) =
            self.get_provider_config(provider)
        {
            if self.api_key.is_none() && std::env::var(api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_state_paths() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".knowhub"));
        assert!(config.database_path().ends_with(".knowhub/knowhub.db"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_reads_provider_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  activeEmbeddingProvider: ollama
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: llama3.2
      expansionModel: llama3.2:1b
      embeddingModel: nomic-embed-text
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "llama3.2");
        assert_eq!(merged.expansion_model, "llama3.2:1b");
        assert_eq!(merged.embedding_provider(), Some("ollama"));
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);

        let provider = merged.get_provider_config("ollama").unwrap();
        assert_eq!(provider.embedding_model(), Some("nomic-embed-text"));
        assert_eq!(provider.endpoint(), Some("http://localhost:11434"));
    }

    #[test]
    fn test_merge_yaml_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "llm: [not, a, map").unwrap();

        let err = AppConfig::default().merge_yaml(&path).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_key_env() {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig::OpenAI {
                api_key_env: "KNOWHUB_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
                model: "gpt-4o-mini".to_string(),
                expansion_model: None,
                embedding_model: None,
                endpoint: None,
            },
        );

        let config = AppConfig {
            provider: "openai".to_string(),
            llm: Some(LlmConfig {
                active_provider: "openai".to_string(),
                active_embedding_provider: None,
                providers,
            }),
            ..AppConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("KNOWHUB_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
