//! Pipeline configuration.
//!
//! Loaded from `.knowhub/pipeline.yaml` when present. Every field has a
//! default, so a partial file only overrides what it names.

use knowhub_core::config::STATE_DIR;
use knowhub_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{QueryType, DEFAULT_TOP_K};

/// Tuning knobs for the query-answering pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Result count used when the caller does not pass one
    pub default_top_k: usize,

    /// Whether expansion is on unless the caller turns it off
    pub use_expansion: bool,

    pub cache: CacheSettings,
    pub context: ContextLimits,
    pub merge: MergeWeights,
    pub timeouts: StageTimeouts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            use_expansion: true,
            cache: CacheSettings::default(),
            context: ContextLimits::default(),
            merge: MergeWeights::default(),
            timeouts: StageTimeouts::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    pub ttl_secs: u64,

    /// Entry count above which expired entries are swept on write
    pub high_water_mark: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            high_water_mark: 100,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Character budgets and sentence scoring for context assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextLimits {
    pub specific_doc_chars: usize,
    pub default_doc_chars: usize,
    /// Hard cap on the assembled context
    pub total_chars: usize,
    pub max_sentences: usize,
    /// Excerpts shorter than this fall back to the document prefix
    pub min_excerpt_chars: usize,
    pub lead_window_chars: usize,
    pub keyword_hit_score: u32,
    pub lead_bonus_score: u32,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            specific_doc_chars: 1500,
            default_doc_chars: 3000,
            total_chars: 8000,
            max_sentences: 15,
            min_excerpt_chars: 100,
            lead_window_chars: 50,
            keyword_hit_score: 10,
            lead_bonus_score: 5,
        }
    }
}

impl ContextLimits {
    /// Per-document excerpt budget for a query type.
    pub fn doc_chars(&self, query_type: QueryType) -> usize {
        match query_type {
            QueryType::Specific => self.specific_doc_chars,
            _ => self.default_doc_chars,
        }
    }
}

/// Rank-fusion decay constants: the i-th result of a list earns
/// `(window - i) * step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeWeights {
    pub dense_rank_window: f64,
    pub dense_rank_step: f64,
    pub sparse_rank_window: f64,
    pub sparse_rank_step: f64,
}

impl Default for MergeWeights {
    fn default() -> Self {
        Self {
            dense_rank_window: 10.0,
            dense_rank_step: 0.1,
            sparse_rank_window: 5.0,
            sparse_rank_step: 0.05,
        }
    }
}

/// Per-call timeouts for the external stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageTimeouts {
    pub embedding_secs: u64,
    pub expansion_secs: u64,
    pub retrieval_secs: u64,
    pub generation_secs: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            embedding_secs: 5,
            expansion_secs: 10,
            retrieval_secs: 10,
            generation_secs: 30,
        }
    }
}

impl StageTimeouts {
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }

    pub fn expansion(&self) -> Duration {
        Duration::from_secs(self.expansion_secs)
    }

    pub fn retrieval(&self) -> Duration {
        Duration::from_secs(self.retrieval_secs)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_secs(self.generation_secs)
    }
}

impl PipelineConfig {
    /// Load `.knowhub/pipeline.yaml`, or defaults if the file does not exist.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let config_path = get_config_path(workspace);

        if !config_path.exists() {
            tracing::debug!("No pipeline config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        config.validate()?;

        tracing::debug!("Loaded pipeline config from {:?}", config_path);
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.default_top_k == 0 {
            return Err(AppError::Config("defaultTopK must be at least 1".to_string()));
        }

        if self.context.total_chars == 0
            || self.context.specific_doc_chars == 0
            || self.context.default_doc_chars == 0
        {
            return Err(AppError::Config(
                "context character budgets must be positive".to_string(),
            ));
        }

        let timeouts = [
            ("embeddingSecs", self.timeouts.embedding_secs),
            ("expansionSecs", self.timeouts.expansion_secs),
            ("retrievalSecs", self.timeouts.retrieval_secs),
            ("generationSecs", self.timeouts.generation_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(AppError::Config(format!("timeouts.{} must be positive", name)));
        }

        Ok(())
    }
}

/// Get the path to the pipeline config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("pipeline.yaml")
}
