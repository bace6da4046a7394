//! Query expansion.
//!
//! A small model rewrites the question with related terms to widen dense
//! retrieval. Expansion is best effort: any failure yields the original text.

use knowhub_core::{AppError, AppResult};
use knowhub_llm::{LlmClient, LlmRequest};
use knowhub_prompt::{build_prompt, builtin, load_prompt, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct QueryExpander {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    timeout: Duration,
}

impl QueryExpander {
    /// Expander using the built-in `query.expand` prompt.
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let prompt = builtin::builtin_prompt(builtin::QUERY_EXPAND).ok_or_else(|| {
            AppError::Prompt(format!("Missing built-in prompt {}", builtin::QUERY_EXPAND))
        })?;
        Ok(Self::with_prompt(llm, model, prompt, timeout))
    }

    /// Expander honouring a workspace override of `query.expand`.
    pub fn from_workspace(
        workspace: &Path,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let prompt = load_prompt(workspace, builtin::QUERY_EXPAND)?;
        Ok(Self::with_prompt(llm, model, prompt, timeout))
    }

    pub fn with_prompt(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        timeout: Duration,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
            timeout,
        }
    }

    /// Broaden `query`, or return it unchanged if the model call fails.
    pub async fn expand(&self, query: &str) -> String {
        match self.try_expand(query).await {
            Ok(Some(expanded)) => {
                tracing::debug!("Expanded query: {}", expanded);
                expanded
            }
            Ok(None) => {
                tracing::debug!("Expansion returned nothing, keeping original query");
                query.to_string()
            }
            Err(e) => {
                tracing::warn!("Query expansion failed, using original query: {}", e);
                query.to_string()
            }
        }
    }

    async fn try_expand(&self, query: &str) -> AppResult<Option<String>> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        let built = build_prompt(&self.prompt, variables)?;

        let request = LlmRequest::new(built.user, self.model.clone())
            .with_system(built.system)
            .with_temperature(built.generation.temperature)
            .with_max_tokens(built.generation.max_tokens);

        let response = tokio::time::timeout(self.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| {
                AppError::Llm(format!(
                    "expansion timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        Ok(clean_expansion(&response.content))
    }
}

/// Trim whitespace and one pair of surrounding quotes.
fn clean_expansion(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|s| s.strip_suffix(*q))
        })
        .unwrap_or(trimmed)
        .trim();

    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::ScriptedLlm;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_expansion_uses_prompt_settings() {
        let llm = Arc::new(ScriptedLlm::replying(&["\"quarterly revenue income sales\""]));
        let expander = QueryExpander::new(llm.clone(), "small-model", TIMEOUT).unwrap();

        let expanded = expander.expand("quarterly revenue").await;
        assert_eq!(expanded, "quarterly revenue income sales");

        let requests = llm.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "small-model");
        assert_eq!(requests[0].max_tokens, Some(100));
        assert_eq!(requests[0].temperature, Some(0.3));
        assert!(requests[0].prompt.contains("quarterly revenue"));
    }

    #[tokio::test]
    async fn test_failure_returns_original() {
        let llm = Arc::new(ScriptedLlm::failing());
        let expander = QueryExpander::new(llm, "small-model", TIMEOUT).unwrap();
        assert_eq!(expander.expand("budget plan").await, "budget plan");
    }

    #[tokio::test]
    async fn test_empty_completion_returns_original() {
        let llm = Arc::new(ScriptedLlm::replying(&["  \"\"  "]));
        let expander = QueryExpander::new(llm, "small-model", TIMEOUT).unwrap();
        assert_eq!(expander.expand("budget plan").await, "budget plan");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_original() {
        let llm = Arc::new(ScriptedLlm::replying(&["never seen"]).with_delay(Duration::from_secs(60)));
        let expander = QueryExpander::new(llm, "small-model", Duration::from_secs(10)).unwrap();
        assert_eq!(expander.expand("budget plan").await, "budget plan");
    }

    #[test]
    fn test_clean_expansion() {
        assert_eq!(clean_expansion("  'a b c'\n").as_deref(), Some("a b c"));
        assert_eq!(clean_expansion("plain words").as_deref(), Some("plain words"));
        assert_eq!(clean_expansion("\"unbalanced").as_deref(), Some("\"unbalanced"));
        assert_eq!(clean_expansion("   "), None);
    }
}
