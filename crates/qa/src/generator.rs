//! Answer generation.
//!
//! The query type picks the prompt, and the prompt carries the token budget
//! and temperature. Unlike expansion, a failed model call is an error: an
//! answer without its grounding would mislead.

use crate::types::QueryType;
use knowhub_core::{AppError, AppResult};
use knowhub_llm::{LlmClient, LlmRequest};
use knowhub_prompt::{build_prompt, builtin, load_prompt, PromptDefinition};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Answer returned when the model replies with nothing.
pub const EMPTY_ANSWER: &str = "I was unable to generate an answer.";

const QUERY_TYPES: [QueryType; 4] = [
    QueryType::Calculation,
    QueryType::Specific,
    QueryType::List,
    QueryType::Summary,
];

/// Prompt id used for a query type.
pub fn prompt_id(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Calculation => builtin::ANSWER_CALCULATION,
        QueryType::Specific => builtin::ANSWER_SPECIFIC,
        QueryType::List => builtin::ANSWER_LIST,
        QueryType::Summary => builtin::ANSWER_SUMMARY,
    }
}

pub struct AnswerGenerator {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: HashMap<QueryType, PromptDefinition>,
    timeout: Duration,
}

impl AnswerGenerator {
    /// Generator using the built-in answer prompts.
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let prompts = QUERY_TYPES
            .iter()
            .map(|qt| {
                builtin::builtin_prompt(prompt_id(*qt))
                    .map(|def| (*qt, def))
                    .ok_or_else(|| {
                        AppError::Prompt(format!("Missing built-in prompt {}", prompt_id(*qt)))
                    })
            })
            .collect::<AppResult<HashMap<_, _>>>()?;

        Ok(Self {
            llm,
            model: model.into(),
            prompts,
            timeout,
        })
    }

    /// Generator honouring workspace overrides of the answer prompts.
    pub fn from_workspace(
        workspace: &Path,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let prompts = QUERY_TYPES
            .iter()
            .map(|qt| load_prompt(workspace, prompt_id(*qt)).map(|def| (*qt, def)))
            .collect::<AppResult<HashMap<_, _>>>()?;

        Ok(Self {
            llm,
            model: model.into(),
            prompts,
            timeout,
        })
    }

    /// Produce an answer for `query` grounded on `context`.
    ///
    /// # Errors
    /// `AppError::AiUnavailable` if the model call fails or times out.
    pub async fn generate(&self, query: &str, context: &str, query_type: QueryType) -> AppResult<String> {
        let definition = self
            .prompts
            .get(&query_type)
            .ok_or_else(|| AppError::Prompt(format!("No prompt for query type {}", query_type)))?;

        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("context".to_string(), context.to_string());
        let built = build_prompt(definition, variables)?;

        tracing::debug!(
            "Generating {} answer with {} from prompt {} (max_tokens={}, temperature={})",
            query_type,
            self.model,
            built.metadata.source_prompt_id,
            built.generation.max_tokens,
            built.generation.temperature
        );

        let request = LlmRequest::new(built.user, self.model.clone())
            .with_system(built.system)
            .with_temperature(built.generation.temperature)
            .with_max_tokens(built.generation.max_tokens);

        let response = match tokio::time::timeout(self.timeout, self.llm.complete(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!("Answer generation failed: {}", e);
                return Err(AppError::AiUnavailable(e.to_string()));
            }
            Err(_) => {
                tracing::error!("Answer generation timed out after {}s", self.timeout.as_secs());
                return Err(AppError::AiUnavailable(format!(
                    "generation timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let answer = response.content.trim();
        if answer.is_empty() {
            tracing::warn!("Model returned an empty answer");
            return Ok(EMPTY_ANSWER.to_string());
        }

        Ok(answer.to_string())
    }
}
