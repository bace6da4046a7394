//! Prompts command handler.

use clap::Args;
use knowhub_core::{config::AppConfig, AppResult};
use knowhub_prompt::{list_prompts, PromptSource};

/// List answer and expansion prompts, marking workspace overrides
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts = list_prompts(&config.workspace)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&prompts)?);
            return Ok(());
        }

        for prompt in &prompts {
            let source = match prompt.source {
                PromptSource::Builtin => "builtin",
                PromptSource::Workspace => "workspace",
            };
            println!("{:<24} {:<10} {}", prompt.id, source, prompt.title);
        }

        Ok(())
    }
}
