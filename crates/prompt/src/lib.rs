//! Prompt system for KnowHub.
//!
//! - Built-in answer and query-expansion prompts
//! - YAML overrides under `.knowhub/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use builtin::builtin_prompt;
pub use loader::{list_prompts, load_prompt, PromptListing};
pub use types::{BuiltPrompt, BuiltPromptMetadata, GenerationSettings, PromptDefinition, PromptSource};
