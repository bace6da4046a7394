//! LLM integration crate for KnowHub.
//!
//! A provider-agnostic completion interface used by query expansion and
//! answer generation.
//!
//! # Providers
//! - **Groq / OpenRouter / OpenAI**: OpenAI-compatible chat completions
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use knowhub_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new("http://localhost:11434", Duration::from_secs(30))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2").with_system("Be brief.");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatClient};
pub use types::ProviderType;
