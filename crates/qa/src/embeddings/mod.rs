//! Embedding providers.
//!
//! The pipeline embeds the (possibly expanded) query; `docs add` embeds
//! document text with the same provider so the vectors are comparable.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
