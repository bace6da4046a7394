//! Command handlers for the KnowHub CLI.

pub mod ask;
pub mod docs;
pub mod prompts;
pub mod stats;

pub use ask::AskCommand;
pub use docs::DocsCommand;
pub use prompts::PromptsCommand;
pub use stats::StatsCommand;
