//! KnowHub CLI
//!
//! Main entry point for the knowhub command-line tool: ask questions about
//! your documents, manage the document store and inspect usage.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, DocsCommand, PromptsCommand, StatsCommand};
use knowhub_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// KnowHub - question answering over your own documents
#[derive(Parser, Debug)]
#[command(name = "knowhub")]
#[command(about = "Question answering over your own documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "KNOWHUB_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "KNOWHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai, openrouter, groq)
    #[arg(short, long, global = true, env = "KNOWHUB_PROVIDER")]
    provider: Option<String>,

    /// Answer model identifier
    #[arg(short, long, global = true, env = "KNOWHUB_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question about your documents
    Ask(AskCommand),

    /// Add, list and delete documents
    Docs(DocsCommand),

    /// Show query statistics for a user
    Stats(StatsCommand),

    /// List answer and expansion prompts
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;

    // An explicit --config file is merged before the remaining flags apply
    if let Some(ref path) = cli.config {
        config = config.merge_yaml(path)?;
    }

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("KnowHub CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Docs(_) => "docs",
        Commands::Stats(_) => "stats",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Docs(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
