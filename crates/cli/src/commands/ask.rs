//! Ask command handler.
//!
//! Runs questions through the query-answering pipeline, either once from the
//! command line or interactively from stdin.

use clap::Args;
use knowhub_core::{config::AppConfig, AppResult};
use knowhub_qa::{build_pipeline, open_store, AnswerResult, QaPipeline, Query};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Ask a question about your documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask (omit to read questions from stdin)
    pub question: Option<String>,

    /// User whose documents are searched
    #[arg(short, long, default_value = "default", env = "KNOWHUB_USER")]
    pub user: String,

    /// Number of documents to ground the answer on (default from pipeline.yaml)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Search with the question as typed, without model expansion
    #[arg(long)]
    pub no_expansion: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let conn = open_store(config)?;
        let (pipeline, analytics_task) = build_pipeline(config, conn)?;

        let result = match self.question {
            Some(ref question) => self.ask_one(&pipeline, question).await,
            None => self.interactive(&pipeline).await,
        };

        // Closing the pipeline ends the analytics writer once it drains
        drop(pipeline);
        if let Err(e) = analytics_task.await {
            tracing::warn!("Analytics writer stopped abnormally: {}", e);
        }

        result
    }

    async fn ask_one(&self, pipeline: &QaPipeline, question: &str) -> AppResult<()> {
        let defaults = pipeline.config();
        let query = Query::new(self.user.as_str(), question)
            .with_top_k(self.top_k.unwrap_or(defaults.default_top_k))
            .with_expansion(defaults.use_expansion && !self.no_expansion);

        let result = pipeline.answer(query).await?;
        self.print(&result)
    }

    /// Answer one question per stdin line until EOF or `exit`.
    async fn interactive(&self, pipeline: &QaPipeline) -> AppResult<()> {
        if !self.json {
            eprintln!("Ask a question (Ctrl-D or 'exit' to quit)");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question == "exit" || question == "quit" {
                break;
            }

            // A failed question should not end the session
            if let Err(e) = self.ask_one(pipeline, question).await {
                tracing::error!("Question failed: {}", e);
                eprintln!("Error: {}", e);
            }
        }

        Ok(())
    }

    fn print(&self, result: &AnswerResult) -> AppResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(result)?);
            return Ok(());
        }

        println!("{}", result.answer);

        if let Some(ref suggestion) = result.suggestion {
            println!("\n{}", suggestion);
        }

        if !result.results.is_empty() {
            println!("\nSources:");
            for (i, doc) in result.results.iter().enumerate() {
                let name = if doc.filename.is_empty() {
                    "Unknown"
                } else {
                    doc.filename.as_str()
                };
                println!("  {}. {} ({:.2})", i + 1, name, doc.score);
            }
        }

        tracing::debug!(
            "Answered as {} in {:.2}s (cached: {}, dense: {}, sparse: {}, context: {} chars)",
            result.query_type,
            result.response_time_seconds,
            result.cached,
            result.stats.dense_results,
            result.stats.sparse_results,
            result.stats.context_length
        );

        Ok(())
    }
}
