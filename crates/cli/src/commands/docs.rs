//! Docs command handler.
//!
//! Manages the per-user document store the ask command searches.

use clap::{Args, Subcommand};
use knowhub_core::{config::AppConfig, AppError, AppResult};
use knowhub_qa::{create_embedder, open_store, DocumentIngestor, SqliteDocumentStore};
use std::path::PathBuf;

/// Add, list and delete documents
#[derive(Args, Debug)]
pub struct DocsCommand {
    /// Owner of the documents
    #[arg(short, long, global = true, default_value = "default", env = "KNOWHUB_USER")]
    pub user: String,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: DocsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocsAction {
    /// Add text files (directories are walked recursively)
    Add {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List stored documents
    List,
    /// Delete a document; it stops appearing in answers
    Delete {
        /// Document id as shown by `docs list`
        id: String,
    },
}

impl DocsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing docs command for user '{}'", self.user);

        let store = SqliteDocumentStore::new(open_store(config)?);

        match self.action {
            DocsAction::Add { ref paths } => self.add(config, store, paths).await,
            DocsAction::List => self.list(&store).await,
            DocsAction::Delete { ref id } => self.delete(&store, id).await,
        }
    }

    async fn add(&self, config: &AppConfig, store: SqliteDocumentStore, paths: &[PathBuf]) -> AppResult<()> {
        let ingestor = DocumentIngestor::new(store, create_embedder(config)?);

        let mut ingested = Vec::new();
        for path in paths {
            ingested.extend(ingestor.ingest_path(&self.user, path).await?);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&ingested)?);
            return Ok(());
        }

        for doc in &ingested {
            let note = if doc.embedded { "" } else { " (keyword search only)" };
            println!("{}  {} ({} chars){}", doc.id, doc.filename, doc.text_chars, note);
        }
        println!("Added {} documents", ingested.len());

        Ok(())
    }

    async fn list(&self, store: &SqliteDocumentStore) -> AppResult<()> {
        let docs = store.list_documents(&self.user).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&docs)?);
            return Ok(());
        }

        if docs.is_empty() {
            println!("No documents for user '{}'", self.user);
            return Ok(());
        }

        for doc in &docs {
            println!(
                "{}  {:<30} {:<16} {:>8} chars  {}  {}",
                doc.id,
                doc.filename,
                doc.doc_type,
                doc.text_chars,
                if doc.has_embedding { "embedded" } else { "keywords" },
                doc.created_at.format("%Y-%m-%d %H:%M")
            );
        }

        Ok(())
    }

    async fn delete(&self, store: &SqliteDocumentStore, id: &str) -> AppResult<()> {
        if !store.soft_delete(&self.user, id).await? {
            return Err(AppError::InvalidInput(format!(
                "No document '{}' for user '{}'",
                id, self.user
            )));
        }

        if self.json {
            println!("{}", serde_json::json!({ "id": id, "deleted": true }));
        } else {
            println!("Deleted {}", id);
        }

        Ok(())
    }
}
