//! Stats command handler.
//!
//! Shows document counts and query analytics for one user.

use clap::Args;
use knowhub_core::{config::AppConfig, AppResult};
use knowhub_qa::{open_store, SqliteAnalyticsSink, SqliteDocumentStore};

/// Show query statistics for a user
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// User to report on
    #[arg(short, long, default_value = "default", env = "KNOWHUB_USER")]
    pub user: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for user '{}'", self.user);

        let conn = open_store(config)?;
        let store = SqliteDocumentStore::new(conn.clone());
        let analytics = SqliteAnalyticsSink::new(conn);

        let documents = store.count_documents(&self.user).await?;
        let embedded = store.count_embedded_documents(&self.user).await?;
        let pages = store.total_pages(&self.user).await?;
        let usage = analytics.summary(&self.user).await?;

        if self.json {
            let output = serde_json::json!({
                "user": self.user,
                "documents": documents,
                "embeddedDocuments": embedded,
                "totalPages": pages,
                "totalQueries": usage.total_queries,
                "avgResponseTime": usage.avg_response_time,
                "topSearches": usage.top_searches,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Documents:          {} ({} embedded)", documents, embedded);
        println!("Pages:              {}", pages);
        println!("Queries:            {}", usage.total_queries);
        println!("Avg response time:  {:.2}s", usage.avg_response_time);

        if !usage.top_searches.is_empty() {
            println!("Top searches:");
            for search in &usage.top_searches {
                println!("  {:>4}  {}", search.count, search.query);
            }
        }

        Ok(())
    }
}
