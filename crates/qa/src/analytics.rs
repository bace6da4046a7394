//! Query analytics.
//!
//! The pipeline hands records to [`AnalyticsLog`], which forwards them over a
//! channel to a background task. Sink failures are logged and dropped there,
//! so they never reach the request path.

use crate::store::sqlite::{with_connection, SharedConnection};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use knowhub_core::{AppError, AppResult};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Queries considered when averaging response time.
const RECENT_QUERY_WINDOW: i64 = 100;

/// Number of most frequent queries reported.
const TOP_SEARCH_LIMIT: i64 = 5;

/// One answered (or no-results) query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub query: String,
    pub response_time_seconds: f64,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

impl QueryRecord {
    pub fn new(user_id: impl Into<String>, query: impl Into<String>, response_time_seconds: f64) -> Self {
        Self {
            query: query.into(),
            response_time_seconds,
            user_id: user_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for query records.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, record: QueryRecord) -> AppResult<()>;
}

/// Non-blocking handle the pipeline logs through.
#[derive(Debug, Clone)]
pub struct AnalyticsLog {
    tx: mpsc::UnboundedSender<QueryRecord>,
}

impl AnalyticsLog {
    /// Start the background writer for `sink`.
    ///
    /// The returned task finishes once every `AnalyticsLog` clone has been
    /// dropped and the queue is drained.
    pub fn spawn(sink: Arc<dyn AnalyticsSink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueryRecord>();

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = sink.record(record).await {
                    tracing::warn!("Failed to record query analytics: {}", e);
                }
            }
            tracing::debug!("Analytics writer stopped");
        });

        (Self { tx }, handle)
    }

    /// Queue a record. Never blocks and never fails.
    pub fn log(&self, record: QueryRecord) {
        if self.tx.send(record).is_err() {
            tracing::warn!("Analytics writer is gone, dropping query record");
        }
    }
}

/// Frequency of one normalised query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCount {
    pub query: String,
    pub count: u64,
}

/// Per-user query statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_queries: u64,
    /// Mean over the most recent queries, rounded to two decimals
    pub avg_response_time: f64,
    pub top_searches: Vec<SearchCount>,
}

/// Writes records to the `search_queries` table.
#[derive(Clone)]
pub struct SqliteAnalyticsSink {
    conn: SharedConnection,
}

impl SqliteAnalyticsSink {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub async fn summary(&self, user_id: &str) -> AppResult<UsageSummary> {
        let user_id = user_id.to_string();

        with_connection(&self.conn, move |conn| {
            let store_err = |e: rusqlite::Error| AppError::Store(format!("Failed to read analytics: {}", e));

            let total_queries: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM search_queries WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .map_err(store_err)?;

            let avg: Option<f64> = conn
                .query_row(
                    "SELECT AVG(response_time) FROM (
                         SELECT response_time FROM search_queries WHERE user_id = ?1
                         ORDER BY timestamp DESC, id DESC LIMIT ?2
                     )",
                    params![user_id, RECENT_QUERY_WINDOW],
                    |row| row.get(0),
                )
                .map_err(store_err)?;

            let mut stmt = conn
                .prepare(
                    "SELECT query, COUNT(*) AS n FROM search_queries WHERE user_id = ?1
                     GROUP BY query ORDER BY n DESC, MIN(id) ASC LIMIT ?2",
                )
                .map_err(store_err)?;
            let top_searches = stmt
                .query_map(params![user_id, TOP_SEARCH_LIMIT], |row| {
                    Ok(SearchCount {
                        query: row.get(0)?,
                        count: row.get::<_, i64>(1)? as u64,
                    })
                })
                .map_err(store_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(store_err)?;

            Ok(UsageSummary {
                total_queries: total_queries as u64,
                avg_response_time: round2(avg.unwrap_or(0.0)),
                top_searches,
            })
        })
        .await
    }
}

#[async_trait]
impl AnalyticsSink for SqliteAnalyticsSink {
    async fn record(&self, record: QueryRecord) -> AppResult<()> {
        with_connection(&self.conn, move |conn| {
            conn.execute(
                "INSERT INTO search_queries (query, response_time, user_id, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.query.trim().to_lowercase(),
                    record.response_time_seconds,
                    record.user_id,
                    record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to record query: {}", e)))?;
            Ok(())
        })
        .await
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;
    use crate::tests::fakes::RecordingSink;

    struct FailingSink;

    #[async_trait]
    impl AnalyticsSink for FailingSink {
        async fn record(&self, _record: QueryRecord) -> AppResult<()> {
            Err(AppError::Store("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_log_delivers_to_sink() {
        let sink = Arc::new(RecordingSink::default());
        let (log, handle) = AnalyticsLog::spawn(sink.clone());

        log.log(QueryRecord::new("u1", "first", 0.5));
        log.log(QueryRecord::new("u1", "second", 1.5));
        drop(log);
        handle.await.unwrap();

        let records = sink.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query, "first");
        assert_eq!(records[1].response_time_seconds, 1.5);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let (log, handle) = AnalyticsLog::spawn(Arc::new(FailingSink));
        log.log(QueryRecord::new("u1", "q", 0.1));
        drop(log);
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_sqlite_summary() {
        let sink = SqliteAnalyticsSink::new(open_in_memory().unwrap());

        sink.record(QueryRecord::new("u1", "  Budget 2024 ", 1.0)).await.unwrap();
        sink.record(QueryRecord::new("u1", "budget 2024", 2.0)).await.unwrap();
        sink.record(QueryRecord::new("u1", "who wrote it", 0.333)).await.unwrap();
        sink.record(QueryRecord::new("u2", "budget 2024", 9.0)).await.unwrap();

        let summary = sink.summary("u1").await.unwrap();
        assert_eq!(summary.total_queries, 3);
        assert_eq!(summary.avg_response_time, 1.11);
        assert_eq!(
            summary.top_searches[0],
            SearchCount {
                query: "budget 2024".to_string(),
                count: 2
            }
        );
        assert_eq!(summary.top_searches.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_for_unknown_user() {
        let sink = SqliteAnalyticsSink::new(open_in_memory().unwrap());
        let summary = sink.summary("nobody").await.unwrap();
        assert_eq!(summary.total_queries, 0);
        assert_eq!(summary.avg_response_time, 0.0);
        assert!(summary.top_searches.is_empty());
    }

    #[tokio::test]
    async fn test_average_uses_recent_window() {
        let sink = SqliteAnalyticsSink::new(open_in_memory().unwrap());
        let base = Utc::now();

        for i in 0..105 {
            let mut record = QueryRecord::new("u1", format!("q{}", i), if i < 5 { 100.0 } else { 1.0 });
            record.timestamp = base + chrono::Duration::seconds(i);
            sink.record(record).await.unwrap();
        }

        let summary = sink.summary("u1").await.unwrap();
        assert_eq!(summary.total_queries, 105);
        assert_eq!(summary.avg_response_time, 1.0);
        assert_eq!(summary.top_searches.len(), 5);
    }
}
