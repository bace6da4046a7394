//! SQLite-backed document store.
//!
//! Blocking rusqlite calls run on tokio's blocking pool behind a shared
//! mutex-guarded connection. The same connection backs the analytics table.

use super::DocumentStore;
use crate::types::{CandidateDocument, NewDocument, StoredDocument};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use knowhub_core::{AppError, AppResult};
use rusqlite::types::Value;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Connection shared by the document store and the analytics sink.
pub type SharedConnection = Arc<Mutex<Connection>>;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        filename TEXT NOT NULL,
        extracted_text TEXT NOT NULL,
        doc_type TEXT NOT NULL,
        embedding BLOB,
        deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id, deleted);

    CREATE TABLE IF NOT EXISTS search_queries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        query TEXT NOT NULL,
        response_time REAL NOT NULL,
        user_id TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_search_queries_user ON search_queries(user_id, timestamp);
"#;

/// Open (and migrate) the database file.
pub fn open_database(db_path: &Path) -> AppResult<SharedConnection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Store(format!("Failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Store(format!("Failed to open SQLite database: {}", e)))?;

    init_schema(&conn)?;

    tracing::debug!("Opened SQLite database at {:?}", db_path);
    Ok(Arc::new(Mutex::new(conn)))
}

/// Open a private in-memory database.
pub fn open_in_memory() -> AppResult<SharedConnection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Store(format!("Failed to open in-memory database: {}", e)))?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    register_functions(conn)?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))
}

/// `unicode_lower(text)`: full Unicode lowercasing. The built-in `lower()`
/// only folds ASCII.
fn register_functions(conn: &Connection) -> AppResult<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .map_err(|e| AppError::Store(format!("Failed to register SQL functions: {}", e)))
}

/// Run `f` against the connection on the blocking pool.
pub(crate) async fn with_connection<T, F>(conn: &SharedConnection, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|_| AppError::Store("SQLite connection lock poisoned".to_string()))?;
        f(&guard)
    })
    .await
    .map_err(|e| AppError::Store(format!("SQLite task failed: {}", e)))?
}

/// Documents table access.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: SharedConnection,
}

impl SqliteDocumentStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Insert a document and return its generated id.
    pub async fn insert_document(&self, doc: NewDocument) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let doc_id = id.clone();

        with_connection(&self.conn, move |conn| {
            let embedding = doc.embedding.as_deref().map(embedding_to_bytes);
            conn.execute(
                "INSERT INTO documents (id, user_id, filename, extracted_text, doc_type, embedding, deleted, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                params![
                    doc_id,
                    doc.user_id,
                    doc.filename,
                    doc.extracted_text,
                    doc.doc_type,
                    embedding,
                    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert document: {}", e)))?;
            Ok(())
        })
        .await?;

        tracing::debug!("Inserted document {}", id);
        Ok(id)
    }

    /// Mark a user's document deleted. Returns false if no live document
    /// matched.
    pub async fn soft_delete(&self, user_id: &str, id: &str) -> AppResult<bool> {
        let (user_id, id) = (user_id.to_string(), id.to_string());
        with_connection(&self.conn, move |conn| {
            let changed = conn
                .execute(
                    "UPDATE documents SET deleted = 1 WHERE id = ?1 AND user_id = ?2 AND deleted = 0",
                    params![id, user_id],
                )
                .map_err(|e| AppError::Store(format!("Failed to delete document: {}", e)))?;
            Ok(changed > 0)
        })
        .await
    }

    /// The user's live documents, oldest first.
    pub async fn list_documents(&self, user_id: &str) -> AppResult<Vec<StoredDocument>> {
        let user_id = user_id.to_string();
        with_connection(&self.conn, move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, filename, doc_type, length(extracted_text), embedding IS NOT NULL, created_at
                     FROM documents WHERE user_id = ?1 AND deleted = 0 ORDER BY rowid",
                )
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map(params![user_id], |row| {
                    let created_at: String = row.get(6)?;
                    Ok(StoredDocument {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        filename: row.get(2)?,
                        doc_type: row.get(3)?,
                        text_chars: row.get::<_, i64>(4)? as usize,
                        has_embedding: row.get(5)?,
                        created_at: parse_timestamp(&created_at),
                    })
                })
                .map_err(|e| AppError::Store(format!("Failed to list documents: {}", e)))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to read document row: {}", e)))
        })
        .await
    }

    /// Live documents for the user.
    pub async fn count_documents(&self, user_id: &str) -> AppResult<u64> {
        self.count(
            user_id,
            "SELECT COUNT(*) FROM documents WHERE user_id = ?1 AND deleted = 0",
        )
        .await
    }

    /// Documents for the user that carry an embedding, deleted ones included.
    pub async fn count_embedded_documents(&self, user_id: &str) -> AppResult<u64> {
        self.count(
            user_id,
            "SELECT COUNT(*) FROM documents WHERE user_id = ?1 AND embedding IS NOT NULL",
        )
        .await
    }

    /// Page estimate across live documents: one page per 3000 characters.
    pub async fn total_pages(&self, user_id: &str) -> AppResult<u64> {
        self.count(
            user_id,
            "SELECT COALESCE(SUM((length(extracted_text) + 2999) / 3000), 0)
             FROM documents WHERE user_id = ?1 AND deleted = 0",
        )
        .await
    }

    async fn count(&self, user_id: &str, sql: &'static str) -> AppResult<u64> {
        let user_id = user_id.to_string();
        with_connection(&self.conn, move |conn| {
            conn.query_row(sql, params![user_id], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(|e| AppError::Store(format!("Failed to count documents: {}", e)))
        })
        .await
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_by_embedding_similarity(
        &self,
        user_id: &str,
        embedding: &[f32],
        exclude_deleted: bool,
        limit: usize,
    ) -> AppResult<Vec<CandidateDocument>> {
        let user_id = user_id.to_string();
        let query_embedding = embedding.to_vec();

        with_connection(&self.conn, move |conn| {
            let sql = if exclude_deleted {
                "SELECT id, filename, extracted_text, doc_type, embedding FROM documents
                 WHERE user_id = ?1 AND embedding IS NOT NULL AND deleted = 0 ORDER BY rowid"
            } else {
                "SELECT id, filename, extracted_text, doc_type, embedding FROM documents
                 WHERE user_id = ?1 AND embedding IS NOT NULL ORDER BY rowid"
            };

            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map(params![user_id], |row| {
                    let bytes: Vec<u8> = row.get(4)?;
                    Ok((
                        CandidateDocument {
                            id: row.get(0)?,
                            filename: row.get(1)?,
                            extracted_text: row.get(2)?,
                            doc_type: row.get(3)?,
                            score: 0.0,
                        },
                        bytes,
                    ))
                })
                .map_err(|e| AppError::Store(format!("Failed to query documents: {}", e)))?;

            let mut results = Vec::new();
            for row in rows {
                let (mut doc, bytes) =
                    row.map_err(|e| AppError::Store(format!("Failed to read document row: {}", e)))?;
                let stored = match bytes_to_embedding(&bytes) {
                    Ok(stored) => stored,
                    Err(e) => {
                        tracing::warn!("Skipping document {} with corrupt embedding: {}", doc.id, e);
                        continue;
                    }
                };
                doc.score = cosine_similarity(&query_embedding, &stored) as f64;
                results.push(doc);
            }

            results.sort_by(|a, b| b.score.total_cmp(&a.score));
            results.truncate(limit);

            tracing::debug!("Dense search returned {} documents", results.len());
            Ok(results)
        })
        .await
    }

    async fn find_by_keyword_match(
        &self,
        user_id: &str,
        keywords: &[String],
        exclude_deleted: bool,
        limit: usize,
    ) -> AppResult<Vec<CandidateDocument>> {
        if keywords.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            "SELECT id, filename, extracted_text, doc_type FROM documents WHERE user_id = ?",
        );
        if exclude_deleted {
            sql.push_str(" AND deleted = 0");
        }

        let mut values = vec![Value::Text(user_id.to_string())];
        let clauses: Vec<&str> = keywords
            .iter()
            .map(|_| "unicode_lower(extracted_text) LIKE ? ESCAPE '\\' OR unicode_lower(filename) LIKE ? ESCAPE '\\'")
            .collect();
        for keyword in keywords {
            let pattern = format!("%{}%", escape_like(&keyword.to_lowercase()));
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        sql.push_str(&format!(" AND ({}) ORDER BY rowid LIMIT ?", clauses.join(" OR ")));
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        with_connection(&self.conn, move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok(CandidateDocument {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        extracted_text: row.get(2)?,
                        doc_type: row.get(3)?,
                        score: 0.0,
                    })
                })
                .map_err(|e| AppError::Store(format!("Failed to query documents: {}", e)))?;

            let results = rows
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to read document row: {}", e)))?;

            tracing::debug!("Keyword search returned {} documents", results.len());
            Ok(results)
        })
        .await
    }
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_doc(user: &str, filename: &str, text: &str, embedding: Option<Vec<f32>>) -> NewDocument {
        NewDocument {
            user_id: user.to_string(),
            filename: filename.to_string(),
            doc_type: "text/plain".to_string(),
            extracted_text: text.to_string(),
            embedding,
        }
    }

    fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_open_database_creates_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".knowhub/knowhub.db");
        let conn = open_database(&path).unwrap();
        assert!(path.exists());

        let tables: i64 = conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('documents', 'search_queries')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[tokio::test]
    async fn test_dense_search_ranks_by_similarity() {
        let store = store();
        store
            .insert_document(new_doc("u1", "far.txt", "far", Some(vec![0.0, 1.0, 0.0])))
            .await
            .unwrap();
        store
            .insert_document(new_doc("u1", "near.txt", "near", Some(vec![1.0, 0.1, 0.0])))
            .await
            .unwrap();
        store
            .insert_document(new_doc("u1", "plain.txt", "no vector", None))
            .await
            .unwrap();

        let results = store
            .find_by_embedding_similarity("u1", &[1.0, 0.0, 0.0], true, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].filename, "near.txt");
        assert!(results[0].score > results[1].score);

        let limited = store
            .find_by_embedding_similarity("u1", &[1.0, 0.0, 0.0], true, 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_searches_scoped_to_user_and_live_documents() {
        let store = store();
        let mine = store
            .insert_document(new_doc("u1", "budget.txt", "Budget draft", Some(vec![1.0, 0.0])))
            .await
            .unwrap();
        store
            .insert_document(new_doc("u2", "budget.txt", "Budget final", Some(vec![1.0, 0.0])))
            .await
            .unwrap();

        let keywords = vec!["budget".to_string()];
        let sparse = store.find_by_keyword_match("u1", &keywords, true, 5).await.unwrap();
        assert_eq!(sparse.len(), 1);
        assert_eq!(sparse[0].id, mine);

        assert!(store.soft_delete("u1", &mine).await.unwrap());
        assert!(!store.soft_delete("u1", &mine).await.unwrap());

        assert!(store.find_by_keyword_match("u1", &keywords, true, 5).await.unwrap().is_empty());
        assert!(store
            .find_by_embedding_similarity("u1", &[1.0, 0.0], true, 5)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.find_by_keyword_match("u1", &keywords, false, 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_keyword_match_is_case_insensitive_on_text_and_filename() {
        let store = store();
        store
            .insert_document(new_doc("u1", "Invoice-2024.txt", "Paid in full.", None))
            .await
            .unwrap();
        store
            .insert_document(new_doc("u1", "notes.txt", "The REPORT was prepared late.", None))
            .await
            .unwrap();
        store
            .insert_document(new_doc("u1", "misc.txt", "Nothing relevant.", None))
            .await
            .unwrap();

        let keywords = vec!["invoice".to_string(), "report".to_string()];
        let results = store.find_by_keyword_match("u1", &keywords, true, 5).await.unwrap();
        let names: Vec<&str> = results.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["Invoice-2024.txt", "notes.txt"]);
        assert!(results.iter().all(|d| d.score == 0.0));

        let limited = store.find_by_keyword_match("u1", &keywords, true, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_keyword_match_folds_non_ascii_case() {
        let store = store();
        store
            .insert_document(new_doc("u1", "bericht.txt", "ÜBERSICHT der Ausgaben", None))
            .await
            .unwrap();
        store
            .insert_document(new_doc("u1", "ÄRGER.txt", "Beschwerden", None))
            .await
            .unwrap();

        let keywords = crate::keywords::extract_keywords("Übersicht");
        assert_eq!(keywords, vec!["übersicht"]);
        let results = store.find_by_keyword_match("u1", &keywords, true, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "bericht.txt");

        let keywords = vec!["ärger".to_string()];
        let results = store.find_by_keyword_match("u1", &keywords, true, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "ÄRGER.txt");
    }

    #[tokio::test]
    async fn test_keyword_match_with_unbounded_limit() {
        let store = store();
        for i in 0..3 {
            store
                .insert_document(new_doc("u1", &format!("r{}.txt", i), "quarterly report", None))
                .await
                .unwrap();
        }

        let keywords = vec!["report".to_string()];
        let results = store
            .find_by_keyword_match("u1", &keywords, true, usize::MAX)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_like_wildcards_are_literal() {
        let store = store();
        store
            .insert_document(new_doc("u1", "a.txt", "growth of 100% this year", None))
            .await
            .unwrap();
        store
            .insert_document(new_doc("u1", "b.txt", "growth of 1000 units", None))
            .await
            .unwrap();

        let results = store
            .find_by_keyword_match("u1", &["100%".to_string()], true, 5)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "a.txt");
    }

    #[tokio::test]
    async fn test_empty_keywords_skip_query() {
        let store = store();
        store
            .insert_document(new_doc("u1", "a.txt", "text", None))
            .await
            .unwrap();
        assert!(store.find_by_keyword_match("u1", &[], true, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts_and_listing() {
        let store = store();
        store
            .insert_document(new_doc("u1", "a.txt", &"a".repeat(3001), Some(vec![1.0])))
            .await
            .unwrap();
        let b = store
            .insert_document(new_doc("u1", "b.txt", "short", None))
            .await
            .unwrap();
        store.soft_delete("u1", &b).await.unwrap();

        assert_eq!(store.count_documents("u1").await.unwrap(), 1);
        assert_eq!(store.count_embedded_documents("u1").await.unwrap(), 1);
        assert_eq!(store.total_pages("u1").await.unwrap(), 2);
        assert_eq!(store.count_documents("nobody").await.unwrap(), 0);

        let listed = store.list_documents("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "a.txt");
        assert_eq!(listed[0].text_chars, 3001);
        assert!(listed[0].has_embedding);
    }

    #[test]
    fn test_embedding_bytes_roundtrip_and_corruption() {
        let bytes = embedding_to_bytes(&[0.5, -1.25]);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![0.5, -1.25]);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
