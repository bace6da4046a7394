//! Plain-text document ingestion for the CLI.
//!
//! Each file becomes one document. Text is embedded with the configured
//! provider; when embedding fails the document is still stored, without a
//! vector, so keyword search can find it.

use crate::embeddings::EmbeddingProvider;
use crate::store::SqliteDocumentStore;
use crate::types::NewDocument;
use knowhub_core::{AppError, AppResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Document type recorded for a file, by extension.
pub fn doc_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md") | Some("markdown") => "text/markdown",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("html") | Some("htm") => "text/html",
        _ => "text/plain",
    }
}

/// Outcome of ingesting one file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedDocument {
    pub id: String,
    pub filename: String,
    pub path: PathBuf,
    pub text_chars: usize,
    pub embedded: bool,
}

pub struct DocumentIngestor {
    store: SqliteDocumentStore,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl DocumentIngestor {
    pub fn new(store: SqliteDocumentStore, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Ingest a file, or every file under a directory.
    ///
    /// Unreadable or binary files inside a directory are skipped with a
    /// warning; a single unreadable file is an error.
    pub async fn ingest_path(&self, user_id: &str, path: &Path) -> AppResult<Vec<IngestedDocument>> {
        if path.is_file() {
            return Ok(vec![self.ingest_file(user_id, path).await?]);
        }

        if !path.is_dir() {
            return Err(AppError::InvalidInput(format!("No such file or directory: {:?}", path)));
        }

        let mut ingested = Vec::new();
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            match self.ingest_file(user_id, entry.path()).await {
                Ok(doc) => ingested.push(doc),
                Err(e) => tracing::warn!("Skipping {:?}: {}", entry.path(), e),
            }
        }

        tracing::info!("Ingested {} documents from {:?}", ingested.len(), path);
        Ok(ingested)
    }

    pub async fn ingest_file(&self, user_id: &str, path: &Path) -> AppResult<IngestedDocument> {
        let text = read_text(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let (id, embedded) = self
            .ingest_text(user_id, &filename, doc_type_for(path), &text)
            .await?;

        Ok(IngestedDocument {
            id,
            filename,
            path: path.to_path_buf(),
            text_chars: text.chars().count(),
            embedded,
        })
    }

    /// Store `text` as a document. Returns the id and whether it was embedded.
    pub async fn ingest_text(
        &self,
        user_id: &str,
        filename: &str,
        doc_type: &str,
        text: &str,
    ) -> AppResult<(String, bool)> {
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(format!("{} has no text", filename)));
        }

        let embedding = match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                tracing::warn!(
                    "Embedding failed for {}, storing without a vector: {}",
                    filename,
                    e
                );
                None
            }
        };
        let embedded = embedding.is_some();

        let id = self
            .store
            .insert_document(NewDocument {
                user_id: user_id.to_string(),
                filename: filename.to_string(),
                doc_type: doc_type.to_string(),
                extracted_text: text.to_string(),
                embedding,
            })
            .await?;

        tracing::debug!("Stored {} as {} (embedded: {})", filename, id, embedded);
        Ok((id, embedded))
    }
}

fn read_text(path: &Path) -> AppResult<String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::InvalidInput(format!("Failed to read {:?} as text: {}", path, e)))?;

    if raw.contains('\0') {
        return Err(AppError::InvalidInput(format!("Binary file not supported: {:?}", path)));
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::store::{open_in_memory, DocumentStore};
    use crate::tests::fakes::FailingEmbedder;
    use tempfile::TempDir;

    fn ingestor(embedder: Arc<dyn EmbeddingProvider>) -> (DocumentIngestor, SqliteDocumentStore) {
        let store = SqliteDocumentStore::new(open_in_memory().unwrap());
        (DocumentIngestor::new(store.clone(), embedder), store)
    }

    #[test]
    fn test_doc_type_for() {
        assert_eq!(doc_type_for(Path::new("notes.md")), "text/markdown");
        assert_eq!(doc_type_for(Path::new("report.txt")), "text/plain");
        assert_eq!(doc_type_for(Path::new("README")), "text/plain");
    }

    #[tokio::test]
    async fn test_ingest_file_embeds() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("report.txt");
        fs::write(&path, "Prepared by Jane Doe, Analyst.").unwrap();

        let (ingestor, store) = ingestor(Arc::new(MockProvider::new(64)));
        let doc = ingestor.ingest_file("u1", &path).await.unwrap();
        assert_eq!(doc.filename, "report.txt");
        assert!(doc.embedded);

        let listed = store.list_documents("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].has_embedding);
    }

    #[tokio::test]
    async fn test_embedding_failure_stores_without_vector() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("budget.txt");
        fs::write(&path, "Budget approved for Q3.").unwrap();

        let (ingestor, store) = ingestor(Arc::new(FailingEmbedder));
        let doc = ingestor.ingest_file("u1", &path).await.unwrap();
        assert!(!doc.embedded);

        let found = store
            .find_by_keyword_match("u1", &["budget".to_string()], true, 3)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.count_embedded_documents("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_directory_skips_bad_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "Alpha text").unwrap();
        fs::write(temp.path().join("b.md"), "# Beta").unwrap();
        fs::write(temp.path().join("empty.txt"), "   ").unwrap();
        fs::write(temp.path().join("blob.bin"), [0u8, 159, 146, 150]).unwrap();

        let (ingestor, store) = ingestor(Arc::new(MockProvider::new(64)));
        let docs = ingestor.ingest_path("u1", temp.path()).await.unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.md"]);
        assert_eq!(store.count_documents("u1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_path() {
        let (ingestor, _) = ingestor(Arc::new(MockProvider::new(64)));
        let err = ingestor
            .ingest_path("u1", Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
