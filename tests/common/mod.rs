/*!
 * Common test utilities for the batchwai test suite
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use batchwai::database::{DatabaseConnection, Repository};
use batchwai::document::{Document, DocumentStore, SqliteDocumentStore, TranslationItem};
use batchwai::providers::BatchProvider;
use batchwai::translation::results::success_line;
use batchwai::translation::{BatchClient, PollSettings, RequestTemplate};
use tempfile::TempDir;

/// Route library logs to the test output; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Store over a fresh in-memory database
pub fn memory_store() -> Arc<SqliteDocumentStore> {
    Arc::new(SqliteDocumentStore::new_in_memory().expect("Failed to create in-memory store"))
}

/// Store over a database file, reopened on every call like a new process would
pub fn file_store(path: &Path) -> Arc<SqliteDocumentStore> {
    let db = DatabaseConnection::new(path).expect("Failed to open database file");
    Arc::new(SqliteDocumentStore::new(Repository::new(db)))
}

/// Creates a document with one item per text and returns it with its items
pub async fn create_document(store: &dyn DocumentStore, texts: &[&str]) -> (Document, Vec<TranslationItem>) {
    let contents: Vec<Option<String>> = texts.iter().map(|t| Some(t.to_string())).collect();
    let document = store
        .create_document("Test document", &contents)
        .await
        .expect("Failed to create document");
    let items = store
        .list_items(&document.id)
        .await
        .expect("Failed to list items");
    (document, items)
}

/// Request template without prompts, so user messages are the bare item text
pub fn plain_template() -> RequestTemplate {
    RequestTemplate {
        model: "test-model".to_string(),
        system_prompt: String::new(),
        prompt: String::new(),
        temperature: None,
    }
}

/// Batch client polling every millisecond
pub fn fast_client(provider: Arc<dyn BatchProvider>) -> BatchClient {
    BatchClient::new(provider, plain_template(), PollSettings::new(Duration::from_millis(1), 20))
}

/// Result file content for `(request index, text)` pairs, in the given order
pub fn result_file(entries: &[(usize, &str)]) -> String {
    entries
        .iter()
        .map(|(index, text)| success_line(&format!("request-{}", index), text))
        .collect::<Vec<_>>()
        .join("\n")
}
