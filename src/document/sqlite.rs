/*!
 * SQLite-backed document store.
 */

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::database::models::{DocumentRecord, ItemRecord};
use crate::database::Repository;

use super::{ContentPlacement, Document, DocumentStore, DocumentSummary, MetadataUpdates, TranslationItem};

/// Document store over the local database
#[derive(Clone)]
pub struct SqliteDocumentStore {
    repo: Repository,
}

impl SqliteDocumentStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Store over a fresh in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(Repository::new_in_memory()?))
    }

    /// Get the underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

impl From<DocumentRecord> for Document {
    fn from(record: DocumentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

impl From<ItemRecord> for TranslationItem {
    fn from(record: ItemRecord) -> Self {
        Self {
            id: record.id,
            document_id: record.document_id,
            position: record.position,
            content: record.content,
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_document(&self, name: &str, contents: &[Option<String>]) -> Result<Document> {
        let document = DocumentRecord::new(name);
        let items: Vec<ItemRecord> = contents
            .iter()
            .enumerate()
            .map(|(position, content)| ItemRecord::new(&document.id, position as i64, content.clone()))
            .collect();

        self.repo
            .insert_document(&document, &items)
            .await
            .with_context(|| format!("Failed to create document '{}'", name))?;

        Ok(document.into())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self.repo.get_document(document_id).await?.map(Document::from))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let documents = self.repo.list_documents().await?;
        Ok(documents
            .into_iter()
            .map(|summary| DocumentSummary {
                document: summary.document.into(),
                item_count: summary.item_count.max(0) as usize,
            })
            .collect())
    }

    async fn list_items(&self, document_id: &str) -> Result<Vec<TranslationItem>> {
        let items = self.repo.list_items(document_id).await?;
        Ok(items.into_iter().map(TranslationItem::from).collect())
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<TranslationItem>> {
        Ok(self.repo.get_item(item_id).await?.map(TranslationItem::from))
    }

    async fn add_item(&self, document_id: &str, position: i64, content: &str) -> Result<TranslationItem> {
        let record = ItemRecord::new(document_id, position, Some(content.to_string()));
        self.repo.add_item(&record).await?;
        Ok(record.into())
    }

    async fn apply_content(&self, item_id: &str, text: &str, placement: ContentPlacement) -> Result<()> {
        let item = self
            .repo
            .get_item(item_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Item not found: {}", item_id))?;

        let content = placement.combine(item.content.as_deref(), text);
        self.repo.update_item_content(item_id, &content).await
    }

    async fn read_metadata(&self, item_id: &str, namespace: &str) -> Result<HashMap<String, String>> {
        self.repo.read_metadata(item_id, namespace).await
    }

    async fn write_metadata(&self, item_id: &str, namespace: &str, updates: &[(String, Option<String>)]) -> Result<()> {
        self.repo.write_metadata(item_id, namespace, updates).await
    }

    async fn write_metadata_many(&self, namespace: &str, batch: Vec<(String, MetadataUpdates)>) -> Result<()> {
        self.repo.write_metadata_many(namespace, batch).await
    }
}
