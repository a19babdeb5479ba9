/*!
 * Host document store boundary.
 *
 * Documents are ordered lists of opaque text items. The batch subsystem only
 * reads item text, writes translated text back and keeps its own flags in a
 * per-item metadata namespace. `DocumentStore` is that boundary;
 * `SqliteDocumentStore` is the implementation the binary ships with.
 */

use std::collections::HashMap;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod sqlite;

pub use self::sqlite::SqliteDocumentStore;

/// A document owning translatable items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub name: String,
}

/// Document listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub document: Document,
    pub item_count: usize,
}

/// One unit of translatable content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationItem {
    /// Stable item id
    pub id: String,
    /// Owning document
    pub document_id: String,
    /// Position inside the document, used for display order only
    pub position: i64,
    /// Current text, `None` for an empty placeholder
    pub content: Option<String>,
}

impl TranslationItem {
    /// Text to translate, `None` when the item has no content at all
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// Where a translation is written relative to the original text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPlacement {
    Replace,
    Append,
    Prepend,
}

impl ContentPlacement {
    /// Combine the original content with a translation
    pub fn combine(self, original: Option<&str>, translation: &str) -> String {
        let original = original.unwrap_or_default();
        if original.is_empty() {
            return translation.to_string();
        }

        match self {
            Self::Replace => translation.to_string(),
            Self::Append => format!("{}\n\n{}", original, translation),
            Self::Prepend => format!("{}\n\n{}", translation, original),
        }
    }
}

/// How translated results are applied to a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    /// Overwrite the item text
    #[default]
    Replace,
    /// Keep the original, translation after it
    Append,
    /// Keep the original, translation before it
    Prepend,
    /// Write translations into a sibling document
    NewDocument,
}

impl ApplyMode {
    /// In-place placement, `None` for `NewDocument`
    pub fn placement(self) -> Option<ContentPlacement> {
        match self {
            Self::Replace => Some(ContentPlacement::Replace),
            Self::Append => Some(ContentPlacement::Append),
            Self::Prepend => Some(ContentPlacement::Prepend),
            Self::NewDocument => None,
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::NewDocument => "new-document",
        };
        write!(f, "{}", name)
    }
}

/// Metadata updates for one item: `(key, Some(value))` sets, `(key, None)` deletes
pub type MetadataUpdates = Vec<(String, Option<String>)>;

/// Persistent store of documents, items and item metadata
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with one item per entry, in order
    async fn create_document(&self, name: &str, contents: &[Option<String>]) -> Result<Document>;

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>>;

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;

    /// Items of a document in position order
    async fn list_items(&self, document_id: &str) -> Result<Vec<TranslationItem>>;

    async fn get_item(&self, item_id: &str) -> Result<Option<TranslationItem>>;

    /// Append an item to a document at `position`
    async fn add_item(&self, document_id: &str, position: i64, content: &str) -> Result<TranslationItem>;

    /// Write a translation into an existing item
    async fn apply_content(&self, item_id: &str, text: &str, placement: ContentPlacement) -> Result<()>;

    /// Read the metadata of an item under `namespace`
    async fn read_metadata(&self, item_id: &str, namespace: &str) -> Result<HashMap<String, String>>;

    /// Apply `updates` to one item atomically
    async fn write_metadata(&self, item_id: &str, namespace: &str, updates: &[(String, Option<String>)]) -> Result<()>;

    /// Apply updates to several items
    ///
    /// The default writes item by item; stores that can should override this
    /// with a single transaction.
    async fn write_metadata_many(&self, namespace: &str, batch: Vec<(String, MetadataUpdates)>) -> Result<()> {
        for (item_id, updates) in batch {
            self.write_metadata(&item_id, namespace, &updates).await?;
        }
        Ok(())
    }
}
