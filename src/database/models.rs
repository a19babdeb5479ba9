/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};

/// Document record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique document identifier (UUID)
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl DocumentRecord {
    /// Create a new document record with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Item record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Unique item identifier (UUID)
    pub id: String,
    /// Owning document
    pub document_id: String,
    /// Position inside the document
    pub position: i64,
    /// Text content, absent for empty placeholders
    pub content: Option<String>,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl ItemRecord {
    /// Create a new item record with a fresh id
    pub fn new(document_id: impl Into<String>, position: i64, content: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            position,
            content,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Document listing row with item count
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub document: DocumentRecord,
    pub item_count: i64,
}
