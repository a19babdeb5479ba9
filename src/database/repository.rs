/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use std::collections::HashMap;

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{DocumentRecord, DocumentSummary, ItemRecord};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Insert a document and its items in one transaction
    pub async fn insert_document(&self, document: &DocumentRecord, items: &[ItemRecord]) -> Result<()> {
        let document = document.clone();
        let items = items.to_vec();

        self.db
            .transaction_async(move |tx| {
                tx.execute(
                    "INSERT INTO documents (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
                    params![document.id, document.name, document.created_at, document.updated_at],
                )?;

                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO items (id, document_id, position, content, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )?;

                for item in &items {
                    stmt.execute(params![
                        item.id,
                        item.document_id,
                        item.position,
                        item.content,
                        item.updated_at,
                    ])?;
                }

                debug!("Inserted document {} with {} item(s)", document.id, items.len());
                Ok(())
            })
            .await
    }

    /// Get a document by ID
    pub async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        let document_id = document_id.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT id, name, created_at, updated_at FROM documents WHERE id = ?1",
                        [&document_id],
                        parse_document_row,
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// List all documents with their item counts, newest first
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT d.id, d.name, d.created_at, d.updated_at, COUNT(i.id)
                    FROM documents d
                    LEFT JOIN items i ON i.document_id = d.id
                    GROUP BY d.id
                    ORDER BY d.created_at DESC, d.name
                    "#,
                )?;

                let documents = stmt
                    .query_map([], |row| {
                        Ok(DocumentSummary {
                            document: parse_document_row(row)?,
                            item_count: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(documents)
            })
            .await
    }

    // =========================================================================
    // Item Operations
    // =========================================================================

    /// List the items of a document in position order
    pub async fn list_items(&self, document_id: &str) -> Result<Vec<ItemRecord>> {
        let document_id = document_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, document_id, position, content, updated_at
                    FROM items
                    WHERE document_id = ?1
                    ORDER BY position, id
                    "#,
                )?;

                let items = stmt
                    .query_map([&document_id], parse_item_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(items)
            })
            .await
    }

    /// Get an item by ID
    pub async fn get_item(&self, item_id: &str) -> Result<Option<ItemRecord>> {
        let item_id = item_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_item_sync(conn, &item_id))
            .await
    }

    /// Get an item by ID (synchronous version for use within transactions)
    fn get_item_sync(conn: &Connection, item_id: &str) -> Result<Option<ItemRecord>> {
        let result = conn
            .query_row(
                "SELECT id, document_id, position, content, updated_at FROM items WHERE id = ?1",
                [item_id],
                parse_item_row,
            )
            .optional()?;

        Ok(result)
    }

    /// Insert a single item
    pub async fn add_item(&self, item: &ItemRecord) -> Result<()> {
        let item = item.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO items (id, document_id, position, content, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![item.id, item.document_id, item.position, item.content, item.updated_at],
                )?;
                Ok(())
            })
            .await
    }

    /// Replace the content of an item
    pub async fn update_item_content(&self, item_id: &str, content: &str) -> Result<()> {
        let item_id = item_id.to_string();
        let content = content.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE items SET content = ?1, updated_at = ?2 WHERE id = ?3",
                    params![content, now, item_id],
                )?;

                if changed == 0 {
                    return Err(anyhow::anyhow!("Item not found: {}", item_id));
                }
                Ok(())
            })
            .await
    }

    /// Move an item to another position
    pub async fn update_item_position(&self, item_id: &str, position: i64) -> Result<()> {
        let item_id = item_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE items SET position = ?1 WHERE id = ?2",
                    params![position, item_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Delete an item; its metadata goes with it
    pub async fn delete_item(&self, item_id: &str) -> Result<()> {
        let item_id = item_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute("DELETE FROM items WHERE id = ?1", [&item_id])?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Metadata Operations
    // =========================================================================

    /// Read all metadata of an item under one namespace
    pub async fn read_metadata(&self, item_id: &str, namespace: &str) -> Result<HashMap<String, String>> {
        let item_id = item_id.to_string();
        let namespace = namespace.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT key, value FROM item_metadata WHERE item_id = ?1 AND namespace = ?2",
                )?;

                let entries = stmt
                    .query_map(params![item_id, namespace], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<rusqlite::Result<HashMap<_, _>>>()?;

                Ok(entries)
            })
            .await
    }

    /// Apply metadata updates to one item atomically
    ///
    /// A `None` value deletes the key.
    pub async fn write_metadata(
        &self,
        item_id: &str,
        namespace: &str,
        updates: &[(String, Option<String>)],
    ) -> Result<()> {
        let batch = vec![(item_id.to_string(), updates.to_vec())];
        self.write_metadata_many(namespace, batch).await
    }

    /// Apply metadata updates to several items in one transaction
    pub async fn write_metadata_many(
        &self,
        namespace: &str,
        batch: Vec<(String, Vec<(String, Option<String>)>)>,
    ) -> Result<()> {
        let namespace = namespace.to_string();

        self.db
            .transaction_async(move |tx| {
                let mut upsert = tx.prepare(
                    r#"
                    INSERT INTO item_metadata (item_id, namespace, key, value)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(item_id, namespace, key) DO UPDATE SET value = excluded.value
                    "#,
                )?;
                let mut delete = tx.prepare(
                    "DELETE FROM item_metadata WHERE item_id = ?1 AND namespace = ?2 AND key = ?3",
                )?;

                for (item_id, updates) in &batch {
                    if Self::get_item_sync(tx, item_id)?.is_none() {
                        return Err(anyhow::anyhow!("Item not found: {}", item_id));
                    }

                    for (key, value) in updates {
                        match value {
                            Some(value) => {
                                upsert.execute(params![item_id, namespace, key, value])?;
                            }
                            None => {
                                delete.execute(params![item_id, namespace, key])?;
                            }
                        }
                    }
                }

                Ok(())
            })
            .await
    }
}

fn parse_document_row(row: &rusqlite::Row) -> rusqlite::Result<DocumentRecord> {
    Ok(DocumentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn parse_item_row(row: &rusqlite::Row) -> rusqlite::Result<ItemRecord> {
    Ok(ItemRecord {
        id: row.get(0)?,
        document_id: row.get(1)?,
        position: row.get(2)?,
        content: row.get(3)?,
        updated_at: row.get(4)?,
    })
}
