/*!
 * Durable per-item batch flags.
 *
 * Flags live in the item metadata namespace `batchwai` under four keys:
 * `batchId`, `batchIndex`, `queued` and `completed`. Every read goes to the
 * document store; nothing is cached here.
 */

use std::sync::Arc;

use log::debug;

use crate::document::{DocumentStore, MetadataUpdates};
use crate::errors::FlagError;

/// Metadata namespace owned by the batch subsystem
pub const FLAG_NAMESPACE: &str = "batchwai";

pub const KEY_BATCH_ID: &str = "batchId";
pub const KEY_BATCH_INDEX: &str = "batchIndex";
pub const KEY_QUEUED: &str = "queued";
pub const KEY_COMPLETED: &str = "completed";

/// Batch flags of one item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFlags {
    /// Job the item was last submitted under
    pub batch_id: Option<String>,
    /// Request index inside that job
    pub batch_index: Option<usize>,
    /// Submitted, result not applied yet
    pub queued: bool,
    /// Final result applied
    pub completed: bool,
}

impl ItemFlags {
    /// Submitted and still waiting for a result
    pub fn is_in_flight(&self) -> bool {
        self.queued && !self.completed
    }

    /// In flight under `job_id`
    pub fn is_queued_under(&self, job_id: &str) -> bool {
        self.is_in_flight() && self.batch_id.as_deref() == Some(job_id)
    }

    fn from_metadata(metadata: &std::collections::HashMap<String, String>) -> Self {
        let batch_index = metadata
            .get(KEY_BATCH_INDEX)
            .and_then(|value| value.trim().parse::<usize>().ok());
        let batch_id = metadata
            .get(KEY_BATCH_ID)
            .filter(|id| !id.is_empty())
            .cloned();

        // batchIndex and batchId are only meaningful together
        let (batch_id, batch_index) = match (batch_id, batch_index) {
            (Some(id), Some(index)) => (Some(id), Some(index)),
            _ => (None, None),
        };

        // An in-flight item must name a pollable job; without one it is resubmittable
        let completed = is_true(metadata.get(KEY_COMPLETED));
        let queued = is_true(metadata.get(KEY_QUEUED)) && !completed && batch_id.is_some();

        Self {
            batch_id,
            batch_index,
            queued,
            completed,
        }
    }
}

fn is_true(value: Option<&String>) -> bool {
    value.is_some_and(|v| v == "true")
}

fn set(key: &str, value: impl ToString) -> (String, Option<String>) {
    (key.to_string(), Some(value.to_string()))
}

fn queued_updates(job_id: &str, index: usize) -> MetadataUpdates {
    vec![
        set(KEY_BATCH_ID, job_id),
        set(KEY_BATCH_INDEX, index),
        set(KEY_QUEUED, true),
        set(KEY_COMPLETED, false),
    ]
}

/// Reads and writes item flags through a document store
#[derive(Clone)]
pub struct ItemFlagStore {
    store: Arc<dyn DocumentStore>,
}

impl ItemFlagStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read the flags of an item; never-flagged items read as all absent
    pub async fn read_flags(&self, item_id: &str) -> Result<ItemFlags, FlagError> {
        let metadata = self.store.read_metadata(item_id, FLAG_NAMESPACE).await?;
        Ok(ItemFlags::from_metadata(&metadata))
    }

    async fn ensure_claimable(&self, item_id: &str, job_id: &str) -> Result<(), FlagError> {
        let current = self.read_flags(item_id).await?;
        if current.is_in_flight() {
            if let Some(existing) = current.batch_id {
                if existing != job_id {
                    return Err(FlagError::AlreadyQueued {
                        item_id: item_id.to_string(),
                        existing,
                        requested: job_id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Mark an item as submitted under `job_id` at request `index`
    pub async fn mark_queued(&self, item_id: &str, job_id: &str, index: usize) -> Result<(), FlagError> {
        self.ensure_claimable(item_id, job_id).await?;
        self.store
            .write_metadata(item_id, FLAG_NAMESPACE, &queued_updates(job_id, index))
            .await?;
        debug!("Item {} queued in batch {} at index {}", item_id, job_id, index);
        Ok(())
    }

    /// Mark a whole submission, `(item_id, index)` pairs, in one write
    pub async fn mark_queued_all(&self, items: &[(String, usize)], job_id: &str) -> Result<(), FlagError> {
        for (item_id, _) in items {
            self.ensure_claimable(item_id, job_id).await?;
        }

        let batch = items
            .iter()
            .map(|(item_id, index)| (item_id.clone(), queued_updates(job_id, *index)))
            .collect();
        self.store.write_metadata_many(FLAG_NAMESPACE, batch).await?;

        debug!("Queued {} item(s) in batch {}", items.len(), job_id);
        Ok(())
    }

    /// Mark an item's result as applied; the batch id and index stay for audit
    pub async fn mark_completed(&self, item_id: &str) -> Result<(), FlagError> {
        let updates = vec![set(KEY_QUEUED, false), set(KEY_COMPLETED, true)];
        self.store
            .write_metadata(item_id, FLAG_NAMESPACE, &updates)
            .await?;
        Ok(())
    }

    /// Remove all flags of an item
    pub async fn clear_flags(&self, item_id: &str) -> Result<(), FlagError> {
        let updates: MetadataUpdates = [KEY_BATCH_ID, KEY_BATCH_INDEX, KEY_QUEUED, KEY_COMPLETED]
            .iter()
            .map(|key| (key.to_string(), None))
            .collect();
        self.store
            .write_metadata(item_id, FLAG_NAMESPACE, &updates)
            .await?;
        Ok(())
    }
}
