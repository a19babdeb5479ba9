/*!
 * Recovery of batch jobs left unfinished by an earlier run.
 *
 * Items still flagged `queued` are grouped by the job they were submitted
 * under. Each group can be resumed (re-poll that exact job and apply its
 * results by stored request index) or abandoned (clear the flags).
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info};

use crate::document::{Document, DocumentStore, TranslationItem};
use crate::errors::SessionError;
use crate::translation::BatchClient;

use super::apply::{apply_results, ApplyOptions, ApplyReport};
use super::flags::ItemFlagStore;
use super::registry::ActiveJobRegistry;

/// An item waiting on a job, with its request index in that job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    pub item: TranslationItem,
    pub batch_index: usize,
}

/// One unfinished job and the items still waiting on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    pub document_id: String,
    pub job_id: String,
    pub items: Vec<PendingItem>,
}

/// What the user wants done with unfinished jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryChoice {
    /// Re-poll the jobs and apply their results
    Resume,
    /// Forget the jobs and start over
    Abandon,
    /// Leave everything as it is
    Cancel,
}

/// Asks how to handle one unfinished job
#[async_trait]
pub trait RecoveryPrompt: Send + Sync {
    async fn choose(&self, document: &Document, job: &PendingJob) -> Result<RecoveryChoice>;
}

/// A prompt that gives the same answer for every job
#[derive(Debug, Clone, Copy)]
pub struct FixedChoice(pub RecoveryChoice);

#[async_trait]
impl RecoveryPrompt for FixedChoice {
    async fn choose(&self, _document: &Document, _job: &PendingJob) -> Result<RecoveryChoice> {
        Ok(self.0)
    }
}

/// Result of resuming one job
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    /// The job finished and its results were applied
    Applied { job_id: String, report: ApplyReport },
    /// The job is already polled by this process
    AlreadyMonitored { job_id: String },
    /// The job could not be completed; its items stay queued
    Failed { job_id: String, error: String },
}

impl ResumeOutcome {
    pub fn job_id(&self) -> &str {
        match self {
            Self::Applied { job_id, .. } | Self::AlreadyMonitored { job_id } | Self::Failed { job_id, .. } => job_id,
        }
    }
}

/// Finds, resumes and abandons unfinished jobs
#[derive(Clone)]
pub struct RecoveryCoordinator {
    store: Arc<dyn DocumentStore>,
    flags: ItemFlagStore,
    registry: ActiveJobRegistry,
    client: BatchClient,
    options: ApplyOptions,
}

impl RecoveryCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        flags: ItemFlagStore,
        registry: ActiveJobRegistry,
        client: BatchClient,
        options: ApplyOptions,
    ) -> Self {
        Self {
            store,
            flags,
            registry,
            client,
            options,
        }
    }

    /// Group the in-flight items of a document by job, in first-seen order
    pub async fn scan(&self, document_id: &str) -> Result<Vec<PendingJob>, SessionError> {
        let items = self.store.list_items(document_id).await?;
        let mut jobs: Vec<PendingJob> = Vec::new();
        let mut by_job: HashMap<String, usize> = HashMap::new();

        for item in items {
            let flags = self.flags.read_flags(&item.id).await?;
            if !flags.is_in_flight() {
                continue;
            }

            // in flight implies both are present
            let (Some(job_id), Some(batch_index)) = (flags.batch_id, flags.batch_index) else {
                continue;
            };

            let slot = *by_job.entry(job_id.clone()).or_insert_with(|| {
                jobs.push(PendingJob {
                    document_id: document_id.to_string(),
                    job_id,
                    items: Vec::new(),
                });
                jobs.len() - 1
            });
            jobs[slot].items.push(PendingItem { item, batch_index });
        }

        if !jobs.is_empty() {
            info!(
                "Found {} unfinished batch job(s) in document {}",
                jobs.len(),
                document_id
            );
        }
        Ok(jobs)
    }

    /// Re-poll one job and apply its results by stored request index
    pub async fn resume(&self, job: &PendingJob) -> ResumeOutcome {
        let Some(_guard) = self.registry.guard(&job.job_id) else {
            info!("Batch {} is already being monitored", job.job_id);
            return ResumeOutcome::AlreadyMonitored {
                job_id: job.job_id.clone(),
            };
        };

        match self.resume_guarded(job).await {
            Ok(report) => {
                info!(
                    "Resumed batch {}: {} applied, {} warning(s)",
                    job.job_id,
                    report.applied.len(),
                    report.warnings.len()
                );
                ResumeOutcome::Applied {
                    job_id: job.job_id.clone(),
                    report,
                }
            }
            Err(e) => {
                error!("Could not resume batch {}: {}", job.job_id, e);
                ResumeOutcome::Failed {
                    job_id: job.job_id.clone(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn resume_guarded(&self, job: &PendingJob) -> Result<ApplyReport, SessionError> {
        let document = self
            .store
            .get_document(&job.document_id)
            .await?
            .ok_or_else(|| SessionError::DocumentNotFound(job.document_id.clone()))?;

        let resumed = self
            .client
            .resume_job(&job.job_id)
            .await
            .map_err(|e| SessionError::BatchFailed(e.to_string()))?;

        let mut report = ApplyReport::default();
        let mut pairs = Vec::with_capacity(job.items.len());

        for pending in &job.items {
            // Flags are re-read: the item may have been abandoned or deleted since the scan
            let Some(item) = self.store.get_item(&pending.item.id).await? else {
                report.warn(&pending.item.id, "item no longer exists");
                continue;
            };
            let flags = self.flags.read_flags(&item.id).await?;
            if !flags.is_queued_under(&job.job_id) {
                debug!("Item {} is no longer queued in batch {}", item.id, job.job_id);
                continue;
            }
            let Some(index) = flags.batch_index else {
                continue;
            };

            let text = resumed.results.get(&index).cloned().unwrap_or_default();
            pairs.push((item, text));
        }

        let applied = apply_results(self.store.as_ref(), &self.flags, &document, pairs, &self.options).await;
        report.merge(applied);
        Ok(report)
    }

    /// Resume several jobs concurrently; each job fails on its own
    pub async fn resume_all(&self, jobs: &[PendingJob]) -> Vec<ResumeOutcome> {
        join_all(jobs.iter().map(|job| self.resume(job))).await
    }

    /// Clear the flags of every item in `jobs`, returns how many were cleared
    pub async fn abandon(&self, jobs: &[PendingJob]) -> Result<usize, SessionError> {
        let mut cleared = 0;
        for job in jobs {
            for pending in &job.items {
                self.flags.clear_flags(&pending.item.id).await?;
                cleared += 1;
            }
            info!("Abandoned batch {} ({} item(s))", job.job_id, job.items.len());
        }
        Ok(cleared)
    }
}
