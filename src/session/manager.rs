/*!
 * Session manager for the document translation workflow.
 *
 * This module handles:
 * - Checking a document for jobs left unfinished by an earlier run
 * - Selecting the items to translate and refusing overlapping claims
 * - Submitting one batch job and flagging its items as soon as it exists
 * - Writing results back and reporting what was skipped
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::document::{Document, DocumentStore, TranslationItem};
use crate::errors::SessionError;
use crate::translation::{BatchClient, JobHooks};

use super::apply::{apply_results, ApplyOptions, ApplyReport};
use super::flags::ItemFlagStore;
use super::models::{DocumentStatus, ItemView, TranslationReport};
use super::recovery::{RecoveryChoice, RecoveryCoordinator, RecoveryPrompt, ResumeOutcome};
use super::registry::{ActiveJobGuard, ActiveJobRegistry};

/// Hooks for one submission: register the job and flag its items
struct SubmissionHooks<'a> {
    flags: &'a ItemFlagStore,
    registry: &'a ActiveJobRegistry,
    /// `(item_id, request index)` of every submitted item
    targets: &'a [(String, usize)],
    /// Held until the submission returns
    guard: Mutex<Option<ActiveJobGuard>>,
    /// Set once the items carry this job's flags
    claimed: AtomicBool,
}

#[async_trait]
impl<'a> JobHooks for SubmissionHooks<'a> {
    async fn on_job_created(&self, job_id: &str) -> Result<()> {
        match self.registry.guard(job_id) {
            Some(guard) => *self.guard.lock() = Some(guard),
            None => warn!("Batch {} was already registered", job_id),
        }

        self.flags.mark_queued_all(self.targets, job_id).await?;
        self.claimed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Session manager for translating documents through batch jobs
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn DocumentStore>,
    flags: ItemFlagStore,
    registry: ActiveJobRegistry,
    client: BatchClient,
    options: ApplyOptions,
    recovery: RecoveryCoordinator,
    retranslate_completed: bool,
}

impl SessionManager {
    /// Create a session manager sharing `registry` with any other manager in the process
    pub fn new(
        store: Arc<dyn DocumentStore>,
        client: BatchClient,
        options: ApplyOptions,
        registry: ActiveJobRegistry,
    ) -> Self {
        let flags = ItemFlagStore::new(store.clone());
        let recovery = RecoveryCoordinator::new(
            store.clone(),
            flags.clone(),
            registry.clone(),
            client.clone(),
            options.clone(),
        );

        Self {
            store,
            flags,
            registry,
            client,
            options,
            recovery,
            retranslate_completed: false,
        }
    }

    /// Also translate items whose translation was already applied
    pub fn with_retranslate_completed(mut self, retranslate: bool) -> Self {
        self.retranslate_completed = retranslate;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn flags(&self) -> &ItemFlagStore {
        &self.flags
    }

    pub fn registry(&self) -> &ActiveJobRegistry {
        &self.registry
    }

    pub fn recovery(&self) -> &RecoveryCoordinator {
        &self.recovery
    }

    async fn load_document(&self, document_id: &str) -> Result<Document, SessionError> {
        self.store
            .get_document(document_id)
            .await?
            .ok_or_else(|| SessionError::DocumentNotFound(document_id.to_string()))
    }

    // =========================================================================
    // Translation
    // =========================================================================

    /// Translate a document as one batch job
    ///
    /// Each unfinished job found on the document is handled first, as `prompt`
    /// decides for it. A new job is only submitted once every unfinished job
    /// was abandoned. Items with no content, and completed items unless
    /// re-translation is enabled, are not submitted.
    pub async fn translate_document(
        &self,
        document_id: &str,
        prompt: &dyn RecoveryPrompt,
    ) -> Result<TranslationReport, SessionError> {
        let document = self.load_document(document_id).await?;

        let pending = self.recovery.scan(document_id).await?;
        if !pending.is_empty() {
            let mut to_resume = Vec::new();
            let mut to_abandon = Vec::new();
            let mut cancelled = 0;
            for job in pending {
                match prompt.choose(&document, &job).await? {
                    RecoveryChoice::Resume => to_resume.push(job),
                    RecoveryChoice::Abandon => to_abandon.push(job),
                    RecoveryChoice::Cancel => cancelled += 1,
                }
            }

            if !to_abandon.is_empty() {
                self.recovery.abandon(&to_abandon).await?;
            }
            if !to_resume.is_empty() {
                let outcomes = self.recovery.resume_all(&to_resume).await;
                return Ok(TranslationReport::Resumed(outcomes));
            }
            if cancelled > 0 {
                info!("Leaving {} unfinished batch job(s) untouched", cancelled);
                return Ok(TranslationReport::Cancelled {
                    pending_jobs: cancelled,
                });
            }
        }

        let targets = self.select_targets(document_id).await?;
        let texts: Vec<String> = targets
            .iter()
            .map(|item| item.content.clone().unwrap_or_default())
            .collect();
        let indices: Vec<(String, usize)> = targets
            .iter()
            .enumerate()
            .map(|(index, item)| (item.id.clone(), index))
            .collect();

        info!(
            "Submitting {} item(s) of '{}' for translation",
            targets.len(),
            document.name
        );

        let hooks = SubmissionHooks {
            flags: &self.flags,
            registry: &self.registry,
            targets: &indices,
            guard: Mutex::new(None),
            claimed: AtomicBool::new(false),
        };
        let outcome = self.client.submit_batch(&texts, &hooks).await;
        let claimed = hooks.claimed.load(Ordering::SeqCst);
        drop(hooks);

        let Some(job_id) = outcome.job_id else {
            let message = outcome
                .error
                .unwrap_or_else(|| "batch returned no job".to_string());
            return Err(SessionError::BatchFailed(message));
        };

        let submitted = targets.len();
        let report = if claimed {
            let pairs: Vec<(TranslationItem, String)> = targets.into_iter().zip(outcome.results).collect();
            apply_results(self.store.as_ref(), &self.flags, &document, pairs, &self.options).await
        } else {
            // Another job holds these items; its own run applies them
            let mut report = ApplyReport::default();
            for item in &targets {
                report.warn(&item.id, format!("not flagged under batch {}", job_id));
            }
            report
        };

        info!(
            "Batch {}: {} of {} item(s) applied",
            job_id,
            report.applied.len(),
            submitted
        );

        Ok(TranslationReport::Submitted {
            job_id,
            submitted,
            report,
        })
    }

    /// Items to submit, refusing when any of them is still in flight
    async fn select_targets(&self, document_id: &str) -> Result<Vec<TranslationItem>, SessionError> {
        let items = self.store.list_items(document_id).await?;
        let mut targets = Vec::with_capacity(items.len());
        let mut queued = Vec::new();

        for item in items {
            if item.content.is_none() {
                debug!("Skipping item {} without content", item.id);
                continue;
            }

            let flags = self.flags.read_flags(&item.id).await?;
            if flags.is_in_flight() {
                queued.push(item.id);
                continue;
            }
            if flags.completed && !self.retranslate_completed {
                continue;
            }
            targets.push(item);
        }

        if !queued.is_empty() {
            return Err(SessionError::ItemsAlreadyQueued(queued));
        }
        if targets.is_empty() {
            return Err(SessionError::NothingToTranslate);
        }
        Ok(targets)
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Resume every unfinished job of a document
    pub async fn resume_pending(&self, document_id: &str) -> Result<Vec<ResumeOutcome>, SessionError> {
        self.load_document(document_id).await?;
        let pending = self.recovery.scan(document_id).await?;
        Ok(self.recovery.resume_all(&pending).await)
    }

    /// Abandon every unfinished job of a document, returns the number of cleared items
    pub async fn abandon_pending(&self, document_id: &str) -> Result<usize, SessionError> {
        self.load_document(document_id).await?;
        let pending = self.recovery.scan(document_id).await?;
        self.recovery.abandon(&pending).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Items of a document with their flags, in position order
    pub async fn item_views(&self, document_id: &str) -> Result<Vec<ItemView>, SessionError> {
        self.load_document(document_id).await?;
        let items = self.store.list_items(document_id).await?;

        let mut views = Vec::with_capacity(items.len());
        for item in items {
            let flags = self.flags.read_flags(&item.id).await?;
            views.push(ItemView { item, flags });
        }
        Ok(views)
    }

    /// All documents with their in-flight and completed counts
    pub async fn document_statuses(&self) -> Result<Vec<DocumentStatus>, SessionError> {
        let summaries = self.store.list_documents().await?;

        let mut statuses = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let views = self.item_views(&summary.document.id).await?;
            statuses.push(DocumentStatus {
                in_flight: views.iter().filter(|v| v.flags.is_in_flight()).count(),
                completed: views.iter().filter(|v| v.flags.completed).count(),
                summary,
            });
        }
        Ok(statuses)
    }
}
