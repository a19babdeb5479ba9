/*!
 * Batch job lifecycle.
 *
 * This module drives one remote job from request file to ordered results:
 * upload, create, notify the caller, poll, download, parse and reassemble.
 * Any fatal condition is caught here and reported once.
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};

use crate::errors::{BatchError, ProviderError};
use crate::providers::{BatchJob, BatchProvider, BatchStatus};

use super::poller::{JobPoller, PollSettings, StatusObserver};
use super::request::RequestTemplate;
use super::results::{parse_result_stream, reassemble};

/// Name of the uploaded request file
const REQUEST_FILE_NAME: &str = "batch.jsonl";

/// Hooks invoked during a batch call
#[async_trait]
pub trait JobHooks: Send + Sync {
    /// Called once the remote job exists, before any polling
    ///
    /// An error is logged and otherwise ignored.
    async fn on_job_created(&self, job_id: &str) -> Result<()>;
}

/// Hooks that do nothing
pub struct NoHooks;

#[async_trait]
impl JobHooks for NoHooks {
    async fn on_job_created(&self, _job_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Result of `BatchClient::submit_batch`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Remote job id, `None` when the call failed
    pub job_id: Option<String>,
    /// One entry per input item, empty when the call failed
    pub results: Vec<String>,
    /// Consolidated error message of a failed call
    pub error: Option<String>,
}

impl BatchOutcome {
    fn failed(message: String) -> Self {
        Self {
            job_id: None,
            results: Vec::new(),
            error: Some(message),
        }
    }

    /// Whether the job completed and results were collected
    pub fn is_success(&self) -> bool {
        self.job_id.is_some()
    }
}

/// Results of an existing job, keyed by request index
#[derive(Debug, Clone)]
pub struct ResumedJob {
    /// Final job state
    pub job: BatchJob,
    /// Request index -> translated text
    pub results: HashMap<usize, String>,
}

/// Client for the remote batch lifecycle
#[derive(Clone)]
pub struct BatchClient {
    provider: Arc<dyn BatchProvider>,
    template: RequestTemplate,
    poll: PollSettings,
    observer: Option<Arc<StatusObserver>>,
}

impl BatchClient {
    /// Create a new batch client
    pub fn new(provider: Arc<dyn BatchProvider>, template: RequestTemplate, poll: PollSettings) -> Self {
        Self {
            provider,
            template,
            poll,
            observer: None,
        }
    }

    /// Report every polled job state to `observer`
    pub fn with_status_observer(mut self, observer: Arc<StatusObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Translate `items` as one remote job
    ///
    /// `hooks.on_job_created` runs as soon as the job id is known. On any
    /// fatal error the outcome carries no job id, no results and a single
    /// error message.
    pub async fn submit_batch(&self, items: &[String], hooks: &dyn JobHooks) -> BatchOutcome {
        match self.run_batch(items, hooks).await {
            Ok((job_id, results)) => {
                info!("Batch {} returned {} result(s)", job_id, results.len());
                BatchOutcome {
                    job_id: Some(job_id),
                    results,
                    error: None,
                }
            }
            Err(e) => {
                error!("Batch translation failed: {}", e);
                BatchOutcome::failed(e.to_string())
            }
        }
    }

    async fn run_batch(&self, items: &[String], hooks: &dyn JobHooks) -> Result<(String, Vec<String>), BatchError> {
        if items.is_empty() {
            return Err(BatchError::EmptyInput);
        }

        let payload = self
            .template
            .encode(items)
            .map_err(|e| BatchError::Upload(ProviderError::RequestFailed(e.to_string())))?;

        let file = self
            .provider
            .upload_file(REQUEST_FILE_NAME, payload.into_bytes())
            .await
            .map_err(BatchError::Upload)?;

        let job = self
            .provider
            .create_batch(&file.id)
            .await
            .map_err(BatchError::JobCreation)?;

        info!("Created batch {} for {} item(s)", job.id, items.len());

        if let Err(e) = hooks.on_job_created(&job.id).await {
            warn!("Job-created hook failed for batch {}: {:#}", job.id, e);
        }

        let resumed = self.collect_results(&job.id).await?;
        Ok((job.id, reassemble(&resumed.results, items.len())))
    }

    /// Wait for an existing job and collect its results by request index
    pub async fn resume_job(&self, job_id: &str) -> Result<ResumedJob, BatchError> {
        self.collect_results(job_id).await
    }

    async fn collect_results(&self, job_id: &str) -> Result<ResumedJob, BatchError> {
        let poller = JobPoller::new(self.provider.as_ref(), self.poll);
        let job = poller
            .wait_for_terminal(job_id, self.observer.as_deref())
            .await?;

        if job.batch_status() != BatchStatus::Completed {
            return Err(BatchError::JobUnsuccessful {
                job_id: job.id.clone(),
                status: job.status.clone(),
            });
        }

        let results = match (&job.output_file_id, &job.error_file_id) {
            (Some(file_id), _) => {
                let content = self
                    .provider
                    .download_file(file_id)
                    .await
                    .map_err(BatchError::Download)?;
                parse_result_stream(&content)?
            }
            (None, Some(error_file_id)) => {
                warn!(
                    "Batch {} produced no successful results (errors in {})",
                    job.id, error_file_id
                );
                HashMap::new()
            }
            (None, None) => return Err(BatchError::MissingOutput(job.id.clone())),
        };

        Ok(ResumedJob { job, results })
    }
}
