/*!
 * Fixed-interval job polling.
 *
 * A poll that returns a non-terminal status is followed by one delay and
 * another poll. A poll that could not be made at all aborts immediately.
 */

use std::time::{Duration, Instant};

use log::debug;

use crate::errors::BatchError;
use crate::providers::{BatchJob, BatchProvider};

/// Polling cadence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Delay between two polls
    pub interval: Duration,
    /// Polls allowed before timing out
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }

    pub fn from_config(config: &crate::app_config::BatchConfig) -> Self {
        Self::new(config.poll_interval(), config.max_poll_attempts)
    }
}

/// Observer invoked with every polled job state
pub type StatusObserver = dyn Fn(&BatchJob) + Send + Sync;

/// Polls one job until it reaches a terminal status
pub struct JobPoller<'a> {
    provider: &'a dyn BatchProvider,
    settings: PollSettings,
}

impl<'a> JobPoller<'a> {
    pub fn new(provider: &'a dyn BatchProvider, settings: PollSettings) -> Self {
        Self { provider, settings }
    }

    /// Poll `job_id` until it is terminal, returning the final job state
    pub async fn wait_for_terminal(
        &self,
        job_id: &str,
        observer: Option<&StatusObserver>,
    ) -> Result<BatchJob, BatchError> {
        let started = Instant::now();
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let job = self
                .provider
                .get_batch(job_id)
                .await
                .map_err(BatchError::Poll)?;

            if let Some(observer) = observer {
                observer(&job);
            }

            let status = job.batch_status();
            if status.is_terminal() {
                debug!("Batch {} is {} after {} poll(s)", job_id, status, attempt);
                return Ok(job);
            }

            debug!(
                "Batch {} is {} (poll {}/{}), waiting {:?}",
                job_id, job.status, attempt, max_attempts, self.settings.interval
            );

            if attempt < max_attempts {
                tokio::time::sleep(self.settings.interval).await;
            }
        }

        Err(BatchError::Timeout {
            job_id: job_id.to_string(),
            attempts: max_attempts,
            elapsed: started.elapsed(),
        })
    }
}
