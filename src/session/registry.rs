/*!
 * In-process registry of jobs currently being polled.
 *
 * Nothing here is persisted: after a restart the registry is empty and the
 * item flags are the only record of a running job.
 */

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

/// Set of job ids actively polled by this process, in insertion order
#[derive(Debug, Clone, Default)]
pub struct ActiveJobRegistry {
    active: Arc<Mutex<Vec<String>>>,
}

impl ActiveJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job id, returns false when it was already present
    pub fn enqueue(&self, job_id: &str) -> bool {
        let mut active = self.active.lock();
        if active.iter().any(|id| id == job_id) {
            return false;
        }
        active.push(job_id.to_string());
        debug!("Monitoring batch {}", job_id);
        true
    }

    /// Remove a job id; absent ids are ignored
    pub fn dequeue(&self, job_id: &str) {
        let mut active = self.active.lock();
        if let Some(pos) = active.iter().position(|id| id == job_id) {
            active.remove(pos);
            debug!("Stopped monitoring batch {}", job_id);
        }
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.active.lock().iter().any(|id| id == job_id)
    }

    /// Active job ids, oldest first
    pub fn list_active(&self) -> Vec<String> {
        self.active.lock().clone()
    }

    /// Enqueue `job_id` for the lifetime of the returned guard
    ///
    /// Returns `None` when the job is already being monitored.
    pub fn guard(&self, job_id: &str) -> Option<ActiveJobGuard> {
        if !self.enqueue(job_id) {
            return None;
        }
        Some(ActiveJobGuard {
            registry: self.clone(),
            job_id: job_id.to_string(),
        })
    }
}

/// Dequeues its job when dropped
#[derive(Debug)]
pub struct ActiveJobGuard {
    registry: ActiveJobRegistry,
    job_id: String,
}

impl ActiveJobGuard {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        self.registry.dequeue(&self.job_id);
    }
}
