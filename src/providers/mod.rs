/*!
 * Provider implementations for the remote batch service.
 *
 * This module contains the client side of the batch API:
 * - OpenAI: OpenAI-compatible `/files` + `/batches` integration
 * - Mock: scripted in-process provider for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::errors::ProviderError;

/// Logical status of a remote batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchStatus {
    /// Accepted, not yet running
    Submitted,
    /// Running or finalizing
    Processing,
    /// All requests processed, results available
    Completed,
    /// The service gave up on the job
    Failed,
    /// The job was cancelled
    Cancelled,
}

impl BatchStatus {
    /// Map a wire status onto the logical state machine
    pub fn from_wire(status: &str) -> Self {
        match status.to_lowercase().as_str() {
            "validating" | "submitted" => BatchStatus::Submitted,
            "completed" => BatchStatus::Completed,
            "failed" | "expired" => BatchStatus::Failed,
            "cancelled" => BatchStatus::Cancelled,
            // in_progress, finalizing, cancelling and anything new
            _ => BatchStatus::Processing,
        }
    }

    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Submitted => write!(f, "submitted"),
            BatchStatus::Processing => write!(f, "processing"),
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Failed => write!(f, "failed"),
            BatchStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-request progress counters reported by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
}

/// Job object returned by `POST /batches` and `GET /batches/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Job identifier
    pub id: String,

    /// Raw wire status
    pub status: String,

    /// Result file, present once the job completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_id: Option<String>,

    /// File holding failed request lines, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_file_id: Option<String>,

    /// Progress counters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_counts: Option<RequestCounts>,
}

impl BatchJob {
    /// Logical status of this job
    pub fn batch_status(&self) -> BatchStatus {
        BatchStatus::from_wire(&self.status)
    }
}

/// Uploaded file object returned by `POST /files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    /// File identifier
    pub id: String,
}

/// Client side of the remote batch API
///
/// Implementations only perform single round trips. Sequencing, polling and
/// result mapping live in `translation::BatchClient`.
#[async_trait]
pub trait BatchProvider: Send + Sync + Debug {
    /// Upload a JSONL request file
    async fn upload_file(&self, file_name: &str, content: Vec<u8>) -> Result<UploadedFile, ProviderError>;

    /// Create a job over an uploaded request file
    async fn create_batch(&self, input_file_id: &str) -> Result<BatchJob, ProviderError>;

    /// Fetch the current state of a job
    async fn get_batch(&self, batch_id: &str) -> Result<BatchJob, ProviderError>;

    /// Download the content of a file as text
    async fn download_file(&self, file_id: &str) -> Result<String, ProviderError>;
}

pub mod openai;
pub mod mock;
