/*!
 * Error types for the batchwai application.
 *
 * This module contains custom error types for the different layers of the
 * batch lifecycle, using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the remote batch service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Fatal errors of a single batch call
#[derive(Error, Debug)]
pub enum BatchError {
    /// Nothing to submit
    #[error("Batch input is empty")]
    EmptyInput,

    /// The request file could not be uploaded
    #[error("Upload failed: {0}")]
    Upload(#[source] ProviderError),

    /// The remote job could not be created
    #[error("Batch job creation failed: {0}")]
    JobCreation(#[source] ProviderError),

    /// A status request could not be made
    #[error("Failed to poll batch job: {0}")]
    Poll(#[source] ProviderError),

    /// The result file could not be downloaded
    #[error("Failed to download batch results: {0}")]
    Download(#[source] ProviderError),

    /// The job completed but reported no result file
    #[error("Batch job {0} completed without an output file")]
    MissingOutput(String),

    /// A result line was not valid JSON
    #[error("Failed to parse result line {line}: {message}")]
    Parse {
        /// 1-based line number in the result stream
        line: usize,
        /// Decoder message
        message: String,
    },

    /// The job reached a terminal status other than completed
    #[error("Batch job {job_id} ended with status '{status}'")]
    JobUnsuccessful {
        /// Remote job identifier
        job_id: String,
        /// Terminal status reported by the service
        status: String,
    },

    /// The job stayed non-terminal for every allowed poll
    #[error("Batch job {job_id} did not finish after {attempts} polls ({elapsed:?} elapsed)")]
    Timeout {
        /// Remote job identifier
        job_id: String,
        /// Number of polls made
        attempts: u32,
        /// Wall time spent polling
        elapsed: Duration,
    },
}

/// Errors raised by the per-item flag store
#[derive(Error, Debug)]
pub enum FlagError {
    /// The item is still in flight under another job
    #[error("Item {item_id} is already queued under batch {existing}, cannot queue it under {requested}")]
    AlreadyQueued {
        /// Item identifier
        item_id: String,
        /// Job the item currently belongs to
        existing: String,
        /// Job that tried to claim it
        requested: String,
    },

    /// The document store failed
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Errors of the document translation workflow
#[derive(Error, Debug)]
pub enum SessionError {
    /// Document id does not exist in the store
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// No item of the document has content to translate
    #[error("Nothing to translate")]
    NothingToTranslate,

    /// Some target items belong to an unfinished job
    #[error("{} item(s) are already queued in another batch: {}", .0.len(), .0.join(", "))]
    ItemsAlreadyQueued(Vec<String>),

    /// The batch call returned no job
    #[error("Batch translation failed: {0}")]
    BatchFailed(String),

    /// Flag bookkeeping failed
    #[error(transparent)]
    Flags(#[from] FlagError),

    /// The document store failed
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a batch call
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Error from the translation workflow
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
