/*!
 * Tests for error types and their conversions
 */

use std::time::Duration;

use anyhow::anyhow;
use batchwai::errors::{AppError, BatchError, FlagError, ProviderError, SessionError};

#[test]
fn test_providerError_shouldFormatApiErrorWithStatus() {
    let err = ProviderError::ApiError {
        status_code: 500,
        message: "server exploded".to_string(),
    };
    assert_eq!(err.to_string(), "API responded with error: 500 - server exploded");
}

#[test]
fn test_batchError_shouldCarryProviderMessageForEveryStage() {
    let upload = BatchError::Upload(ProviderError::RateLimitExceeded("rate limited".to_string()));
    let poll = BatchError::Poll(ProviderError::ConnectionError("reset by peer".to_string()));

    assert!(upload.to_string().contains("rate limited"));
    assert!(upload.to_string().starts_with("Upload failed"));
    assert!(poll.to_string().contains("reset by peer"));
    assert!(poll.to_string().starts_with("Failed to poll batch job"));
}

#[test]
fn test_batchError_shouldDescribeUnsuccessfulAndTimedOutJobs() {
    let failed = BatchError::JobUnsuccessful {
        job_id: "batch_1".to_string(),
        status: "expired".to_string(),
    };
    assert_eq!(failed.to_string(), "Batch job batch_1 ended with status 'expired'");

    let timeout = BatchError::Timeout {
        job_id: "batch_2".to_string(),
        attempts: 3,
        elapsed: Duration::from_secs(30),
    };
    let message = timeout.to_string();
    assert!(message.contains("batch_2"));
    assert!(message.contains("3 polls"));
}

#[test]
fn test_batchError_shouldExposeProviderErrorAsSource() {
    use std::error::Error;

    let err = BatchError::Download(ProviderError::AuthenticationError("bad key".to_string()));
    let source = err.source().expect("download error should have a source");
    assert!(source.to_string().contains("bad key"));
}

#[test]
fn test_flagError_alreadyQueued_shouldNameBothJobs() {
    let err = FlagError::AlreadyQueued {
        item_id: "item-1".to_string(),
        existing: "batch_old".to_string(),
        requested: "batch_new".to_string(),
    };
    let message = err.to_string();
    assert!(message.contains("item-1"));
    assert!(message.contains("batch_old"));
    assert!(message.contains("batch_new"));
}

#[test]
fn test_sessionError_fromFlagError_shouldStayTransparent() {
    let flag_err = FlagError::Store(anyhow!("disk full"));
    let err: SessionError = flag_err.into();

    assert!(matches!(err, SessionError::Flags(FlagError::Store(_))));
    assert_eq!(err.to_string(), "disk full");
}

#[test]
fn test_sessionError_itemsAlreadyQueued_shouldCountAndListItems() {
    let err = SessionError::ItemsAlreadyQueued(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(err.to_string(), "2 item(s) are already queued in another batch: a, b");
}

#[test]
fn test_appError_shouldWrapLayerErrors() {
    let from_batch: AppError = BatchError::EmptyInput.into();
    assert_eq!(from_batch.to_string(), "Batch error: Batch input is empty");

    let from_session: AppError = SessionError::NothingToTranslate.into();
    assert_eq!(from_session.to_string(), "Session error: Nothing to translate");

    let from_io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
    assert!(matches!(from_io, AppError::File(_)));

    let from_anyhow: AppError = anyhow!("something odd").into();
    assert_eq!(from_anyhow.to_string(), "Unknown error: something odd");
}
