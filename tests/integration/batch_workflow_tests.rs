/*!
 * End-to-end batch lifecycle over HTTP: upload, create, poll, download
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use batchwai::providers::openai::OpenAIBatch;
use batchwai::translation::{BatchClient, JobHooks, NoHooks, PollSettings};
use mockito::{Matcher, ServerGuard};
use serde_json::json;

use crate::common;

fn http_client(server: &ServerGuard, max_attempts: u32) -> BatchClient {
    let provider = Arc::new(OpenAIBatch::new("test-key", server.url(), 5, "24h"));
    BatchClient::new(
        provider,
        common::plain_template(),
        PollSettings::new(Duration::from_millis(1), max_attempts),
    )
}

fn items(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

async fn mock_upload_and_create(server: &mut ServerGuard) -> (mockito::Mock, mockito::Mock) {
    let upload = server
        .mock("POST", "/files")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"file-in"}"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/batches")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"batch_42","status":"validating"}"#)
        .create_async()
        .await;
    (upload, create)
}

fn job_body(status: &str, output_file_id: Option<&str>) -> String {
    json!({ "id": "batch_42", "status": status, "output_file_id": output_file_id }).to_string()
}

/// Records the job id handed to the hook
#[derive(Default)]
struct RecordingHooks {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl JobHooks for RecordingHooks {
    async fn on_job_created(&self, job_id: &str) -> Result<()> {
        self.seen.lock().unwrap().push(job_id.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_submitBatch_withReversedResults_shouldReturnInputOrder() {
    let mut server = mockito::Server::new_async().await;
    let (upload, create) = mock_upload_and_create(&mut server).await;

    let early_poll = server
        .mock("GET", "/batches/batch_42")
        .with_status(200)
        .with_body(job_body("in_progress", None))
        .expect(1)
        .create_async()
        .await;
    let final_poll = server
        .mock("GET", "/batches/batch_42")
        .with_status(200)
        .with_body(job_body("completed", Some("file-out")))
        .create_async()
        .await;
    let download = server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(common::result_file(&[(1, "Monde"), (0, "Bonjour")]))
        .create_async()
        .await;

    let hooks = RecordingHooks::default();
    let outcome = http_client(&server, 10)
        .submit_batch(&items(&["Hello", "World"]), &hooks)
        .await;

    assert_eq!(outcome.job_id.as_deref(), Some("batch_42"));
    assert_eq!(outcome.results, vec!["Bonjour", "Monde"]);
    assert!(outcome.error.is_none());
    assert_eq!(*hooks.seen.lock().unwrap(), vec!["batch_42".to_string()]);

    upload.assert_async().await;
    create.assert_async().await;
    early_poll.assert_async().await;
    final_poll.assert_async().await;
    download.assert_async().await;
}

#[tokio::test]
async fn test_submitBatch_whenUploadRateLimited_shouldReturnEmptyOutcomeWithMessage() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/files")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"message":"rate limited"}}"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/batches")
        .expect(0)
        .create_async()
        .await;

    let hooks = RecordingHooks::default();
    let outcome = http_client(&server, 10)
        .submit_batch(&items(&["Hello"]), &hooks)
        .await;

    assert!(outcome.job_id.is_none());
    assert!(outcome.results.is_empty());
    assert!(outcome.error.unwrap().contains("rate limited"));
    assert!(hooks.seen.lock().unwrap().is_empty());
    create.assert_async().await;
}

#[tokio::test]
async fn test_submitBatch_whenJobFails_shouldReportTerminalStatus() {
    let mut server = mockito::Server::new_async().await;
    let _setup = mock_upload_and_create(&mut server).await;
    let _mock = server
        .mock("GET", "/batches/batch_42")
        .with_status(200)
        .with_body(job_body("failed", None))
        .create_async()
        .await;
    let download = server
        .mock("GET", Matcher::Regex(r"^/files/.*/content$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let hooks = RecordingHooks::default();
    let outcome = http_client(&server, 10)
        .submit_batch(&items(&["Hello"]), &hooks)
        .await;

    assert!(outcome.job_id.is_none());
    assert!(outcome.error.unwrap().contains("ended with status 'failed'"));
    // the job existed, so the hook still saw it
    assert_eq!(hooks.seen.lock().unwrap().len(), 1);
    download.assert_async().await;
}

#[tokio::test]
async fn test_submitBatch_whenNeverTerminal_shouldTimeOutAfterMaxAttempts() {
    let mut server = mockito::Server::new_async().await;
    let _setup = mock_upload_and_create(&mut server).await;
    let poll = server
        .mock("GET", "/batches/batch_42")
        .with_status(200)
        .with_body(job_body("in_progress", None))
        .expect(3)
        .create_async()
        .await;

    let outcome = http_client(&server, 3)
        .submit_batch(&items(&["Hello"]), &NoHooks)
        .await;

    assert!(outcome.job_id.is_none());
    assert!(outcome.error.unwrap().contains("did not finish after 3 polls"));
    poll.assert_async().await;
}

#[tokio::test]
async fn test_submitBatch_withPartialResults_shouldFillGapsWithEmptyStrings() {
    let mut server = mockito::Server::new_async().await;
    let _setup = mock_upload_and_create(&mut server).await;
    let _mock = server
        .mock("GET", "/batches/batch_42")
        .with_status(200)
        .with_body(job_body("completed", Some("file-out")))
        .create_async()
        .await;
    let _mock = server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(common::result_file(&[(2, "Trois")]))
        .create_async()
        .await;

    let outcome = http_client(&server, 10)
        .submit_batch(&items(&["One", "Two", "Three"]), &NoHooks)
        .await;

    assert_eq!(outcome.job_id.as_deref(), Some("batch_42"));
    assert_eq!(outcome.results, vec!["", "", "Trois"]);
}

#[tokio::test]
async fn test_resumeJob_shouldKeyResultsByRequestIndex() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/batches/batch_42")
        .with_status(200)
        .with_body(job_body("completed", Some("file-out")))
        .create_async()
        .await;
    let _mock = server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(common::result_file(&[(3, "Quatre"), (0, "Un")]))
        .create_async()
        .await;
    let upload = server.mock("POST", "/files").expect(0).create_async().await;

    let resumed = http_client(&server, 10).resume_job("batch_42").await.unwrap();

    assert_eq!(resumed.job.id, "batch_42");
    assert_eq!(resumed.results.len(), 2);
    assert_eq!(resumed.results[&0], "Un");
    assert_eq!(resumed.results[&3], "Quatre");
    upload.assert_async().await;
}
