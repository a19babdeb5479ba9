/*!
 * Tests for the OpenAI-compatible batch client against a mock HTTP server
 */

use batchwai::errors::ProviderError;
use batchwai::providers::openai::OpenAIBatch;
use batchwai::providers::{BatchProvider, BatchStatus};
use mockito::Matcher;
use serde_json::json;

fn client(server: &mockito::ServerGuard) -> OpenAIBatch {
    OpenAIBatch::new("test-key", server.url(), 5, "24h")
}

#[tokio::test]
async fn test_uploadFile_shouldSendMultipartWithBearerToken() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/files")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="purpose""#.to_string()),
            Matcher::Regex("request-0".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"file-abc","object":"file","purpose":"batch"}"#)
        .create_async()
        .await;

    let file = client(&server)
        .upload_file("batch.jsonl", br#"{"custom_id":"request-0"}"#.to_vec())
        .await
        .unwrap();

    assert_eq!(file.id, "file-abc");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_createBatch_shouldPostInputFileAndWindow() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/batches")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "input_file_id": "file-abc",
            "endpoint": "/v1/chat/completions",
            "completion_window": "24h"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"batch_123","object":"batch","status":"validating"}"#)
        .create_async()
        .await;

    let job = tokio_test::assert_ok!(client(&server).create_batch("file-abc").await);

    assert_eq!(job.id, "batch_123");
    assert_eq!(job.batch_status(), BatchStatus::Submitted);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_getBatch_shouldDecodeOutputFileAndCounts() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/batches/batch_123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "batch_123",
                "status": "completed",
                "output_file_id": "file-out",
                "error_file_id": null,
                "request_counts": { "total": 2, "completed": 2, "failed": 0 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let job = client(&server).get_batch("batch_123").await.unwrap();

    assert_eq!(job.batch_status(), BatchStatus::Completed);
    assert_eq!(job.output_file_id.as_deref(), Some("file-out"));
    assert_eq!(job.request_counts.unwrap().completed, 2);
}

#[tokio::test]
async fn test_downloadFile_shouldReturnRawContent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body("line one\nline two\n")
        .create_async()
        .await;

    let content = tokio_test::assert_ok!(client(&server).download_file("file-out").await);

    assert_eq!(content, "line one\nline two\n");
}

#[tokio::test]
async fn test_tooManyRequests_shouldMapToRateLimitWithServiceMessage() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/files")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"message":"rate limited","type":"requests"}}"#)
        .create_async()
        .await;

    match client(&server).upload_file("batch.jsonl", b"{}".to_vec()).await {
        Err(ProviderError::RateLimitExceeded(message)) => assert_eq!(message, "rate limited"),
        other => panic!("expected rate limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_shouldMapToAuthenticationError() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/batches/batch_123")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .create_async()
        .await;

    match client(&server).get_batch("batch_123").await {
        Err(ProviderError::AuthenticationError(message)) => assert!(message.contains("Incorrect API key")),
        other => panic!("expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_serverError_withPlainBody_shouldKeepStatusAndText() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/files/file-out/content")
        .with_status(502)
        .with_body("Bad gateway")
        .create_async()
        .await;

    match client(&server).download_file("file-out").await {
        Err(ProviderError::ApiError { status_code, message }) => {
            assert_eq!(status_code, 502);
            assert_eq!(message, "Bad gateway");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_endpointWithTrailingSlash_shouldStillHitPaths() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/batches/b1")
        .with_status(200)
        .with_body(r#"{"id":"b1","status":"in_progress"}"#)
        .create_async()
        .await;

    let client = OpenAIBatch::new("test-key", format!("{}/", server.url()), 5, "24h");
    let job = client.get_batch("b1").await.unwrap();

    assert_eq!(job.batch_status(), BatchStatus::Processing);
    mock.assert_async().await;
}
