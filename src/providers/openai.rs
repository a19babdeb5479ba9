use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{multipart, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::{BatchJob, BatchProvider, UploadedFile};

/// Endpoint every request line of a batch is sent to
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI-compatible batch API client
#[derive(Debug)]
pub struct OpenAIBatch {
    /// HTTP client for API requests
    client: Client,
    /// API key sent as a bearer token
    api_key: String,
    /// Base URL, e.g. "https://api.openai.com/v1"
    endpoint: String,
    /// Completion window requested on job creation
    completion_window: String,
}

/// Body of `POST /batches`
#[derive(Debug, Serialize)]
pub struct CreateBatchRequest {
    /// Uploaded request file
    pub input_file_id: String,
    /// Endpoint the request lines target
    pub endpoint: String,
    /// Completion window, e.g. "24h"
    pub completion_window: String,
}

/// Error envelope used by the service
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAIBatch {
    /// Create a new batch client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout_secs: u64,
        completion_window: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            completion_window: completion_window.into(),
        }
    }

    /// Create a client from the batch section of the configuration
    pub fn from_config(config: &crate::app_config::BatchConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.endpoint.clone(),
            config.timeout_secs,
            config.completion_window.clone(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn check_credentials(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::AuthenticationError(
                "API key is not configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Turn a non-success response into a typed error
    async fn error_from_response(response: Response) -> ProviderError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        let message = Self::extract_error_message(&body);

        error!("Batch API error ({}): {}", status, message);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::AuthenticationError(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            },
        }
    }

    /// Pull `error.message` out of an error body, falling back to the raw text
    pub fn extract_error_message(body: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => body.trim().to_string(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(response)
    }
}

#[async_trait]
impl BatchProvider for OpenAIBatch {
    async fn upload_file(&self, file_name: &str, content: Vec<u8>) -> Result<UploadedFile, ProviderError> {
        self.check_credentials()?;
        debug!("Uploading {} ({} bytes)", file_name, content.len());

        let part = multipart::Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("application/jsonl")
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        let form = multipart::Form::new()
            .text("purpose", "batch")
            .part("file", part);

        let response = self
            .send(self.client.post(self.url("files")).multipart(form))
            .await?;

        response
            .json::<UploadedFile>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn create_batch(&self, input_file_id: &str) -> Result<BatchJob, ProviderError> {
        self.check_credentials()?;

        let body = CreateBatchRequest {
            input_file_id: input_file_id.to_string(),
            endpoint: CHAT_COMPLETIONS_PATH.to_string(),
            completion_window: self.completion_window.clone(),
        };

        let response = self
            .send(self.client.post(self.url("batches")).json(&body))
            .await?;

        response
            .json::<BatchJob>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn get_batch(&self, batch_id: &str) -> Result<BatchJob, ProviderError> {
        self.check_credentials()?;

        let response = self
            .send(self.client.get(self.url(&format!("batches/{}", batch_id))))
            .await?;

        response
            .json::<BatchJob>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn download_file(&self, file_id: &str) -> Result<String, ProviderError> {
        self.check_credentials()?;

        let response = self
            .send(self.client.get(self.url(&format!("files/{}/content", file_id))))
            .await?;

        response
            .text()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}
