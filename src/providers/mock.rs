/*!
 * Mock batch provider for testing.
 *
 * This module provides a scripted provider that simulates the remote batch service:
 * - `MockBatchProvider::working()` - Jobs complete on the first poll and echo a translation
 * - `with_statuses(..)` - Script the status sequence returned by successive polls
 * - `with_output(..)` - Serve a fixed result file
 * - `reversed()` - Emit generated results in reverse request order
 * - `with_errors_only()` - Complete jobs with an error file and no output file
 * - `failing_at(..)` - Fail one stage of the lifecycle with a given error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::translation::request::BatchRequestLine;
use crate::translation::results;
use super::{BatchJob, BatchProvider, RequestCounts, UploadedFile};

/// Lifecycle stage a failure can be injected at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockStage {
    Upload,
    Create,
    Poll,
    Download,
}

/// Error to simulate at a stage
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Non-success HTTP status with a message
    Api { status_code: u16, message: String },
    /// Transport failure
    Connection(String),
}

impl MockFailure {
    fn to_error(&self) -> ProviderError {
        match self {
            MockFailure::Api { status_code, message } => ProviderError::ApiError {
                status_code: *status_code,
                message: message.clone(),
            },
            MockFailure::Connection(message) => ProviderError::ConnectionError(message.clone()),
        }
    }
}

/// Call recorded by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Upload { file_name: String },
    Create { input_file_id: String },
    Poll { batch_id: String },
    Download { file_id: String },
}

#[derive(Debug, Default)]
struct MockState {
    /// Status returned by each poll; the last one repeats, "completed" when empty
    statuses: VecDeque<String>,
    /// Fixed result file served for any download
    output: Option<String>,
    /// Completed jobs carry only an error file
    errors_only: bool,
    /// Generated result lines come out in reverse request order
    reverse_output: bool,
    /// Failure injected per stage
    failures: HashMap<MockStage, MockFailure>,
    /// Uploaded file id -> content
    files: HashMap<String, String>,
    /// Batch id -> input file id
    batches: HashMap<String, String>,
    /// Every call, in order
    calls: Vec<MockCall>,
    /// Id generator
    counter: usize,
}

/// Scripted in-process batch provider
#[derive(Debug, Clone)]
pub struct MockBatchProvider {
    /// Shared state, so clones observe the same calls
    state: Arc<Mutex<MockState>>,
}

/// Translation the mock applies to each uploaded user message
fn translate(text: &str) -> String {
    format!("[TRANSLATED] {}", text)
}

impl MockBatchProvider {
    /// Create a mock whose jobs complete immediately
    pub fn working() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Script the statuses returned by successive polls
    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        self.state.lock().statuses = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Serve a fixed result file
    pub fn with_output(self, output: impl Into<String>) -> Self {
        self.state.lock().output = Some(output.into());
        self
    }

    /// Inject a failure at a stage
    pub fn failing_at(self, stage: MockStage, failure: MockFailure) -> Self {
        self.state.lock().failures.insert(stage, failure);
        self
    }

    /// Emit generated result lines in reverse order
    pub fn reversed(self) -> Self {
        self.state.lock().reverse_output = true;
        self
    }

    /// Complete jobs with an error file only, as when every request failed
    pub fn with_errors_only(self) -> Self {
        self.state.lock().errors_only = true;
        self
    }

    /// All calls made so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Number of status polls made so far
    pub fn poll_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Poll { .. }))
            .count()
    }

    /// Parsed request lines of every uploaded file, in upload order
    pub fn uploaded_requests(&self) -> Vec<Vec<BatchRequestLine>> {
        let state = self.state.lock();
        let mut ids: Vec<&String> = state.files.keys().collect();
        ids.sort();
        ids.into_iter()
            .map(|id| parse_request_file(&state.files[id]))
            .collect()
    }

    fn next_id(state: &mut MockState) -> String {
        state.counter += 1;
        format!("batch_mock_{}", state.counter)
    }

    fn check_failure(state: &MockState, stage: MockStage) -> Result<(), ProviderError> {
        match state.failures.get(&stage) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

}

fn generate_output(content: &str, reverse: bool) -> String {
    let mut lines: Vec<String> = parse_request_file(content)
        .iter()
        .map(|request| {
            let text = request.user_text().unwrap_or_default();
            results::success_line(&request.custom_id, &translate(&text))
        })
        .collect();
    if reverse {
        lines.reverse();
    }
    lines.join("\n")
}

fn parse_request_file(content: &str) -> Vec<BatchRequestLine> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect()
}

#[async_trait]
impl BatchProvider for MockBatchProvider {
    async fn upload_file(&self, file_name: &str, content: Vec<u8>) -> Result<UploadedFile, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Upload { file_name: file_name.to_string() });
        Self::check_failure(&state, MockStage::Upload)?;

        let content = String::from_utf8(content)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        // zero-padded so lexical order is upload order
        state.counter += 1;
        let id = format!("file-in-{:04}", state.counter);
        state.files.insert(id.clone(), content);
        Ok(UploadedFile { id })
    }

    async fn create_batch(&self, input_file_id: &str) -> Result<BatchJob, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Create { input_file_id: input_file_id.to_string() });
        Self::check_failure(&state, MockStage::Create)?;

        let id = Self::next_id(&mut state);
        state.batches.insert(id.clone(), input_file_id.to_string());
        Ok(BatchJob {
            id,
            status: "validating".to_string(),
            output_file_id: None,
            error_file_id: None,
            request_counts: None,
        })
    }

    async fn get_batch(&self, batch_id: &str) -> Result<BatchJob, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Poll { batch_id: batch_id.to_string() });
        Self::check_failure(&state, MockStage::Poll)?;

        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front().unwrap_or_default()
        } else {
            state
                .statuses
                .front()
                .cloned()
                .unwrap_or_else(|| "completed".to_string())
        };

        let completed = status == "completed";
        let (output_file_id, error_file_id) = match (completed, state.errors_only) {
            (false, _) => (None, None),
            (true, false) => (Some(format!("file-out-{}", batch_id)), None),
            (true, true) => (None, Some(format!("file-err-{}", batch_id))),
        };
        Ok(BatchJob {
            id: batch_id.to_string(),
            status,
            output_file_id,
            error_file_id,
            request_counts: Some(RequestCounts::default()),
        })
    }

    async fn download_file(&self, file_id: &str) -> Result<String, ProviderError> {
        let (input, reverse) = {
            let mut state = self.state.lock();
            state.calls.push(MockCall::Download { file_id: file_id.to_string() });
            Self::check_failure(&state, MockStage::Download)?;
            if let Some(output) = &state.output {
                return Ok(output.clone());
            }
            let input = file_id
                .strip_prefix("file-out-")
                .and_then(|batch_id| state.batches.get(batch_id))
                .and_then(|input_id| state.files.get(input_id))
                .cloned();
            (input, state.reverse_output)
        };

        match input {
            Some(content) => Ok(generate_output(&content, reverse)),
            None => Err(ProviderError::ApiError {
                status_code: 404,
                message: format!("No such file: {}", file_id),
            }),
        }
    }
}
