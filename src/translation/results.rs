/*!
 * Result stream parsing and reassembly.
 *
 * The service returns one JSON record per line, in no particular order and
 * not necessarily one per request. Records are keyed back to input positions
 * through their `request-{index}` tag.
 */

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::BatchError;
use super::request::parse_custom_id;

/// Error payload carried by a result record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: String,
}

/// Message of a completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

/// Response body: either choices or an error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// HTTP response recorded for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
}

/// One line of the result file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultLine {
    pub custom_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResultResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// What a single record says about its request
#[derive(Debug, Clone, PartialEq)]
pub enum ItemResult {
    /// Translated text
    Text(String),
    /// The request failed inside an otherwise running job
    Error(String),
}

impl ResultLine {
    /// Interpret the record
    pub fn outcome(&self) -> ItemResult {
        if let Some(error) = &self.error {
            return ItemResult::Error(error.message.clone());
        }

        let Some(response) = &self.response else {
            return ItemResult::Error("record has no response".to_string());
        };
        let Some(body) = &response.body else {
            return ItemResult::Error("response has no body".to_string());
        };
        if let Some(error) = &body.error {
            return ItemResult::Error(error.message.clone());
        }

        let content = body
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone());

        match (content, response.status_code) {
            (_, Some(code)) if code >= 400 => {
                ItemResult::Error(format!("request failed with status {}", code))
            }
            (Some(text), _) => ItemResult::Text(text),
            (None, _) => ItemResult::Error("response has no message content".to_string()),
        }
    }
}

/// Parse a result file into a map from request index to translated text
///
/// Error records, records without content and records with an unrecognized
/// tag are logged and skipped. A line that is not valid JSON fails the whole
/// parse.
pub fn parse_result_stream(content: &str) -> Result<HashMap<usize, String>, BatchError> {
    let mut results = HashMap::new();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record: ResultLine = serde_json::from_str(line).map_err(|e| BatchError::Parse {
            line: line_no + 1,
            message: e.to_string(),
        })?;

        let Some(index) = parse_custom_id(&record.custom_id) else {
            warn!("Skipping result with unknown id '{}'", record.custom_id);
            continue;
        };

        match record.outcome() {
            ItemResult::Text(text) => {
                if results.contains_key(&index) {
                    warn!("Duplicate result for {}, keeping the first one", record.custom_id);
                    continue;
                }
                results.insert(index, text);
            }
            ItemResult::Error(message) => {
                warn!("Request {} failed: {}", record.custom_id, message);
            }
        }
    }

    Ok(results)
}

/// Order results by input position, filling gaps with empty strings
pub fn reassemble(results: &HashMap<usize, String>, len: usize) -> Vec<String> {
    (0..len)
        .map(|index| results.get(&index).cloned().unwrap_or_default())
        .collect()
}

/// Serialized success record, as the service would emit it
pub fn success_line(custom_id: &str, text: &str) -> String {
    let line = ResultLine {
        custom_id: custom_id.to_string(),
        response: Some(ResultResponse {
            status_code: Some(200),
            body: Some(ResponseBody {
                choices: vec![Choice {
                    message: ChoiceMessage {
                        content: Some(text.to_string()),
                    },
                }],
                error: None,
            }),
        }),
        error: None,
    };
    serde_json::to_string(&line).unwrap_or_default()
}

/// Serialized per-request error record, as the service would emit it
pub fn error_line(custom_id: &str, message: &str) -> String {
    let line = ResultLine {
        custom_id: custom_id.to_string(),
        response: Some(ResultResponse {
            status_code: Some(400),
            body: Some(ResponseBody {
                choices: Vec::new(),
                error: Some(ErrorPayload {
                    message: message.to_string(),
                }),
            }),
        }),
        error: None,
    };
    serde_json::to_string(&line).unwrap_or_default()
}
