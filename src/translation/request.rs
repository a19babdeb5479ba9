/*!
 * Batch request file construction.
 *
 * Every input item becomes one JSONL line tagged `request-{index}`, where
 * `index` is the item's position in the submitted array. The tag is the only
 * thing the service echoes back, so it is the sole link between a result and
 * its input.
 */

use serde::{Deserialize, Serialize};

use crate::app_config::BatchConfig;
use crate::providers::openai::CHAT_COMPLETIONS_PATH;

/// Prefix of every synthetic request identifier
pub const CUSTOM_ID_PREFIX: &str = "request-";

/// Tag for the request at `index`
pub fn custom_id(index: usize) -> String {
    format!("{}{}", CUSTOM_ID_PREFIX, index)
}

/// Index encoded in a `request-{index}` tag
pub fn parse_custom_id(custom_id: &str) -> Option<usize> {
    custom_id.strip_prefix(CUSTOM_ID_PREFIX)?.parse().ok()
}

/// Chat message inside a request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat completion body of one request line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionBody {
    /// Model to use
    pub model: String,
    /// Conversation to complete
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// One line of the uploaded JSONL file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestLine {
    /// `request-{index}` tag
    pub custom_id: String,
    /// HTTP method of the request
    pub method: String,
    /// Endpoint path the request targets
    pub url: String,
    /// Request body
    pub body: ChatCompletionBody,
}

impl BatchRequestLine {
    /// Content of the last user message
    pub fn user_text(&self) -> Option<String> {
        self.body
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
    }
}

/// Model and prompts shared by every line of a batch
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    /// Model name
    pub model: String,
    /// System instructions, omitted when empty
    pub system_prompt: String,
    /// Prompt placed before the item text, omitted when empty
    pub prompt: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl RequestTemplate {
    /// Build a template from configuration, filling in the target language
    pub fn from_config(config: &BatchConfig, target_language: &str) -> Self {
        Self {
            model: config.model.clone(),
            system_prompt: config.render_system_prompt(target_language),
            prompt: config.render_prompt(target_language),
            temperature: Some(config.temperature),
        }
    }

    /// Build the request line for the item at `index`
    pub fn build_line(&self, index: usize, text: &str) -> BatchRequestLine {
        let mut messages = Vec::with_capacity(2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: self.system_prompt.clone(),
            });
        }

        let content = if self.prompt.is_empty() {
            text.to_string()
        } else {
            format!("{}\n\n{}", self.prompt, text)
        };
        messages.push(ChatMessage {
            role: "user".to_string(),
            content,
        });

        BatchRequestLine {
            custom_id: custom_id(index),
            method: "POST".to_string(),
            url: CHAT_COMPLETIONS_PATH.to_string(),
            body: ChatCompletionBody {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
            },
        }
    }

    /// Encode all items as a JSONL request file
    pub fn encode(&self, items: &[String]) -> serde_json::Result<String> {
        let lines = items
            .iter()
            .enumerate()
            .map(|(index, text)| serde_json::to_string(&self.build_line(index, text)))
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(lines.join("\n"))
    }
}
