use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;
use std::time::Duration;

use crate::document::ApplyMode;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language code substituted into prompts
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Remote batch service settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Where translated text is placed relative to the source item
    #[serde(default)]
    pub apply_mode: ApplyMode,

    /// Submit items that already received a final result again
    #[serde(default)]
    pub retranslate_completed: bool,

    /// Database file holding documents and item flags
    #[serde(default)]
    pub database_path: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Batch service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// API key sent as a bearer token
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service base URL, e.g. "https://api.openai.com/v1"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name (e.g., "gpt-4o-mini")
    #[serde(default = "default_model")]
    pub model: String,

    /// User prompt prepended to every item
    /// Placeholders: {target_language}
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// System instructions for every request
    /// Placeholders: {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Seconds to wait between two status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Polls allowed before the job is considered timed out
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Completion window requested from the service
    #[serde(default = "default_completion_window")]
    pub completion_window: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_endpoint(),
            model: default_model(),
            prompt: default_prompt(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            completion_window: default_completion_window(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BatchConfig {
    /// Delay between status polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Prompt with placeholders filled in
    pub fn render_prompt(&self, target_language: &str) -> String {
        self.prompt.replace("{target_language}", target_language)
    }

    /// System instructions with placeholders filled in
    pub fn render_system_prompt(&self, target_language: &str) -> String {
        self.system_prompt.replace("{target_language}", target_language)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "fr".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_prompt() -> String {
    "Translate the following text to {target_language}.".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional translator. Translate the user's text into {target_language}. Preserve formatting and maintain the original meaning and tone. Reply with the translation only.".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    360 // one hour at the default interval
}

fn default_completion_window() -> String {
    "24h".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Config {

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.batch.api_key.trim().is_empty() {
            return Err(anyhow!("Batch API key is required"));
        }

        if self.batch.model.trim().is_empty() {
            return Err(anyhow!("Batch model must not be empty"));
        }

        if self.batch.max_poll_attempts == 0 {
            return Err(anyhow!("max_poll_attempts must be at least 1"));
        }

        url::Url::parse(&self.batch.endpoint)
            .map_err(|e| anyhow!("Invalid batch endpoint '{}': {}", self.batch.endpoint, e))?;

        Ok(())
    }

    /// Resolve the database file location
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => crate::database::DatabaseConnection::default_database_path(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            batch: BatchConfig::default(),
            apply_mode: ApplyMode::default(),
            retranslate_completed: false,
            database_path: None,
            log_level: LogLevel::default(),
        }
    }
}
