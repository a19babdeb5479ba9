use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::database::{DatabaseConnection, Repository};
use crate::document::{Document, DocumentStore, SqliteDocumentStore};
use crate::providers::openai::OpenAIBatch;
use crate::providers::{BatchJob, BatchProvider};
use crate::session::{
    ActiveJobRegistry, ApplyOptions, ApplyReport, DocumentStatus, ItemView, PendingJob,
    RecoveryChoice, RecoveryPrompt, ResumeOutcome, SessionManager, TranslationReport,
};
use crate::translation::{BatchClient, PollSettings, RequestTemplate};

// @module: Application controller for document batch translation

const SPINNER_TICK_MS: u64 = 120;

/// Asks on the terminal how to handle unfinished jobs
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn parse_answer(answer: &str) -> Option<RecoveryChoice> {
        match answer.trim().to_lowercase().as_str() {
            "r" | "resume" => Some(RecoveryChoice::Resume),
            "a" | "abandon" | "n" | "new" => Some(RecoveryChoice::Abandon),
            "c" | "cancel" | "" => Some(RecoveryChoice::Cancel),
            _ => None,
        }
    }
}

#[async_trait]
impl RecoveryPrompt for TerminalPrompt {
    async fn choose(&self, document: &Document, job: &PendingJob) -> Result<RecoveryChoice> {
        let question = format!(
            "Document '{}' has an unfinished batch job {} ({} item(s)).\n\
             [r]esume it, [a]bandon it, or [c]ancel? ",
            document.name,
            job.job_id,
            job.items.len()
        );

        tokio::task::spawn_blocking(move || -> Result<RecoveryChoice> {
            let mut stderr = std::io::stderr();
            loop {
                write!(stderr, "{}", question)?;
                stderr.flush()?;

                let mut answer = String::new();
                if std::io::stdin().read_line(&mut answer)? == 0 {
                    return Ok(RecoveryChoice::Cancel);
                }
                if let Some(choice) = TerminalPrompt::parse_answer(&answer) {
                    return Ok(choice);
                }
            }
        })
        .await
        .context("Prompt task panicked")?
    }
}

/// Split text into items on blank lines
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}

fn status_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

fn describe_job(job: &BatchJob) -> String {
    match &job.request_counts {
        Some(counts) if counts.total > 0 => format!(
            "Batch {} is {} ({}/{} done, {} failed)",
            job.id, job.status, counts.completed, counts.total, counts.failed
        ),
        _ => format!("Batch {} is {}", job.id, job.status),
    }
}

/// Main application controller for batch translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    manager: SessionManager,
    store: Arc<dyn DocumentStore>,
    spinner: ProgressBar,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let db_path = config.resolve_database_path()?;
        let db = DatabaseConnection::new(&db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(Repository::new(db)));
        let provider: Arc<dyn BatchProvider> = Arc::new(OpenAIBatch::from_config(&config.batch));

        Ok(Self::with_parts(config, store, provider))
    }

    /// Create a controller over explicit store and provider
    pub fn with_parts(config: Config, store: Arc<dyn DocumentStore>, provider: Arc<dyn BatchProvider>) -> Self {
        let spinner = status_spinner();
        let observer_spinner = spinner.clone();

        let client = BatchClient::new(
            provider,
            RequestTemplate::from_config(&config.batch, &config.target_language),
            PollSettings::from_config(&config.batch),
        )
        .with_status_observer(Arc::new(move |job: &BatchJob| {
            observer_spinner.set_message(describe_job(job));
            observer_spinner.tick();
        }));

        let manager = SessionManager::new(
            store.clone(),
            client,
            ApplyOptions {
                mode: config.apply_mode,
                target_language: config.target_language.clone(),
            },
            ActiveJobRegistry::new(),
        )
        .with_retranslate_completed(config.retranslate_completed);

        Self {
            config,
            manager,
            store,
            spinner,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Import a text file as a document, one item per paragraph
    pub async fn import_file(&self, path: &Path, name: Option<String>) -> Result<Document> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;

        let paragraphs = split_paragraphs(&text);
        if paragraphs.is_empty() {
            warn!("{:?} contains no text", path);
        }

        let name = name.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "Untitled".to_string())
        });

        let contents: Vec<Option<String>> = paragraphs.into_iter().map(Some).collect();
        let document = self.store.create_document(&name, &contents).await?;
        info!("Imported '{}' with {} item(s)", document.name, contents.len());
        Ok(document)
    }

    /// Documents with their flag counts
    pub async fn list_documents(&self) -> Result<Vec<DocumentStatus>> {
        Ok(self.manager.document_statuses().await?)
    }

    /// Items of a document with their flags
    pub async fn show_document(&self, document_id: &str) -> Result<Vec<ItemView>> {
        Ok(self.manager.item_views(document_id).await?)
    }

    /// Translate a document, handling unfinished jobs through `prompt`
    pub async fn translate(&self, document_id: &str, prompt: &dyn RecoveryPrompt) -> Result<TranslationReport> {
        // Not ticking yet: the recovery prompt may still need the terminal
        self.spinner.reset();

        let result = self.manager.translate_document(document_id, prompt).await;
        self.spinner.finish_and_clear();

        let report = result.context("Translation failed")?;
        log_report(&report);
        Ok(report)
    }

    /// Resume all unfinished jobs of a document
    pub async fn resume(&self, document_id: &str) -> Result<Vec<ResumeOutcome>> {
        self.spinner.reset();
        self.spinner.set_message("Resuming batch jobs");
        self.spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));

        let result = self.manager.resume_pending(document_id).await;
        self.spinner.finish_and_clear();

        let outcomes = result.context("Resume failed")?;
        if outcomes.is_empty() {
            info!("No unfinished batch jobs");
        }
        log_outcomes(&outcomes);
        Ok(outcomes)
    }

    /// Forget all unfinished jobs of a document
    pub async fn abandon(&self, document_id: &str) -> Result<usize> {
        let cleared = self.manager.abandon_pending(document_id).await?;
        info!("Cleared batch flags on {} item(s)", cleared);
        Ok(cleared)
    }
}

fn log_apply_report(report: &ApplyReport) {
    info!("Applied {} translation(s)", report.applied.len());
    for warning in &report.warnings {
        warn!("Skipped item {}: {}", warning.item_id, warning.reason);
    }
    if let Some(document_id) = &report.new_document_id {
        info!("Translations written to document {}", document_id);
    }
}

fn log_outcomes(outcomes: &[ResumeOutcome]) {
    for outcome in outcomes {
        match outcome {
            ResumeOutcome::Applied { job_id, report } => {
                info!("Batch {} resumed", job_id);
                log_apply_report(report);
            }
            ResumeOutcome::AlreadyMonitored { job_id } => {
                info!("Batch {} is already being monitored", job_id);
            }
            ResumeOutcome::Failed { job_id, error } => {
                warn!("Batch {} could not be resumed: {}", job_id, error);
            }
        }
    }
}

fn log_report(report: &TranslationReport) {
    match report {
        TranslationReport::Submitted { job_id, submitted, report } => {
            info!("Batch {} finished for {} item(s)", job_id, submitted);
            log_apply_report(report);
        }
        TranslationReport::Resumed(outcomes) => log_outcomes(outcomes),
        TranslationReport::Cancelled { pending_jobs } => {
            info!("Cancelled; {} unfinished batch job(s) left in place", pending_jobs);
        }
    }
}
