// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{Result, Context};
use log::{warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use clap::{Args, Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::app_config::Config;
use crate::document::ApplyMode;
use crate::session::{FixedChoice, RecoveryChoice, RecoveryPrompt, TranslationReport};
use app_controller::{Controller, TerminalPrompt};

mod app_config;
mod app_controller;
mod database;
mod document;
mod errors;
mod providers;
mod session;
mod translation;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// What to do with unfinished jobs found on a document
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OnPending {
    /// Ask on the terminal
    #[default]
    Ask,
    /// Resume them
    Resume,
    /// Clear their flags and submit a new batch
    Abandon,
    /// Do nothing
    Cancel,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a text file as a document, one item per paragraph
    Import {
        /// UTF-8 text file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Document name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List documents with their batch state
    List,

    /// Show the items of a document and their batch flags
    Show {
        /// Document id
        #[arg(value_name = "DOCUMENT")]
        document: String,
    },

    /// Translate a document as one batch job
    Translate(TranslateArgs),

    /// Resume every unfinished batch job of a document
    Resume {
        /// Document id
        #[arg(value_name = "DOCUMENT")]
        document: String,
    },

    /// Forget every unfinished batch job of a document
    Abandon {
        /// Document id
        #[arg(value_name = "DOCUMENT")]
        document: String,
    },

    /// Generate shell completions for batchwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Document id
    #[arg(value_name = "DOCUMENT")]
    document: String,

    /// What to do with unfinished jobs on the document
    #[arg(long, value_enum, default_value_t = OnPending::Ask)]
    on_pending: OnPending,

    /// Where translations are written
    #[arg(long, value_enum)]
    mode: Option<ApplyMode>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// API key for the batch service
    #[arg(long, env = "BATCHWAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

/// batchwai - batch translation of documents with LLM batch jobs
///
/// Submits all items of a document as one asynchronous batch job, tracks the
/// job on the items themselves and picks it up again after a restart.
#[derive(Parser, Debug)]
#[command(name = "batchwai")]
#[command(version)]
#[command(about = "Batch document translation with durable job recovery")]
#[command(long_about = "batchwai submits the items of a document as a single batch translation job,
records the job on every item, and resumes unfinished jobs after a restart.

EXAMPLES:
    batchwai import notes.txt                      # Create a document, one item per paragraph
    batchwai list                                  # Documents and their batch state
    batchwai translate <DOC>                       # Translate, asking about unfinished jobs
    batchwai translate <DOC> --on-pending resume   # Resume unfinished jobs without asking
    batchwai translate <DOC> --mode new-document   # Write translations to a sibling document
    batchwai resume <DOC>                          # Resume every unfinished job
    batchwai completions bash > batchwai.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. The API key can also be given through the
    BATCHWAI_API_KEY environment variable.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let emoji = Self::get_emoji_for_level(record.level());
            let color = Self::get_color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, emoji, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once at the most verbose level; the effective
    // level is applied through set_max_level below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "batchwai", &mut std::io::stdout());
            Ok(())
        }
        Commands::Import { file, name } => {
            let controller = open_controller(&cli.config, cli.log_level, None, false)?;
            let document = controller.import_file(&file, name).await?;
            println!("{}", document.id);
            Ok(())
        }
        Commands::List => {
            let controller = open_controller(&cli.config, cli.log_level, None, false)?;
            for status in controller.list_documents().await? {
                println!(
                    "{}  {}  items: {}  in flight: {}  completed: {}",
                    status.summary.document.id,
                    status.summary.document.name,
                    status.summary.item_count,
                    status.in_flight,
                    status.completed
                );
            }
            Ok(())
        }
        Commands::Show { document } => {
            let controller = open_controller(&cli.config, cli.log_level, None, false)?;
            for view in controller.show_document(&document).await? {
                let state = if view.flags.completed {
                    "completed".to_string()
                } else if view.flags.queued {
                    format!(
                        "queued in {} #{}",
                        view.flags.batch_id.as_deref().unwrap_or("?"),
                        view.flags
                            .batch_index
                            .map(|i| i.to_string())
                            .unwrap_or_else(|| "?".to_string())
                    )
                } else {
                    "-".to_string()
                };
                println!(
                    "[{}] {} ({})\n{}\n",
                    view.item.position,
                    view.item.id,
                    state,
                    view.item.content.as_deref().unwrap_or("<empty>")
                );
            }
            Ok(())
        }
        Commands::Translate(args) => run_translate(&cli.config, cli.log_level, args).await,
        Commands::Resume { document } => {
            let controller = open_controller(&cli.config, cli.log_level, None, true)?;
            controller.resume(&document).await?;
            Ok(())
        }
        Commands::Abandon { document } => {
            let controller = open_controller(&cli.config, cli.log_level, None, false)?;
            controller.abandon(&document).await?;
            Ok(())
        }
    }
}

async fn run_translate(config_path: &str, log_level: Option<CliLogLevel>, args: TranslateArgs) -> Result<()> {
    let controller = open_controller(config_path, log_level, Some(&args), true)?;

    let prompt: Box<dyn RecoveryPrompt> = match args.on_pending {
        OnPending::Ask => Box::new(TerminalPrompt),
        OnPending::Resume => Box::new(FixedChoice(RecoveryChoice::Resume)),
        OnPending::Abandon => Box::new(FixedChoice(RecoveryChoice::Abandon)),
        OnPending::Cancel => Box::new(FixedChoice(RecoveryChoice::Cancel)),
    };

    let report = controller.translate(&args.document, prompt.as_ref()).await?;
    if let TranslationReport::Submitted { report, .. } = &report {
        if let Some(document_id) = &report.new_document_id {
            println!("{}", document_id);
        }
    }
    Ok(())
}

/// Load the configuration, apply CLI overrides and build the controller
///
/// Only commands that talk to the batch service validate the configuration.
fn open_controller(
    config_path: &str,
    log_level: Option<CliLogLevel>,
    overrides: Option<&TranslateArgs>,
    needs_service: bool,
) -> Result<Controller> {
    let mut config = load_or_create_config(config_path)?;

    if let Some(args) = overrides {
        if let Some(mode) = args.mode {
            config.apply_mode = mode;
        }
        if let Some(model) = &args.model {
            config.batch.model = model.clone();
        }
        if let Some(target_language) = &args.target_language {
            config.target_language = target_language.clone();
        }
        if let Some(api_key) = &args.api_key {
            if !api_key.is_empty() {
                config.batch.api_key = api_key.clone();
            }
        }
    }

    // Fall back to the environment for commands without --api-key
    if config.batch.api_key.is_empty() {
        if let Ok(api_key) = std::env::var("BATCHWAI_API_KEY") {
            config.batch.api_key = api_key;
        }
    }

    // If log level was not set via command line, update it from config now
    match log_level {
        Some(level) => config.log_level = level.into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    if needs_service {
        config.validate()
            .context("Configuration validation failed")?;
    }

    Controller::with_config(config)
}

fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        // Load existing configuration
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;

        Ok(config)
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();

        // Save default config
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        Ok(config)
    }
}
