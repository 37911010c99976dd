//! CLI argument definitions for the taskweave binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Taskweave: pull slash-command tasks out of model output.
#[derive(Parser, Debug)]
#[command(name = "taskweave", version, about)]
pub struct CliArgs {
    /// Message to process. Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Path to the schema catalog.
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,

    /// Processing mode (text, json).
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<String>,

    /// Active task mode, e.g. `BotAdd`.
    #[arg(short = 't', long = "task-mode", default_value = "Start")]
    pub task_mode: String,

    /// Schema language.
    #[arg(long = "language")]
    pub language: Option<String>,

    /// JSON object of properties already known from earlier context.
    #[arg(short = 'e', long = "existing")]
    pub existing: Option<String>,

    /// Print raw text-mode candidates instead of validated tasks.
    #[arg(long = "candidates")]
    pub candidates: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TASKWEAVE_CONFIG env var > ./taskweave.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TASKWEAVE_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("taskweave.toml")
    }

    /// Resolve the schema catalog path.
    ///
    /// Priority: --schema flag > config file value.
    pub fn resolve_schema_path(&self, config_path: &str) -> PathBuf {
        self.schema
            .clone()
            .unwrap_or_else(|| PathBuf::from(config_path))
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Input path, or `None` for stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|p| p.as_os_str() != "-")
    }
}
