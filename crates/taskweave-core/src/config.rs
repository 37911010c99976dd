use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TaskweaveError};
use crate::types::ProcessingMode;

/// Top-level configuration for taskweave.
///
/// Loaded from `taskweave.toml` by default. Every section falls back to its
/// defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskweaveConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

impl TaskweaveConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TaskweaveConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TaskweaveError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Task extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Language whose schema and command words apply.
    pub language: String,
    /// Processing mode used when the caller does not pick one.
    pub mode: ProcessingMode,
    /// Label introducing a suggestion wrapper, as in `suggested: [/cmd]`.
    pub suggestion_label: String,
    /// Separator between wrapped commands. Empty allows a single command.
    pub suggestion_delimiter: String,
    /// Task modes whose required properties are not enforced.
    pub required_exempt_modes: Vec<String>,
    /// Messages longer than this many characters are rejected.
    pub max_message_chars: usize,
}

impl ExtractionConfig {
    pub fn delimiter(&self) -> Option<&str> {
        if self.suggestion_delimiter.is_empty() {
            None
        } else {
            Some(&self.suggestion_delimiter)
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            mode: ProcessingMode::Text,
            suggestion_label: "suggested".to_string(),
            suggestion_delimiter: ",".to_string(),
            required_exempt_modes: vec!["Start".to_string()],
            max_message_chars: 20_000,
        }
    }
}

/// Location of the task schema catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Path to the schema catalog TOML file.
    pub path: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: "schema.toml".to_string(),
        }
    }
}
