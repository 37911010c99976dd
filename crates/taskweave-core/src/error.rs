use thiserror::Error;

/// Top-level error type shared by the taskweave crates.
///
/// Data-quality problems in extracted text are never represented here; those
/// are logged and dropped by the engine. These variants cover configuration
/// and collaborator failures only.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskweaveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Unknown task mode {mode} for language {language}")]
    UnknownTaskMode { mode: String, language: String },
}

impl From<toml::de::Error> for TaskweaveError {
    fn from(err: toml::de::Error) -> Self {
        TaskweaveError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TaskweaveError {
    fn from(err: toml::ser::Error) -> Self {
        TaskweaveError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TaskweaveError {
    fn from(err: serde_json::Error) -> Self {
        TaskweaveError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for taskweave operations.
pub type Result<T> = std::result::Result<T, TaskweaveError>;
