//! Error types for the task engine.

use taskweave_core::error::TaskweaveError;

/// Errors from the task engine.
///
/// Malformed commands are never errors. These cover caller and
/// configuration mistakes only.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unsupported processing mode: {0}")]
    UnsupportedMode(String),
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("schema error: {0}")]
    Schema(#[from] TaskweaveError),
}
