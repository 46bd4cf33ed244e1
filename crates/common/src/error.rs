//! Error types shared across Inkcast crates.
//!
//! Timeline and session failures have their own enums next to the code
//! that raises them. This type covers input plumbing and file access.

use std::path::PathBuf;

/// Top-level error type for Inkcast operations.
#[derive(Debug, thiserror::Error)]
pub enum InkcastError {
    #[error("Input error: {message}")]
    Input { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using InkcastError.
pub type InkcastResult<T> = Result<T, InkcastError>;

impl InkcastError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }
}
