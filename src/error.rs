//! Error types for rule evaluation and execution

use std::path::{Path, PathBuf};

/// Result type for sweeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or running rules
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid payload for {kind} filter `{payload}`: {reason}")]
    InvalidPayload {
        kind: &'static str,
        payload: String,
        reason: String,
    },

    #[error("Invalid regex `{pattern}`")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid pipeline function: {0}")]
    InvalidFunction(String),

    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    #[error("Failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to {op} {from} to {to}: {source}")]
    Transfer {
        op: &'static str,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Build a mapper that attaches an operation name and path to an I/O error
    pub fn io(op: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}
