//! Error types for the properties store

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Failed to write new values to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        StoreError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Returns true if this error came out of a commit
    pub fn is_write_failure(&self) -> bool {
        matches!(self, StoreError::Write { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
