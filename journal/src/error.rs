//! Journal error types.

use thiserror::Error;

use crate::LogId;

/// Journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Entry not found.
    #[error("log entry not found: {id}")]
    EntryNotFound { id: LogId },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JournalError {
    pub fn entry_not_found(id: LogId) -> Self {
        Self::EntryNotFound { id }
    }
}

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
