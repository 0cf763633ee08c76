//! Transaction error types.

use overlay_core::CoreError;
use overlay_journal::{JournalError, LogId};
use thiserror::Error;

use crate::hooks::ListenerError;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Core error (e.g. an unknown operation name).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Journal error.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// A before/after listener failed.
    ///
    /// The operation is left partially applied: commit and rollback are not
    /// exception-safe with respect to listener failures.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// Point-in-time rollback to an id the log does not contain.
    #[error("rollback target not found: log entry {id}")]
    RollbackTargetNotFound { id: LogId },

    /// A dataset member failed; earlier members keep their changes.
    #[error("dataset member {index}: {source}")]
    Member {
        index: usize,
        #[source]
        source: Box<TransactionError>,
    },

    /// Timeouts need a tokio runtime to schedule on.
    #[error("no async runtime available to schedule the timeout")]
    NoRuntime,
}

impl TransactionError {
    pub fn rollback_target_not_found(id: LogId) -> Self {
        Self::RollbackTargetNotFound { id }
    }

    pub fn member(index: usize, source: TransactionError) -> Self {
        Self::Member {
            index,
            source: Box::new(source),
        }
    }
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
