//! Audit log entry types.

use overlay_core::Operation;
use serde::{Deserialize, Serialize};

/// Identifier of a log entry, unique within one log.
pub type LogId = u64;

/// One immutable record of a lifecycle operation.
///
/// `delta` is an owned snapshot of the pending state at the moment the
/// operation was invoked; later changes to the transaction never reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry<S> {
    /// Sequential id, starting at 0.
    pub id: LogId,
    /// ISO-8601 UTC timestamp, millisecond precision.
    pub time: String,
    /// The logged operation.
    pub operation: Operation,
    /// Snapshot of the pending state.
    pub delta: S,
}

impl<S> LogEntry<S> {
    /// Create a new log entry.
    pub fn new(id: LogId, time: String, operation: Operation, delta: S) -> Self {
        Self {
            id,
            time,
            operation,
            delta,
        }
    }

    /// Check if this entry records the given operation.
    pub fn is(&self, operation: Operation) -> bool {
        self.operation == operation
    }
}
