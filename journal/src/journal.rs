//! Append-only audit log.

use std::fmt;
use std::sync::Arc;

use chrono::SecondsFormat;
use overlay_core::Operation;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::entry::{LogEntry, LogId};
use crate::error::{JournalError, JournalResult};

/// Ordered, append-only sequence of log entries.
///
/// Entries are never reordered, rewritten, or truncated. `S` is the snapshot
/// type stored with each entry.
pub struct AuditLog<S> {
    /// All recorded entries.
    entries: Vec<LogEntry<S>>,
    /// Next id to assign.
    next_id: LogId,
    /// Source of entry timestamps.
    clock: Arc<dyn Clock>,
}

impl<S> AuditLog<S> {
    /// Create an empty log stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty log stamped by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            clock,
        }
    }

    /// The clock stamping this log.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Append an entry, assigning the next id and the current time.
    ///
    /// The caller hands over ownership of `snapshot`; the log keeps it as is.
    pub fn append(&mut self, operation: Operation, snapshot: S) -> &LogEntry<S> {
        let id = self.next_id;
        self.next_id += 1;
        let time = self
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        self.entries
            .push(LogEntry::new(id, time, operation, snapshot));
        &self.entries[self.entries.len() - 1]
    }

    /// Find an entry by id.
    pub fn find_by_id(&self, id: LogId) -> Option<&LogEntry<S>> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Get an entry by id, failing if it does not exist.
    pub fn entry(&self, id: LogId) -> JournalResult<&LogEntry<S>> {
        self.find_by_id(id)
            .ok_or_else(|| JournalError::entry_not_found(id))
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[LogEntry<S>] {
        &self.entries
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&LogEntry<S>> {
        self.entries.last()
    }

    /// Entries recording the given operation.
    pub fn iter_operation(&self, operation: Operation) -> impl Iterator<Item = &LogEntry<S>> + '_ {
        self.entries.iter().filter(move |e| e.is(operation))
    }

    /// Operations in append order.
    pub fn operations(&self) -> Vec<Operation> {
        self.entries.iter().map(|e| e.operation).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Serialize> AuditLog<S> {
    /// Export all entries as a JSON array.
    pub fn to_json(&self) -> JournalResult<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Export all entries as an indented JSON array.
    pub fn to_json_pretty(&self) -> JournalResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

impl<S> Default for AuditLog<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: fmt::Debug> fmt::Debug for AuditLog<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog")
            .field("entries", &self.entries)
            .field("next_id", &self.next_id)
            .finish()
    }
}
