//! Transaction configuration.

use serde::Deserialize;

/// Tunables for a transaction.
///
/// The default log holds lifecycle entries only (started, commit, rollback,
/// revoke, timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionOptions {
    /// Append a `set` entry for every write through the view.
    pub log_writes: bool,
    /// Append a `get` entry for every read through the view.
    pub log_reads: bool,
}

impl TransactionOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable `set` log entries.
    pub fn log_writes(mut self, enabled: bool) -> Self {
        self.log_writes = enabled;
        self
    }

    /// Enable or disable `get` log entries.
    pub fn log_reads(mut self, enabled: bool) -> Self {
        self.log_reads = enabled;
        self
    }
}
