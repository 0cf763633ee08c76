//! Overlay Journal
//!
//! Append-only audit log of transaction lifecycle operations.
//!
//! Responsibilities:
//! - Assign monotonically increasing ids starting at 0
//! - Stamp each entry with an ISO-8601 time from a pluggable clock
//! - Keep an owned snapshot of the pending state with every entry
//! - Export entries as `{ id, time, operation, delta }` JSON

mod clock;
mod entry;
mod error;
mod journal;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{LogEntry, LogId};
pub use error::{JournalError, JournalResult};
pub use journal::AuditLog;
