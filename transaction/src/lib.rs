//! Overlay Transaction
//!
//! Buffered, revocable edits over plain records.
//!
//! Responsibilities:
//! - Track pending field overrides (delta store)
//! - Merge base record and pending changes behind a read/write view
//! - Implement COMMIT/ROLLBACK/REVOKE with an append-only audit log
//! - Run before/after listeners around every lifecycle operation
//! - Schedule cancellable automatic commit or rollback (timeouts)
//! - Fan lifecycle operations out over a collection of records (datasets)
//!
//! # Example
//!
//! ```
//! use overlay_core::{lock, record, shared, Value};
//! use overlay_transaction::Transaction;
//!
//! let data = shared(record! { "name" => "Marcus Aurelius", "born" => 121 });
//! let transaction = Transaction::start(data.clone());
//! let person = transaction.view();
//!
//! person.set("city", "Shaoshan").unwrap();
//! assert!(lock(&data).get("city").is_none());
//!
//! transaction.commit().unwrap();
//! assert_eq!(lock(&data).get("city"), Some(&Value::from("Shaoshan")));
//! ```

mod dataset;
mod delta;
mod error;
mod hooks;
mod options;
mod timer;
mod transaction;
mod view;

pub use dataset::{Dataset, DatasetSnapshot};
pub use delta::{Change, Delta, DeltaStore};
pub use error::{TransactionError, TransactionResult};
pub use hooks::{EventHooks, HookArgs, Listener, ListenerError, Phase};
pub use options::TransactionOptions;
pub use timer::{TimeoutListener, Timer, TimerHandle};
pub use transaction::Transaction;
pub use view::{FieldDescriptor, FieldSource, View};
