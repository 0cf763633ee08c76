//! Overlay Integration Test Framework
//!
//! Provides a fluent API for driving a transaction through named steps and
//! checking the record, the merged view, and the audit log after each one.
//!
//! # Example
//!
//! ```
//! use overlay_tests::prelude::*;
//!
//! Scenario::new("rename")
//!     .record(fixtures::marcus())
//!     .step("rename", |tx| tx.view().set("name", "Mao Zedong"), |a| {
//!         a.field("name", "Mao Zedong").record(fixtures::marcus()).pending(true)
//!     })
//!     .step("commit", |tx| tx.commit(), |a| a.field("name", "Mao Zedong").pending(false))
//!     .run()
//!     .unwrap();
//! ```

mod assertion;

pub use assertion::{Assertion, AssertionBuilder};
pub use error::{ScenarioError, ScenarioResult};
pub use scenario::{Scenario, Step};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::assertion::{Assertion, AssertionBuilder};
    pub use crate::error::{ScenarioError, ScenarioResult};
    pub use crate::fixtures;
    pub use crate::scenario::Scenario;
    pub use overlay_core::{lock, record, shared, Operation, Record, SharedRecord, Value};
    pub use overlay_transaction::{
        Change, Dataset, HookArgs, ListenerError, Transaction, TransactionError,
        TransactionOptions,
    };
}
