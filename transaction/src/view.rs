//! Read/write view merging a record with its pending delta.

use std::sync::Arc;

use overlay_core::{lock, Operation, Record, Value};

use crate::error::TransactionResult;
use crate::hooks::{HookArgs, Phase};
use crate::transaction::Shared;

/// Where a field's visible value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// The base record; nothing pending.
    Base,
    /// A pending override.
    Pending,
}

/// Description of one visible field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub value: Value,
    pub source: FieldSource,
}

/// A live projection of `record ⊕ delta`.
///
/// Holds no state of its own. Every query, including existence checks and
/// key enumeration, sees the merged state; every write goes to the delta.
#[derive(Clone)]
pub struct View {
    shared: Arc<Shared>,
}

impl View {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Read a field, preferring a pending value over the record's.
    ///
    /// Runs the `get` listeners around the read.
    pub fn get(&self, field: &str) -> TransactionResult<Option<Value>> {
        self.shared.emit(
            Operation::Get,
            Phase::Before,
            &HookArgs::Field {
                name: field,
                value: None,
            },
        )?;
        let value = {
            let mut state = self.shared.state();
            let value = {
                let record = lock(&self.shared.record);
                state.delta.resolve(&record, field).cloned()
            };
            if self.shared.options.log_reads {
                let snapshot = state.delta.snapshot();
                state.log.append(Operation::Get, snapshot);
            }
            value
        };
        tracing::trace!(field, found = value.is_some(), "view read");
        self.shared.emit(
            Operation::Get,
            Phase::After,
            &HookArgs::Field {
                name: field,
                value: value.as_ref(),
            },
        )?;
        Ok(value)
    }

    /// Stage a value for a field.
    ///
    /// Compared against the record's live value: writing the base value back
    /// cancels the pending change. Runs the `set` listeners around the write.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> TransactionResult<()> {
        let value = value.into();
        let args = HookArgs::Field {
            name: field,
            value: Some(&value),
        };
        self.shared.emit(Operation::Set, Phase::Before, &args)?;
        {
            let mut state = self.shared.state();
            let pending = {
                let record = lock(&self.shared.record);
                state.delta.set(field, value.clone(), record.get(field))
            };
            self.log_write(&mut state);
            tracing::trace!(field, pending, "view write");
        }
        self.shared.emit(Operation::Set, Phase::After, &args)?;
        Ok(())
    }

    /// Stage removal of a field.
    ///
    /// Runs the `set` listeners with no value.
    pub fn remove(&self, field: &str) -> TransactionResult<()> {
        let args = HookArgs::Field {
            name: field,
            value: None,
        };
        self.shared.emit(Operation::Set, Phase::Before, &args)?;
        {
            let mut state = self.shared.state();
            let pending = {
                let record = lock(&self.shared.record);
                state.delta.remove(field, record.get(field))
            };
            self.log_write(&mut state);
            tracing::trace!(field, pending, "view remove");
        }
        self.shared.emit(Operation::Set, Phase::After, &args)?;
        Ok(())
    }

    fn log_write(&self, state: &mut crate::transaction::State) {
        if self.shared.options.log_writes {
            let snapshot = state.delta.snapshot();
            state.log.append(Operation::Set, snapshot);
        }
    }

    /// Check if a field is visible.
    pub fn contains(&self, field: &str) -> bool {
        let state = self.shared.state();
        let record = lock(&self.shared.record);
        state.delta.resolve(&record, field).is_some()
    }

    /// Visible field names: record fields first, then pending-only fields.
    pub fn keys(&self) -> Vec<String> {
        let state = self.shared.state();
        let record = lock(&self.shared.record);
        state.delta.merged_keys(&record)
    }

    /// Visible fields and their values, in key order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.to_record().into_iter().collect()
    }

    /// Number of visible fields.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Check if no field is visible.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Describe a visible field.
    pub fn describe(&self, field: &str) -> Option<FieldDescriptor> {
        let state = self.shared.state();
        let record = lock(&self.shared.record);
        let source = if state.delta.has_change(field) {
            FieldSource::Pending
        } else {
            FieldSource::Base
        };
        let value = state.delta.resolve(&record, field)?.clone();
        Some(FieldDescriptor { value, source })
    }

    /// The merged state as a standalone record. Does not run listeners.
    pub fn to_record(&self) -> Record {
        let state = self.shared.state();
        let record = lock(&self.shared.record);
        state.delta.merge(&record)
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("View").field(&self.to_record()).finish()
    }
}
