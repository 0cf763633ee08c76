//! Transaction over a single record.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use overlay_core::{lock, Operation, Record, SharedRecord};
use overlay_journal::{AuditLog, Clock, LogEntry, SystemClock};

use crate::delta::{Delta, DeltaStore};
use crate::error::TransactionResult;
use crate::hooks::{self, EventHooks, HookArgs, ListenerError, Phase};
use crate::options::TransactionOptions;
use crate::timer::{self, Expire, TimeoutListener, TimeoutSlot};
use crate::view::View;

/// Pending delta and its log, guarded together.
#[derive(Debug)]
pub(crate) struct State {
    pub(crate) delta: DeltaStore,
    pub(crate) log: AuditLog<Delta>,
}

/// Everything a transaction, its views, and its timer task share.
pub(crate) struct Shared {
    pub(crate) record: SharedRecord,
    pub(crate) options: TransactionOptions,
    state: Mutex<State>,
    hooks: Mutex<EventHooks>,
    timeout: Mutex<TimeoutSlot>,
}

impl Shared {
    fn new(
        record: SharedRecord,
        options: TransactionOptions,
        clock: Arc<dyn Clock>,
        delta: DeltaStore,
    ) -> Self {
        let mut log = AuditLog::with_clock(clock);
        log.append(Operation::Started, delta.snapshot());
        Self {
            record,
            options,
            state: Mutex::new(State { delta, log }),
            hooks: Mutex::new(EventHooks::new()),
            timeout: Mutex::new(TimeoutSlot::default()),
        }
    }

    /// Lock the delta and log. Always taken before the record lock.
    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hooks(&self) -> MutexGuard<'_, EventHooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn listeners(&self, operation: Operation, phase: Phase) -> Vec<hooks::Listener> {
        self.hooks().listeners(operation, phase)
    }

    /// Run the listeners registered for an operation and phase.
    pub(crate) fn emit(
        &self,
        operation: Operation,
        phase: Phase,
        args: &HookArgs<'_>,
    ) -> Result<(), ListenerError> {
        let listeners = self.listeners(operation, phase);
        hooks::run(&listeners, args)
    }

    fn log(&self, operation: Operation) {
        let mut state = self.state();
        let snapshot = state.delta.snapshot();
        state.log.append(operation, snapshot);
    }

    fn commit(&self) -> TransactionResult<()> {
        self.log(Operation::Commit);
        self.emit(Operation::Commit, Phase::Before, &HookArgs::None)?;
        let applied = {
            let state = self.state();
            let mut record = lock(&self.record);
            state.delta.apply_to(&mut record);
            state.delta.len()
        };
        self.emit(Operation::Commit, Phase::After, &HookArgs::None)?;
        self.state().delta.clear();
        tracing::debug!(fields = applied, "transaction committed");
        Ok(())
    }

    fn rollback(&self) -> TransactionResult<()> {
        self.log(Operation::Rollback);
        self.emit(Operation::Rollback, Phase::Before, &HookArgs::None)?;
        let discarded = {
            let mut state = self.state();
            let discarded = state.delta.len();
            state.delta.clear();
            discarded
        };
        self.emit(Operation::Rollback, Phase::After, &HookArgs::None)?;
        tracing::debug!(fields = discarded, "transaction rolled back");
        Ok(())
    }
}

impl Expire for Shared {
    fn timeout_slot(&self) -> MutexGuard<'_, TimeoutSlot> {
        self.timeout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, commit: bool) -> TransactionResult<()> {
        if commit {
            self.commit()
        } else {
            self.rollback()
        }
    }
}

/// A transactional overlay on one record.
///
/// Writes through [`View`] are buffered in a delta and reach the record only
/// on [`commit`](Self::commit). Commit and rollback are not terminal: the
/// transaction keeps working until it is dropped.
///
/// `Clone` forks the transaction: the fork overlays the same record, starts
/// with a copy of the current delta, and shares nothing else.
pub struct Transaction {
    shared: Arc<Shared>,
}

impl Transaction {
    /// Start a transaction with default options.
    pub fn start(record: SharedRecord) -> Self {
        Self::start_with(record, TransactionOptions::default())
    }

    /// Start a transaction with the given options.
    pub fn start_with(record: SharedRecord, options: TransactionOptions) -> Self {
        Self::start_with_clock(record, options, Arc::new(SystemClock))
    }

    /// Start a transaction whose log is stamped by `clock`.
    pub fn start_with_clock(
        record: SharedRecord,
        options: TransactionOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let shared = Shared::new(record, options, clock, DeltaStore::new());
        tracing::debug!("transaction started");
        Self {
            shared: Arc::new(shared),
        }
    }

    /// A read/write view merging the record with the pending delta.
    pub fn view(&self) -> View {
        View::new(Arc::clone(&self.shared))
    }

    /// Apply the pending delta to the record.
    ///
    /// Logs `commit` with the delta as it was before applying, runs the
    /// before listeners, writes every pending field, runs the after
    /// listeners, then clears the delta. Cancels an armed timeout.
    pub fn commit(&self) -> TransactionResult<()> {
        self.cancel_timeout();
        self.shared.commit()
    }

    /// Discard the pending delta. The record is untouched.
    ///
    /// Cancels an armed timeout.
    pub fn rollback(&self) -> TransactionResult<()> {
        self.cancel_timeout();
        self.shared.rollback()
    }

    /// Reserved for undoing the last commit; only logs and runs listeners.
    pub fn revoke(&self) -> TransactionResult<()> {
        self.shared.log(Operation::Revoke);
        self.shared
            .emit(Operation::Revoke, Phase::Before, &HookArgs::None)?;
        self.shared
            .emit(Operation::Revoke, Phase::After, &HookArgs::None)?;
        Ok(())
    }

    /// Commit (`commit_on_expiry`) or roll back automatically after `delay`.
    ///
    /// Replaces any armed timeout; a zero delay only disarms. A manual commit
    /// or rollback before expiry cancels the scheduled action. `listener`
    /// learns which action ran. Must be called within a tokio runtime.
    ///
    /// The timeout stays armed while the transaction or any of its views is
    /// alive; once all of them are dropped it does nothing.
    pub fn timeout(
        &self,
        delay: Duration,
        commit_on_expiry: bool,
        listener: Option<TimeoutListener>,
    ) -> TransactionResult<()> {
        self.shared.log(Operation::Timeout);
        let args = HookArgs::Timeout(delay);
        self.shared.emit(Operation::Timeout, Phase::Before, &args)?;
        timer::arm(&self.shared, delay, commit_on_expiry, listener)?;
        self.shared.emit(Operation::Timeout, Phase::After, &args)?;
        Ok(())
    }

    /// Disarm the pending timeout. Returns true if one was armed.
    pub fn cancel_timeout(&self) -> bool {
        let cancelled = self.shared.timeout_slot().cancel();
        if cancelled {
            tracing::info!("timeout cancelled");
        }
        cancelled
    }

    /// The action an armed timeout will take: `Some(true)` for commit.
    pub fn pending_timeout(&self) -> Option<bool> {
        self.shared.timeout_slot().pending_action()
    }

    /// Register a listener to run before an operation.
    pub fn before<F>(&self, operation: Operation, listener: F) -> TransactionResult<()>
    where
        F: Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Ok(self.shared.hooks().register(operation, Phase::Before, listener)?)
    }

    /// Register a listener to run after an operation.
    pub fn after<F>(&self, operation: Operation, listener: F) -> TransactionResult<()>
    where
        F: Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Ok(self.shared.hooks().register(operation, Phase::After, listener)?)
    }

    /// Register a before listener by operation name.
    pub fn before_named<F>(&self, name: &str, listener: F) -> TransactionResult<()>
    where
        F: Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Ok(self
            .shared
            .hooks()
            .register_named(name, Phase::Before, listener)?)
    }

    /// Register an after listener by operation name.
    pub fn after_named<F>(&self, name: &str, listener: F) -> TransactionResult<()>
    where
        F: Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Ok(self
            .shared
            .hooks()
            .register_named(name, Phase::After, listener)?)
    }

    /// Snapshot of the pending delta.
    pub fn delta(&self) -> Delta {
        self.shared.state().delta.snapshot()
    }

    /// Check if anything is pending.
    pub fn has_changes(&self) -> bool {
        !self.shared.state().delta.is_empty()
    }

    /// Copy of the audit log entries.
    pub fn log(&self) -> Vec<LogEntry<Delta>> {
        self.shared.state().log.entries().to_vec()
    }

    /// Operations in the audit log, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.shared.state().log.operations()
    }

    /// Export the audit log as JSON.
    pub fn export_log(&self) -> TransactionResult<String> {
        Ok(self.shared.state().log.to_json()?)
    }

    /// Snapshot of the base record, without pending changes.
    pub fn record(&self) -> Record {
        lock(&self.shared.record).clone()
    }

    /// The shared base record.
    pub fn shared_record(&self) -> SharedRecord {
        Arc::clone(&self.shared.record)
    }

    /// The options this transaction was started with.
    pub fn options(&self) -> TransactionOptions {
        self.shared.options
    }
}

impl Clone for Transaction {
    fn clone(&self) -> Self {
        let (delta, clock) = {
            let state = self.shared.state();
            (state.delta.clone(), state.log.clock())
        };
        let shared = Shared::new(
            Arc::clone(&self.shared.record),
            self.shared.options,
            clock,
            delta,
        );
        tracing::debug!(fields = shared.state().delta.len(), "transaction forked");
        Self {
            shared: Arc::new(shared),
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("record", &self.record())
            .field("delta", &self.delta())
            .field("options", &self.shared.options)
            .finish()
    }
}
