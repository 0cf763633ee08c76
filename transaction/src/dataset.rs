//! Fan-out transaction over a collection of records.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use overlay_core::{Operation, Record, SharedRecord};
use overlay_journal::{AuditLog, Clock, LogEntry, LogId, SystemClock};

use crate::error::{TransactionError, TransactionResult};
use crate::hooks::{self, EventHooks, HookArgs, ListenerError, Phase};
use crate::options::TransactionOptions;
use crate::timer::{self, Expire, TimeoutListener, TimeoutSlot};
use crate::transaction::Transaction;

/// Merged state of every member, in member order.
pub type DatasetSnapshot = Vec<Record>;

struct DatasetShared {
    members: Vec<Transaction>,
    log: Mutex<AuditLog<DatasetSnapshot>>,
    hooks: Mutex<EventHooks>,
    timeout: Mutex<TimeoutSlot>,
}

impl DatasetShared {
    fn log(&self) -> MutexGuard<'_, AuditLog<DatasetSnapshot>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hooks(&self) -> MutexGuard<'_, EventHooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> DatasetSnapshot {
        self.members.iter().map(|m| m.view().to_record()).collect()
    }

    fn record(&self, operation: Operation) {
        let snapshot = self.snapshot();
        self.log().append(operation, snapshot);
    }

    fn emit(&self, operation: Operation, phase: Phase, args: &HookArgs<'_>) -> Result<(), ListenerError> {
        let listeners = self.hooks().listeners(operation, phase);
        hooks::run(&listeners, args)
    }

    /// Apply `action` to every member in index order, stopping at the first failure.
    fn each<F>(&self, mut action: F) -> TransactionResult<()>
    where
        F: FnMut(&Transaction) -> TransactionResult<()>,
    {
        for (index, member) in self.members.iter().enumerate() {
            action(member).map_err(|e| TransactionError::member(index, e))?;
        }
        Ok(())
    }

    fn commit(&self) -> TransactionResult<()> {
        self.record(Operation::Commit);
        self.emit(Operation::Commit, Phase::Before, &HookArgs::None)?;
        self.each(Transaction::commit)?;
        self.emit(Operation::Commit, Phase::After, &HookArgs::None)?;
        tracing::debug!(members = self.members.len(), "dataset committed");
        Ok(())
    }

    fn rollback(&self) -> TransactionResult<()> {
        self.record(Operation::Rollback);
        self.emit(Operation::Rollback, Phase::Before, &HookArgs::None)?;
        self.each(Transaction::rollback)?;
        self.emit(Operation::Rollback, Phase::After, &HookArgs::None)?;
        tracing::debug!(members = self.members.len(), "dataset rolled back");
        Ok(())
    }
}

impl Expire for DatasetShared {
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

/// A transaction coordinating one member transaction per record.
///
/// Lifecycle operations run on the members sequentially, in index order.
/// There is no atomicity across members: if member `i` fails, members before
/// it keep their committed changes and the error names `i`.
///
/// The dataset's own log snapshots the merged state of every member, which
/// is what [`rollback_to`](Self::rollback_to) restores from.
pub struct Dataset {
    shared: Arc<DatasetShared>,
}

impl Dataset {
    /// Start one member transaction per record.
    pub fn start<I>(records: I) -> Self
    where
        I: IntoIterator<Item = SharedRecord>,
    {
        Self::start_with(records, TransactionOptions::default())
    }

    /// Start with the given member options.
    pub fn start_with<I>(records: I, options: TransactionOptions) -> Self
    where
        I: IntoIterator<Item = SharedRecord>,
    {
        Self::start_with_clock(records, options, Arc::new(SystemClock))
    }

    /// Start with every log stamped by `clock`.
    pub fn start_with_clock<I>(records: I, options: TransactionOptions, clock: Arc<dyn Clock>) -> Self
    where
        I: IntoIterator<Item = SharedRecord>,
    {
        let members: Vec<Transaction> = records
            .into_iter()
            .map(|record| Transaction::start_with_clock(record, options, Arc::clone(&clock)))
            .collect();
        let shared = DatasetShared {
            members,
            log: Mutex::new(AuditLog::with_clock(clock)),
            hooks: Mutex::new(EventHooks::new()),
            timeout: Mutex::new(TimeoutSlot::default()),
        };
        shared.record(Operation::Started);
        tracing::debug!(members = shared.members.len(), "dataset started");
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Member transactions, in record order.
    pub fn members(&self) -> &[Transaction] {
        &self.shared.members
    }

    /// Member transaction at `index`.
    pub fn member(&self, index: usize) -> Option<&Transaction> {
        self.shared.members.get(index)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.shared.members.len()
    }

    /// Check if there are no members.
    pub fn is_empty(&self) -> bool {
        self.shared.members.is_empty()
    }

    /// Merged state of every member.
    pub fn snapshot(&self) -> DatasetSnapshot {
        self.shared.snapshot()
    }

    /// Commit every member in index order. Cancels an armed timeout.
    pub fn commit(&self) -> TransactionResult<()> {
        self.cancel_timeout();
        self.shared.commit()
    }

    /// Roll back every member in index order. Cancels an armed timeout.
    pub fn rollback(&self) -> TransactionResult<()> {
        self.cancel_timeout();
        self.shared.rollback()
    }

    /// Restore every member to the state recorded by log entry `id`.
    ///
    /// For each member: fields absent from the recorded state are removed,
    /// recorded fields are written back, and the member is committed at once.
    /// Fails with [`TransactionError::RollbackTargetNotFound`] and logs
    /// nothing if the id is unknown.
    pub fn rollback_to(&self, id: LogId) -> TransactionResult<()> {
        let target = self
            .shared
            .log()
            .find_by_id(id)
            .map(|entry| entry.delta.clone())
            .ok_or_else(|| {
                tracing::warn!(id, "rollback target not found");
                TransactionError::rollback_target_not_found(id)
            })?;

        self.cancel_timeout();
        self.shared.record(Operation::Rollback);
        self.shared
            .emit(Operation::Rollback, Phase::Before, &HookArgs::None)?;
        for (index, member) in self.shared.members.iter().enumerate() {
            let Some(fields) = target.get(index) else {
                continue;
            };
            restore(member, fields).map_err(|e| TransactionError::member(index, e))?;
        }
        self.shared
            .emit(Operation::Rollback, Phase::After, &HookArgs::None)?;
        tracing::debug!(id, members = self.len(), "dataset restored");
        Ok(())
    }

    /// Reserved for undoing the last commit; only logs and runs listeners.
    pub fn revoke(&self) -> TransactionResult<()> {
        self.shared.record(Operation::Revoke);
        self.shared
            .emit(Operation::Revoke, Phase::Before, &HookArgs::None)?;
        self.shared
            .emit(Operation::Revoke, Phase::After, &HookArgs::None)?;
        Ok(())
    }

    /// Commit or roll back the whole dataset automatically after `delay`.
    ///
    /// Same contract as [`Transaction::timeout`].
    pub fn timeout(
        &self,
        delay: Duration,
        commit_on_expiry: bool,
        listener: Option<TimeoutListener>,
    ) -> TransactionResult<()> {
        self.shared.record(Operation::Timeout);
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
            tracing::info!("dataset timeout cancelled");
        }
        cancelled
    }

    /// The action an armed timeout will take: `Some(true)` for commit.
    pub fn pending_timeout(&self) -> Option<bool> {
        self.shared.timeout_slot().pending_action()
    }

    /// Register a listener to run before a dataset operation.
    pub fn before<F>(&self, operation: Operation, listener: F) -> TransactionResult<()>
    where
        F: Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Ok(self.shared.hooks().register(operation, Phase::Before, listener)?)
    }

    /// Register a listener to run after a dataset operation.
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

    /// Copy of the dataset audit log entries.
    pub fn log(&self) -> Vec<LogEntry<DatasetSnapshot>> {
        self.shared.log().entries().to_vec()
    }

    /// Operations in the dataset audit log, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.shared.log().operations()
    }

    /// Export the dataset audit log as JSON.
    pub fn export_log(&self) -> TransactionResult<String> {
        Ok(self.shared.log().to_json()?)
    }
}

/// Bring a member's merged state to exactly `fields`, then commit it.
fn restore(member: &Transaction, fields: &Record) -> TransactionResult<()> {
    let view = member.view();
    for key in view.keys() {
        if !fields.contains_key(&key) {
            view.remove(&key)?;
        }
    }
    for (key, value) in fields.iter() {
        view.set(key, value.clone())?;
    }
    member.commit()
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("members", &self.shared.members)
            .finish()
    }
}
