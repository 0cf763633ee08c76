//! Cancellable deferred actions.
//!
//! A timeout schedules an automatic commit or rollback. Any manual commit or
//! rollback cancels it, and firing claims the armed slot under a lock, so the
//! scheduled action can never run after a competing manual action.

use std::sync::{Arc, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{TransactionError, TransactionResult};

/// Called once with `true` if the expiry committed, `false` if it rolled back.
pub type TimeoutListener = Box<dyn FnOnce(bool) + Send + 'static>;

/// Handle to a scheduled action.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Drop the action if it has not started yet.
    pub fn cancel(self) {
        self.task.abort();
    }

    /// Check if the action already ran or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Schedules actions on the ambient tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer;

impl Timer {
    /// Run `action` after `delay`.
    pub fn schedule<F>(delay: Duration, action: F) -> TransactionResult<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| TransactionError::NoRuntime)?;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        Ok(TimerHandle { task })
    }
}

#[derive(Debug)]
struct Armed {
    generation: u64,
    commit: bool,
    handle: TimerHandle,
}

/// The at-most-one timeout armed on a transaction.
#[derive(Debug, Default)]
pub(crate) struct TimeoutSlot {
    armed: Option<Armed>,
    next_generation: u64,
}

impl TimeoutSlot {
    /// Cancel the armed timeout. Returns true if one was armed.
    pub(crate) fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) => {
                armed.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Take the armed timeout if it is still the one with this generation.
    fn claim(&mut self, generation: u64) -> bool {
        match &self.armed {
            Some(armed) if armed.generation == generation => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    /// The action the armed timeout will take: `Some(true)` for commit.
    pub(crate) fn pending_action(&self) -> Option<bool> {
        self.armed.as_ref().map(|armed| armed.commit)
    }
}

/// Something a timeout can commit or roll back.
pub(crate) trait Expire: Send + Sync + 'static {
    /// The timeout slot, locked.
    fn timeout_slot(&self) -> MutexGuard<'_, TimeoutSlot>;

    /// Commit (`true`) or roll back (`false`) without touching the slot.
    fn expire(&self, commit: bool) -> TransactionResult<()>;
}

/// Arm a timeout on `target`, replacing any armed one.
///
/// A zero delay only disarms.
pub(crate) fn arm<T: Expire>(
    target: &Arc<T>,
    delay: Duration,
    commit: bool,
    listener: Option<TimeoutListener>,
) -> TransactionResult<()> {
    // Hold the slot across scheduling so the task cannot claim before it is stored.
    let mut slot = target.timeout_slot();
    if slot.cancel() {
        tracing::info!("replaced armed timeout");
    }
    if delay.is_zero() {
        return Ok(());
    }

    let generation = slot.next_generation;
    slot.next_generation += 1;

    let weak = Arc::downgrade(target);
    let handle = Timer::schedule(delay, move || fire(weak, generation, commit, listener))?;
    slot.armed = Some(Armed {
        generation,
        commit,
        handle,
    });
    tracing::info!(delay_ms = delay.as_millis() as u64, commit, "timeout armed");
    Ok(())
}

fn fire<T: Expire>(target: Weak<T>, generation: u64, commit: bool, listener: Option<TimeoutListener>) {
    let Some(target) = target.upgrade() else {
        return;
    };
    if !target.timeout_slot().claim(generation) {
        tracing::debug!(generation, "stale timeout dropped");
        return;
    }

    match target.expire(commit) {
        Ok(()) => {
            tracing::info!(commit, "timeout expired");
            if let Some(listener) = listener {
                listener(commit);
            }
        }
        Err(error) => {
            tracing::warn!(%error, commit, "timeout action failed");
        }
    }
}
