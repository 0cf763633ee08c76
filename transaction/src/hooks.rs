//! Before/after listeners for lifecycle operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use overlay_core::{CoreError, CoreResult, Operation, Value};
use thiserror::Error;

/// Failure reported by a listener.
#[derive(Debug, Clone, Error)]
#[error("listener failed: {message}")]
pub struct ListenerError {
    pub message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Arguments handed to listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HookArgs<'a> {
    /// The operation takes no arguments.
    None,
    /// The timeout duration.
    Timeout(Duration),
    /// A field access. `value` is the written value for `set` (absent for a
    /// removal), and the read value for `get` once it is known.
    Field {
        name: &'a str,
        value: Option<&'a Value>,
    },
}

/// When a listener runs relative to the state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    After,
}

/// A registered listener.
pub type Listener = Arc<dyn Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync>;

/// Per-transaction registry of listeners, keyed by operation and phase.
#[derive(Default)]
pub struct EventHooks {
    listeners: HashMap<(Operation, Phase), Vec<Listener>>,
}

impl EventHooks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn register<F>(&mut self, operation: Operation, phase: Phase, listener: F) -> CoreResult<()>
    where
        F: Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        if !operation.is_hookable() {
            return Err(CoreError::unknown_operation(operation.name()));
        }
        self.listeners
            .entry((operation, phase))
            .or_default()
            .push(Arc::new(listener));
        Ok(())
    }

    /// Register a listener by operation name.
    pub fn register_named<F>(&mut self, name: &str, phase: Phase, listener: F) -> CoreResult<()>
    where
        F: Fn(&HookArgs<'_>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let operation = Operation::parse_hookable(name)?;
        self.register(operation, phase, listener)
    }

    /// Listeners for an operation and phase, in registration order.
    ///
    /// Returned by value so they can run without holding any lock.
    pub fn listeners(&self, operation: Operation, phase: Phase) -> Vec<Listener> {
        self.listeners
            .get(&(operation, phase))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of listeners for an operation and phase.
    pub fn count(&self, operation: Operation, phase: Phase) -> usize {
        self.listeners
            .get(&(operation, phase))
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .listeners
            .iter()
            .map(|((op, phase), list)| (op.name(), *phase, list.len()))
            .collect();
        counts.sort_by_key(|(name, phase, _)| (*name, *phase == Phase::After));
        f.debug_struct("EventHooks").field("listeners", &counts).finish()
    }
}

/// Run listeners in order; the first failure stops the rest.
pub(crate) fn run(listeners: &[Listener], args: &HookArgs<'_>) -> Result<(), ListenerError> {
    for listener in listeners {
        listener(args)?;
    }
    Ok(())
}
