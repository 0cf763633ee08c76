//! Common error types for the overlay.

use thiserror::Error;

/// Errors raised by core types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation name is not one of the known lifecycle operations.
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },
}

impl CoreError {
    pub fn unknown_operation(name: impl Into<String>) -> Self {
        Self::UnknownOperation { name: name.into() }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
