//! Lifecycle operation names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// A lifecycle operation, as recorded in the audit log and addressed by hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Transaction was started.
    Started,
    /// A field was written through the view.
    Set,
    /// A field was read through the view.
    Get,
    /// Pending changes were applied to the record.
    Commit,
    /// Pending changes were discarded.
    Rollback,
    /// Reserved: undo of the last committed operation.
    Revoke,
    /// An automatic commit or rollback was scheduled.
    Timeout,
}

impl Operation {
    /// Operations that accept before/after listeners.
    pub const HOOKABLE: [Operation; 6] = [
        Operation::Commit,
        Operation::Rollback,
        Operation::Revoke,
        Operation::Timeout,
        Operation::Set,
        Operation::Get,
    ];

    /// The lowercase name used in logs and hook registration.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Started => "started",
            Operation::Set => "set",
            Operation::Get => "get",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
            Operation::Revoke => "revoke",
            Operation::Timeout => "timeout",
        }
    }

    /// Whether listeners can be registered for this operation.
    ///
    /// `started` is logged before anyone could have registered a listener.
    pub fn is_hookable(self) -> bool {
        self != Operation::Started
    }

    /// Parse a hookable operation name.
    pub fn parse_hookable(name: &str) -> CoreResult<Self> {
        let op: Operation = name.parse()?;
        if op.is_hookable() {
            Ok(op)
        } else {
            Err(CoreError::unknown_operation(name))
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Operation::Started),
            "set" => Ok(Operation::Set),
            "get" => Ok(Operation::Get),
            "commit" => Ok(Operation::Commit),
            "rollback" => Ok(Operation::Rollback),
            "revoke" => Ok(Operation::Revoke),
            "timeout" => Ok(Operation::Timeout),
            other => Err(CoreError::unknown_operation(other)),
        }
    }
}
