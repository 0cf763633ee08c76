//! Delta store for tracking pending field overrides.

use overlay_core::{Fields, Record, Value};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const REMOVE_KEY: &str = "$remove";
const SET_KEY: &str = "$set";

/// A pending change to one field.
///
/// Exported as the plain value for `Set` and as `{"$remove": true}` for a
/// pending removal. A set value that is itself a one-entry map keyed by
/// `$remove` or `$set` is wrapped as `{"$set": value}`, so every export
/// reads back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The field is pending removal from the record.
    Remove,
    /// The field is pending this value.
    Set(Value),
}

impl Change {
    /// The pending value, if this change sets one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Change::Set(value) => Some(value),
            Change::Remove => None,
        }
    }
}

/// Check if `value` is a one-entry map keyed by `key`.
fn is_marker(value: &Value, key: &str) -> bool {
    matches!(value.as_map(), Some(map) if map.len() == 1 && map.contains_key(key))
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Change::Remove => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REMOVE_KEY, &true)?;
                map.end()
            }
            Change::Set(value) if is_marker(value, REMOVE_KEY) || is_marker(value, SET_KEY) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(SET_KEY, value)?;
                map.end()
            }
            Change::Set(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Change {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if is_marker(&value, REMOVE_KEY) {
            return Ok(Change::Remove);
        }
        match value {
            Value::Map(mut map) if map.len() == 1 && map.contains_key(SET_KEY) => {
                Ok(Change::Set(map.remove(SET_KEY).unwrap_or_default()))
            }
            other => Ok(Change::Set(other)),
        }
    }
}

/// Snapshot of pending changes, keyed by field name in staging order.
pub type Delta = Fields<Change>;

/// Pending field-level overrides for one record.
///
/// A field present here always differs from the record's current value:
/// staging a value equal to the live base value drops the override instead.
#[derive(Debug, Clone, Default)]
pub struct DeltaStore {
    changes: Delta,
}

impl DeltaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from a snapshot.
    pub fn from_snapshot(changes: Delta) -> Self {
        Self { changes }
    }

    /// Get the pending change for a field.
    pub fn get(&self, field: &str) -> Option<&Change> {
        self.changes.get(field)
    }

    /// Stage a value for a field.
    ///
    /// `current` is the record's live value for the field. Returns true if an
    /// override is pending afterwards.
    pub fn set(&mut self, field: &str, value: Value, current: Option<&Value>) -> bool {
        if current == Some(&value) {
            self.changes.remove(field);
            return false;
        }
        self.changes.insert(field, Change::Set(value));
        true
    }

    /// Stage removal of a field.
    ///
    /// Returns true if a removal is pending afterwards; removing a field the
    /// record does not have just drops any pending value.
    pub fn remove(&mut self, field: &str, current: Option<&Value>) -> bool {
        if current.is_none() {
            self.changes.remove(field);
            return false;
        }
        self.changes.insert(field, Change::Remove);
        true
    }

    /// Check if a field has a pending change.
    pub fn has_change(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    /// Names of fields with pending changes, in staging order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.changes.keys()
    }

    /// Number of pending changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Drop every pending change.
    pub fn clear(&mut self) {
        self.changes.clear();
    }

    /// Deep copy of the pending changes.
    pub fn snapshot(&self) -> Delta {
        self.changes.clone()
    }

    /// Write every pending change into the record.
    pub fn apply_to(&self, record: &mut Record) {
        for (field, change) in self.changes.iter() {
            match change {
                Change::Set(value) => {
                    record.insert(field, value.clone());
                }
                Change::Remove => {
                    record.remove(field);
                }
            }
        }
    }

    /// Read a field through the delta, falling back to the record.
    pub fn resolve<'a>(&'a self, record: &'a Record, field: &str) -> Option<&'a Value> {
        match self.changes.get(field) {
            Some(change) => change.value(),
            None => record.get(field),
        }
    }

    /// Field names of the merged state.
    ///
    /// Record fields first in their own order, then fields that only exist
    /// as pending values, in staging order.
    pub fn merged_keys(&self, record: &Record) -> Vec<String> {
        let own = record
            .keys()
            .filter(|key| !matches!(self.changes.get(key), Some(Change::Remove)));
        let added = self
            .changes
            .iter()
            .filter(|(key, change)| matches!(change, Change::Set(_)) && !record.contains_key(key))
            .map(|(key, _)| key);
        own.chain(added).map(str::to_string).collect()
    }

    /// The merged state as a standalone record.
    pub fn merge(&self, record: &Record) -> Record {
        self.merged_keys(record)
            .into_iter()
            .filter_map(|key| {
                let value = self.resolve(record, &key).cloned()?;
                Some((key, value))
            })
            .collect()
    }
}
