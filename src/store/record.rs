//! Stored records
//!
//! A record is a field map plus three system fields: `id`, `createdAt`
//! and `updatedAt`. The id is assigned on insert and never changes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::predicate::canonical_timestamp;

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier, unique within the collection
    pub id: u64,

    /// User-declared fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Creates a record stamped with the given time.
    pub fn new(id: u64, fields: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reads a field, system fields included.
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::from(self.id)),
            "createdAt" => Some(Value::String(canonical_timestamp(&self.created_at))),
            "updatedAt" => Some(Value::String(canonical_timestamp(&self.updated_at))),
            other => self.fields.get(other).cloned(),
        }
    }

    /// Reads an integer field as an id reference.
    pub fn reference(&self, field: &str) -> Option<u64> {
        self.fields.get(field).and_then(Value::as_u64)
    }

    /// Merges `changes` into the field map and advances `updatedAt`.
    pub fn apply(&mut self, changes: &Map<String, Value>, now: DateTime<Utc>) {
        for (key, value) in changes {
            self.fields.insert(key.clone(), value.clone());
        }
        self.touch(now);
    }

    /// Advances `updatedAt` to `now`, or just past the previous value when the
    /// clock has not moved forward.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = later_than(self.updated_at, now);
    }

    /// Serializes the record as a flat JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Returns `now` if it is after `previous`, otherwise `previous` plus one microsecond.
pub fn later_than(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
