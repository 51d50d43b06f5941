#![forbid(unsafe_code)]

//! Shared record, value and error types.

use std::fmt;

use serde_json::Map;
pub use serde_json::Value;
use thiserror::Error;

/// One row of a table: an open mapping from field name to value.
pub type Record = Map<String, Value>;

/// Errors surfaced by the emulator.
///
/// Storage failures are normally absorbed by the persistence layer; they only
/// reach callers through the slot API itself.
#[derive(Debug, Error)]
pub enum EmuError {
    /// I/O failure from a file-backed slot.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot could not be serialized or parsed.
    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The durable medium refused a write.
    #[error("slot '{key}': {reason}")]
    Slot {
        /// Slot key being written.
        key: String,
        /// Medium-specific failure.
        reason: SlotFailure,
    },
    /// A chain operator that the emulation does not understand.
    #[error("unsupported operator '{operator}' in {context}")]
    UnsupportedOperator {
        /// Operator name as supplied by the caller.
        operator: String,
        /// Chain method that received it.
        context: &'static str,
    },
    /// A live backend URL is configured, so the local emulator must not be used.
    #[error("remote backend configured at {url}; local emulation disabled")]
    RemoteBackendConfigured {
        /// The configured backend URL.
        url: String,
    },
}

/// Reason a durable slot rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFailure {
    /// The payload does not fit in the medium's remaining capacity.
    QuotaExceeded {
        /// Bytes the write needed.
        needed: usize,
        /// Capacity of the medium.
        capacity: usize,
    },
}

impl fmt::Display for SlotFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotFailure::QuotaExceeded { needed, capacity } => {
                write!(f, "quota exceeded ({needed} bytes > {capacity} bytes)")
            }
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EmuError>;

/// Strict equality between a stored field and a filter value.
///
/// Numbers compare by numeric value so `1` matches `1.0`; everything else uses
/// structural equality.
pub fn strict_eq(field: &Value, expected: &Value) -> bool {
    match (field, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => field == expected,
    }
}

/// Converts a JSON object into a record; any other value yields an empty one.
pub fn to_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// Returns true when `record[column]` exists and strictly equals `value`.
pub fn field_matches(record: &Record, column: &str, value: &Value) -> bool {
    record
        .get(column)
        .map(|field| strict_eq(field, value))
        .unwrap_or(false)
}
