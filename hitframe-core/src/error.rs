//! Error types for hitframe-core.

use thiserror::Error;

/// Result type alias for hitframe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for hit-table operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is absent from the source.
    #[error("required field {0:?} is not present in the source")]
    MissingField(String),

    /// Event-key column decreases somewhere.
    #[error("event key field {field:?} decreases at hit {position}")]
    UnsortedKey { field: String, position: usize },

    /// Negative entry in a per-event hit-count table.
    #[error("negative hit count {count} for event {event}")]
    MalformedCounts { event: usize, count: i64 },

    /// Event index outside the table.
    #[error("event index {index} out of range for {n_events} events")]
    EventIndexOutOfRange { index: usize, n_events: usize },

    /// Flat hit index outside the table.
    #[error("hit index {index} out of range for {n_hits} hits")]
    HitIndexOutOfRange { index: usize, n_hits: usize },

    /// Requested field is not in the schema.
    #[error("unknown field {field:?}; available fields: {}", .available.join(", "))]
    UnknownField {
        field: String,
        available: Vec<String>,
    },

    /// Field name registered twice.
    #[error("duplicate field {0:?}")]
    DuplicateField(String),

    /// Field length matches neither the event count nor the hit count.
    #[error("field {field:?} has {len} entries; expected {n_events} (event-wise) or {n_hits} (hit-wise)")]
    FieldLength {
        field: String,
        len: usize,
        n_events: usize,
        n_hits: usize,
    },

    /// Operation applied to a column of the wrong type.
    #[error("field {field:?} is {actual}, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Two tables disagree on schema or shape.
    #[error("table mismatch: {0}")]
    TableMismatch(String),
}
