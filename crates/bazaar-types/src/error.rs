//! Validation errors for value object construction.

use chrono::{DateTime, Utc};

/// A value object constructor was handed data that violates its invariants.
///
/// These are programming errors on the caller's side, not operational
/// failures; they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required string field was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A numeric field that must be at least one was zero.
    #[error("{0} must be positive")]
    NotPositive(&'static str),

    /// A range's end index was not greater than its start index.
    #[error("range end index ({end}) must be greater than start index ({start})")]
    EmptyRange {
        /// The offending start index.
        start: usize,
        /// The offending end index.
        end: usize,
    },

    /// A profile's first-seen timestamp was after its last-seen timestamp.
    #[error("first seen ({first_seen}) is after last seen ({last_seen})")]
    SeenOutOfOrder {
        /// The offending first-seen timestamp.
        first_seen: DateTime<Utc>,
        /// The offending last-seen timestamp.
        last_seen: DateTime<Utc>,
    },
}
