//! Error types for the storage layer.
//!
//! Everything operational funnels into [`StorageError`]. Transient failures
//! (a dropped connection, lock contention) are retried by the connector up to
//! a fixed bound; logical failures (a missing profile, a malformed row, a
//! call after shutdown) surface immediately and are never retried.

use uuid::Uuid;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying database driver reported a failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema object was declared incorrectly.
    #[error("invalid schema definition: {0}")]
    Schema(#[from] bazaar_sql::SchemaError),

    /// The storage configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection could not be (re-)established.
    #[error("could not establish database connection after {attempts} attempts")]
    Connection {
        /// How many attempts were made before giving up.
        attempts: u32,
        /// The error of the final attempt.
        #[source]
        source: sqlx::Error,
    },

    /// The component has been shut down; no further operations are allowed.
    #[error("storage has been shut down")]
    Shutdown,

    /// A dedup row could neither be found nor inserted.
    ///
    /// This happens when a conflict-ignoring insert is swallowed because an
    /// external writer raced the same content; the retry layer re-runs the
    /// lookup.
    #[error("could not find or insert {kind}")]
    Dedup {
        /// The kind of dedup row ("item", "shop", ...).
        kind: &'static str,
    },

    /// No profile is stored for the given player.
    #[error("player profile not found: {0}")]
    ProfileNotFound(Uuid),

    /// A stored row could not be mapped back into a value object.
    #[error("malformed row: {0}")]
    Decode(String),
}

impl StorageError {
    /// Whether the connector's retry loop should re-attempt the operation.
    ///
    /// Only operational failures are retryable; logical errors and contract
    /// violations surface immediately.
    pub(crate) const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Connection { .. } | Self::Dedup { .. }
        )
    }
}
