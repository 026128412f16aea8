//! SQL persistence for the Bazaar trading-history ledger.
//!
//! One [`Storage`] instance owns one storage backend: a single, strictly
//! serialized database connection (SQLite or MySQL, chosen by URL) plus the
//! player and trade-history storage components built on top of it.
//!
//! # Architecture
//!
//! ```text
//! Storage (façade)
//!     |
//!     +-- PlayerStore   (profiles: upsert, lookup by uuid/name)
//!     +-- HistoryStore  (dedup reference data + append-only trades,
//!     |                  selector-driven paginated queries)
//!     |
//!     +-- Connector     (one connection, serialized execute with retry,
//!                        get-or-insert dedup primitive, DDL helpers)
//! ```
//!
//! Schema text is generated by the `bazaar-sql` crate; the value objects
//! flowing in and out live in `bazaar-types`.
//!
//! # Modules
//!
//! - [`storage`] -- The façade tying everything together
//! - [`players`] -- Player profile storage
//! - [`history`] -- Trade-history storage and the selector query engine
//! - [`connector`] -- Single-connection execution, retrying, dedup
//! - [`config`] -- Backend configuration
//! - [`error`] -- The storage error type

pub mod config;
pub mod connector;
pub mod error;
pub mod history;
pub mod players;
pub mod storage;

mod datetime;

// Re-export primary types for convenience.
pub use config::{DEFAULT_TABLE_PREFIX, StorageConfig};
pub use connector::Connector;
pub use error::StorageError;
pub use history::HistoryStore;
pub use players::{PlayerStore, StoredProfile};
pub use storage::Storage;
