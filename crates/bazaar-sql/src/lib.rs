//! Dialect-agnostic SQL generation for the Bazaar trading-history ledger.
//!
//! This crate produces DDL and query text without ever touching a database
//! connection. Schema objects are described with two-phase builders: a
//! mutable builder type collects the definition and a terminal `build()`
//! produces an immutable value that only generates SQL. Redefining a schema
//! object after its SQL may have been generated and cached is therefore
//! impossible at the type level.
//!
//! The two supported dialects (SQLite and MySQL) differ only in a small set
//! of keywords and capabilities, captured by [`SqlDialect`]; everything else
//! is shared text generation.
//!
//! # Modules
//!
//! - [`dialect`] -- Dialect capabilities and the neutral column type
//! - [`schema`] -- Tables, columns, foreign keys, indices, triggers, views
//! - [`combined`] -- Combined views: recursive foreign-key flattening
//! - [`error`] -- Schema definition errors

pub mod combined;
pub mod dialect;
pub mod error;
pub mod schema;

pub use combined::{CombinedView, CombinedViewBuilder, ForeignKeyJoin, select_combined_sql};
pub use dialect::{ColumnType, SqlDialect, qualified, quote_ident};
pub use error::SchemaError;
pub use schema::{
    Column, ForeignKey, Index, IndexBuilder, Table, TableBuilder, Trigger, TriggerBuilder,
    TriggerEvent, View, last_modified_trigger,
};

/// The default delimiter between role names in combined-view column aliases.
pub const DEFAULT_ROLE_DELIMITER: &str = "_";
