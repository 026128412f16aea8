//! Shared type definitions for the Bazaar trading-history ledger.
//!
//! This crate is the single source of truth for the value objects that flow
//! through the storage layer: player profiles, shop and item snapshots,
//! logged trades, and the selector algebra used to query the history.
//! Everything here is an immutable snapshot constructed per request; none of
//! these types hold live game references or perform I/O.
//!
//! # Modules
//!
//! - [`profile`] -- Player profiles and live-session merging
//! - [`trade`] -- World, item and shop snapshots plus the logged trade
//! - [`selector`] -- Player and shop selector algebras
//! - [`history`] -- Pagination ranges and history request/result types
//! - [`checksum`] -- 32-bit content checksums used for dedup addressing
//! - [`error`] -- Validation error type

pub mod checksum;
pub mod error;
pub mod history;
pub mod profile;
pub mod selector;
pub mod trade;

// Re-export all public types at crate root for convenience.
pub use checksum::content_hash;
pub use error::ValidationError;
pub use history::{HistoryRequest, HistoryResult, Range};
pub use profile::{PlayerProfile, SessionInfo};
pub use selector::{PlayerSelector, ShopSelector};
pub use trade::{ItemInfo, LoggedTrade, ShopInfo, WorldInfo};
