//! Selector algebras for history queries.
//!
//! Selectors form a closed set of filter variants. The storage layer matches
//! them exhaustively to pick a pre-built SQL statement; adding a variant is a
//! compile error at every dispatch site until it is handled.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Selects which trading player(s) a history query covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSelector {
    /// Trades of all players.
    All,
    /// Trades of the player with this unique id.
    ByUuid(Uuid),
    /// Trades of the player with this name.
    ///
    /// Names are not unique over time; the lookup resolves to the profile
    /// with the most recent last-seen among all profiles sharing the name.
    ByName(String),
}

impl PlayerSelector {
    /// A short identifier for display and error messages.
    pub fn identifier(&self) -> String {
        match self {
            Self::All => String::from("all"),
            Self::ByUuid(uuid) => uuid.to_string(),
            Self::ByName(name) => name.clone(),
        }
    }
}

/// Selects which shop(s) a history query covers.
///
/// Admin shops are exactly the shops without an owner; `AdminShops` and
/// `PlayerShops` partition `All`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShopSelector {
    /// Trades with any shop.
    All,
    /// Trades with shops that have no owner.
    AdminShops,
    /// Trades with shops that have an owner.
    PlayerShops,
    /// Trades with any shop owned by the player with this unique id.
    ByOwnerUuid(Uuid),
    /// Trades with any shop owned by the player with this name.
    ///
    /// Shortcut for looking up the owner by name first; if multiple players
    /// used the name, only the most recently seen one is considered.
    ByOwnerName(String),
    /// Trades with the shop with this unique id.
    ByShopUuid {
        /// The shop's unique id.
        uuid: Uuid,
        /// Additionally restrict to snapshots owned by this player, if set.
        owner: Option<Uuid>,
    },
    /// Trades with any shop with this name.
    ///
    /// Shop names are not unique; this may match several distinct shops.
    ByShopName {
        /// The shop name.
        name: String,
        /// Additionally restrict to snapshots owned by this player, if set.
        owner: Option<Uuid>,
    },
}

impl ShopSelector {
    /// A short identifier for display and error messages.
    pub fn identifier(&self) -> String {
        match self {
            Self::All => String::from("all"),
            Self::AdminShops => String::from("admin shops"),
            Self::PlayerShops => String::from("player shops"),
            Self::ByOwnerUuid(uuid) => uuid.to_string(),
            Self::ByOwnerName(name) => name.clone(),
            Self::ByShopUuid { uuid, .. } => uuid.to_string(),
            Self::ByShopName { name, .. } => name.clone(),
        }
    }
}
