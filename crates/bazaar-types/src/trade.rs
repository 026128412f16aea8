//! Snapshots of the things a trade touches: worlds, items, shops, and the
//! logged trade itself.
//!
//! None of these hold live game references. A [`ShopInfo`] in particular is a
//! historical snapshot: the same shop uuid can legitimately appear with
//! different names, owners or locations over time, and each distinct
//! combination becomes its own dedup row in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checksum::content_hash;
use crate::error::ValidationError;
use crate::profile::PlayerProfile;

// ---------------------------------------------------------------------------
// WorldInfo
// ---------------------------------------------------------------------------

/// The world a shop is located in.
///
/// `world_name` is `None` for virtual shops that are not located in any
/// world. Storage encodes the absent name as the empty string and converts it
/// back on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldInfo {
    server_id: String,
    world_name: Option<String>,
}

impl WorldInfo {
    /// Creates a world snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if the server id is empty, or if a
    /// world name is given but empty (an absent world is `None`, never `""`).
    pub fn new(
        server_id: impl Into<String>,
        world_name: Option<String>,
    ) -> Result<Self, ValidationError> {
        let server_id = server_id.into();
        if server_id.is_empty() {
            return Err(ValidationError::Empty("server id"));
        }
        if let Some(name) = &world_name {
            if name.is_empty() {
                return Err(ValidationError::Empty("world name"));
            }
        }
        Ok(Self {
            server_id,
            world_name,
        })
    }

    /// The id of the server the world belongs to.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The world name, or `None` for virtual shops.
    pub fn world_name(&self) -> Option<&str> {
        self.world_name.as_deref()
    }
}

// ---------------------------------------------------------------------------
// ItemInfo
// ---------------------------------------------------------------------------

/// A traded item: its type, an opaque serialized data string, and an amount.
///
/// The data string is produced by an external codec and is persisted and
/// compared but never interpreted here. It is `None` when the item carries no
/// extra data, or when persisting item data has been disabled by
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    type_id: String,
    data: Option<String>,
    amount: u32,
}

impl ItemInfo {
    /// Creates an item snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if the type id is empty, or
    /// [`ValidationError::NotPositive`] if the amount is zero. A stored
    /// amount of zero always means "no item", so a present item must have a
    /// positive amount.
    pub fn new(
        type_id: impl Into<String>,
        data: Option<String>,
        amount: u32,
    ) -> Result<Self, ValidationError> {
        let type_id = type_id.into();
        if type_id.is_empty() {
            return Err(ValidationError::Empty("item type"));
        }
        if amount == 0 {
            return Err(ValidationError::NotPositive("item amount"));
        }
        Ok(Self {
            type_id,
            data,
            amount,
        })
    }

    /// The serialized item type identifier.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// The opaque serialized item data, if any.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// The item amount, always positive.
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// The 32-bit checksum used to address this item's dedup row.
    ///
    /// Computed over type and data with no delimiter, so the hash of a
    /// data-less item equals the hash of its type alone. Collisions are
    /// resolved by the exact-match columns of the storage lookup.
    pub fn storage_hash(&self) -> i32 {
        content_hash("", &[self.type_id.as_str(), self.data.as_deref().unwrap_or("")])
    }
}

// ---------------------------------------------------------------------------
// ShopInfo
// ---------------------------------------------------------------------------

/// A historical snapshot of a shop at the moment a trade happened.
///
/// An absent owner marks an admin shop; that is the only admin-shop signal
/// the storage layer recognizes (never the type id). The name may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopInfo {
    uuid: Uuid,
    type_id: String,
    owner: Option<PlayerProfile>,
    name: String,
    world: WorldInfo,
    x: i32,
    y: i32,
    z: i32,
}

impl ShopInfo {
    /// Creates a shop snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if the type id is empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        uuid: Uuid,
        type_id: impl Into<String>,
        owner: Option<PlayerProfile>,
        name: impl Into<String>,
        world: WorldInfo,
        x: i32,
        y: i32,
        z: i32,
    ) -> Result<Self, ValidationError> {
        let type_id = type_id.into();
        if type_id.is_empty() {
            return Err(ValidationError::Empty("shop type"));
        }
        Ok(Self {
            uuid,
            type_id,
            owner,
            name: name.into(),
            world,
            x,
            y,
            z,
        })
    }

    /// The shop's unique id.
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The shop's type identifier.
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// The owning player, or `None` for admin shops.
    pub const fn owner(&self) -> Option<&PlayerProfile> {
        self.owner.as_ref()
    }

    /// Whether this is an admin shop (no owner).
    pub const fn is_admin_shop(&self) -> bool {
        self.owner.is_none()
    }

    /// The shop's name; may be empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The world the shop is located in.
    pub const fn world(&self) -> &WorldInfo {
        &self.world
    }

    /// The shop's x coordinate.
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// The shop's y coordinate.
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// The shop's z coordinate.
    pub const fn z(&self) -> i32 {
        self.z
    }
}

// ---------------------------------------------------------------------------
// LoggedTrade
// ---------------------------------------------------------------------------

/// A single completed trade, ready to be appended to the ledger.
///
/// The first item and the result item are always present; the second item is
/// optional. Trades are immutable and append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedTrade {
    timestamp: DateTime<Utc>,
    player: PlayerProfile,
    shop: ShopInfo,
    item_one: ItemInfo,
    item_two: Option<ItemInfo>,
    result_item: ItemInfo,
}

impl LoggedTrade {
    /// Creates a logged trade.
    pub const fn new(
        timestamp: DateTime<Utc>,
        player: PlayerProfile,
        shop: ShopInfo,
        item_one: ItemInfo,
        item_two: Option<ItemInfo>,
        result_item: ItemInfo,
    ) -> Self {
        Self {
            timestamp,
            player,
            shop,
            item_one,
            item_two,
            result_item,
        }
    }

    /// When the trade happened.
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The trading player.
    pub const fn player(&self) -> &PlayerProfile {
        &self.player
    }

    /// The shop snapshot the trade happened at.
    pub const fn shop(&self) -> &ShopInfo {
        &self.shop
    }

    /// The first offered item.
    pub const fn item_one(&self) -> &ItemInfo {
        &self.item_one
    }

    /// The second offered item, if any.
    pub const fn item_two(&self) -> Option<&ItemInfo> {
        self.item_two.as_ref()
    }

    /// The item the player received.
    pub const fn result_item(&self) -> &ItemInfo {
        &self.result_item
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn world_rejects_empty_names() {
        assert!(WorldInfo::new("", None).is_err());
        assert!(WorldInfo::new("server", Some(String::new())).is_err());
        assert!(WorldInfo::new("server", None).is_ok());
    }

    #[test]
    fn item_rejects_zero_amount() {
        let err = ItemInfo::new("emerald", None, 0);
        assert!(matches!(err, Err(ValidationError::NotPositive(_))));
    }

    #[test]
    fn item_hash_ignores_amount() {
        let one = ItemInfo::new("emerald", Some(String::from("data")), 1).unwrap();
        let many = ItemInfo::new("emerald", Some(String::from("data")), 64).unwrap();
        assert_eq!(one.storage_hash(), many.storage_hash());
    }

    #[test]
    fn item_hash_without_data_matches_type_hash() {
        let bare = ItemInfo::new("emerald", None, 1).unwrap();
        assert_eq!(bare.storage_hash(), content_hash("", &["emerald"]));
    }

    #[test]
    fn admin_shop_is_ownerless() {
        let world = WorldInfo::new("server", None).unwrap();
        let shop = ShopInfo::new(Uuid::new_v4(), "admin", None, "", world, 0, 0, 0).unwrap();
        assert!(shop.is_admin_shop());
        assert_eq!(shop.name(), "");
    }
}
