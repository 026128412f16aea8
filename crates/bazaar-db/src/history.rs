//! Trade-history storage: deduplicated reference data, the append-only
//! trades table, and the selector-driven query engine.
//!
//! Writes intern every piece of reference data (player, items, world, owner,
//! shop) through the get-or-insert dedup primitive inside one transaction,
//! then append the trade row referencing the resolved ids. Reads compile the
//! request's selectors into one of a fixed set of pre-built statement
//! templates against the combined trades view, count first, then fetch the
//! requested page.

use std::sync::Arc;
use std::time::Duration;

use bazaar_sql::{
    ColumnType, CombinedView, CombinedViewBuilder, ForeignKey, ForeignKeyJoin, Index,
    IndexBuilder, SchemaError, SqlDialect, Table, TableBuilder, quote_ident,
};
use bazaar_types::{
    HistoryRequest, HistoryResult, ItemInfo, LoggedTrade, PlayerSelector, ShopInfo, ShopSelector,
    WorldInfo, content_hash,
};
use sqlx::any::AnyRow;
use sqlx::AnyConnection;
use sqlx::{Connection, Row};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::connector::{self, Connector};
use crate::datetime::{format_datetime, parse_datetime};
use crate::error::StorageError;
use crate::players::{
    COL_ID, COL_NAME, COL_UUID, MYSQL_TABLE_EXTRA, PlayerStore, PlayersSchema, StoredProfile,
    parse_profile,
};

pub(crate) const ROLE_PLAYER: &str = "player";
pub(crate) const ROLE_SHOP: &str = "shop";
pub(crate) const ROLE_OWNER: &str = "owner";
pub(crate) const ROLE_WORLD: &str = "world";
pub(crate) const ROLE_ITEM1: &str = "item1";
pub(crate) const ROLE_ITEM2: &str = "item2";
pub(crate) const ROLE_RESULT_ITEM: &str = "result_item";

const COL_SERVER_ID: &str = "server_id";
const COL_TYPE: &str = "type";
const COL_DATA: &str = "data";
const COL_HASH: &str = "hash";
const COL_TIMESTAMP: &str = "timestamp";
const COL_X: &str = "x";
const COL_Y: &str = "y";
const COL_Z: &str = "z";

/// The history tables and their combined views.
pub(crate) struct HistorySchema {
    pub worlds: Table,
    pub worlds_indices: Vec<Index>,
    pub items: Table,
    pub items_indices: Vec<Index>,
    pub shops: Table,
    pub shops_indices: Vec<Index>,
    pub shops_view: CombinedView,
    pub trades: Table,
    pub trades_indices: Vec<Index>,
    pub trades_view: CombinedView,
}

fn required_fk<'a>(table: &'a Table, column: &str) -> Result<&'a ForeignKey, StorageError> {
    table.foreign_key_for(column).ok_or_else(|| {
        StorageError::Schema(SchemaError::IncompleteForeignKey {
            table: table.name().to_owned(),
        })
    })
}

impl HistorySchema {
    #[allow(clippy::too_many_lines)]
    fn new(prefix: &str, players: &PlayersSchema) -> Result<Self, StorageError> {
        let col_owner_id = format!("{ROLE_OWNER}_id");
        let col_world_id = format!("{ROLE_WORLD}_id");
        let col_player_id = format!("{ROLE_PLAYER}_id");
        let col_shop_id = format!("{ROLE_SHOP}_id");
        let col_item1_id = format!("{ROLE_ITEM1}_id");
        let col_item1_amount = format!("{ROLE_ITEM1}_amount");
        let col_item2_id = format!("{ROLE_ITEM2}_id");
        let col_item2_amount = format!("{ROLE_ITEM2}_amount");
        let col_result_item_id = format!("{ROLE_RESULT_ITEM}_id");
        let col_result_item_amount = format!("{ROLE_RESULT_ITEM}_amount");

        // worlds: the null world of a virtual shop is stored as the empty
        // string. The unique index is ordered (name, server_id) so it also
        // serves as the name index.
        let mut worlds = TableBuilder::new(format!("{prefix}worlds"));
        worlds
            .column(COL_ID, ColumnType::Integer)
            .primary_key()
            .auto_increment()
            .not_null();
        worlds
            .column(COL_SERVER_ID, ColumnType::VarChar(36))
            .not_null();
        worlds.column(COL_NAME, ColumnType::VarChar(128)).not_null();
        worlds.extra(MYSQL_TABLE_EXTRA);
        let worlds = worlds.build()?;
        let worlds_indices = vec![
            IndexBuilder::new()
                .table(worlds.name())
                .unique()
                .column(COL_NAME)
                .column(COL_SERVER_ID)
                .build()?,
        ];

        // items: indexed by a 32-bit hash over type and data, since indices
        // on large text columns are not reliably supported. Item data of
        // absent items is stored as the empty string.
        let mut items = TableBuilder::new(format!("{prefix}items"));
        items
            .column(COL_ID, ColumnType::Integer)
            .primary_key()
            .auto_increment()
            .not_null();
        items.column(COL_TYPE, ColumnType::VarChar(128)).not_null();
        items
            .column(COL_DATA, ColumnType::VarChar(16384))
            .not_null();
        items.column(COL_HASH, ColumnType::Integer).not_null();
        items.extra(MYSQL_TABLE_EXTRA);
        let items = items.build()?;
        let items_indices = vec![
            IndexBuilder::new().table(items.name()).column(COL_TYPE).build()?,
            IndexBuilder::new().table(items.name()).column(COL_HASH).build()?,
        ];

        // shops: historical snapshots, not live shop records. The same shop
        // uuid appears once per distinct (owner, name, location, ...)
        // combination, so rows are addressed by a content hash like items.
        // owner_id is null for admin shops.
        let mut shops = TableBuilder::new(format!("{prefix}shops"));
        shops
            .column(COL_ID, ColumnType::Integer)
            .primary_key()
            .auto_increment()
            .not_null();
        shops.column(COL_UUID, ColumnType::Char(36)).not_null();
        shops.column(COL_TYPE, ColumnType::VarChar(128)).not_null();
        shops.column(&col_owner_id, ColumnType::Integer);
        shops.column(COL_NAME, ColumnType::VarChar(128)).not_null();
        shops.column(&col_world_id, ColumnType::Integer).not_null();
        shops.column(COL_X, ColumnType::Integer).not_null();
        shops.column(COL_Y, ColumnType::Integer).not_null();
        shops.column(COL_Z, ColumnType::Integer).not_null();
        shops.column(COL_HASH, ColumnType::Integer).not_null();
        shops.foreign_key(&col_owner_id, players.table.name(), COL_ID);
        shops.foreign_key(&col_world_id, worlds.name(), COL_ID);
        shops.extra(MYSQL_TABLE_EXTRA);
        let shops = shops.build()?;
        let shops_indices = vec![
            IndexBuilder::new().table(shops.name()).column(COL_UUID).build()?,
            IndexBuilder::new().table(shops.name()).column(&col_owner_id).build()?,
            IndexBuilder::new().table(shops.name()).column(COL_NAME).build()?,
            IndexBuilder::new().table(shops.name()).column(&col_world_id).build()?,
            IndexBuilder::new().table(shops.name()).column(COL_HASH).build()?,
        ];
        let fk_owner = required_fk(&shops, &col_owner_id)?.clone();
        let fk_world = required_fk(&shops, &col_world_id)?.clone();
        let shops_view = CombinedViewBuilder::new(format!("{}_combined_view", shops.name()))
            .table(shops.clone())
            .join(ForeignKeyJoin::new(&shops, &players.table, ROLE_OWNER, &fk_owner)?)
            .join(ForeignKeyJoin::new(&shops, &worlds, ROLE_WORLD, &fk_world)?)
            .build()?;

        // trades: the append-only fact table.
        let mut trades = TableBuilder::new(format!("{prefix}trades"));
        trades
            .column(COL_ID, ColumnType::Integer)
            .primary_key()
            .auto_increment()
            .not_null();
        trades
            .column(COL_TIMESTAMP, ColumnType::DateTime)
            .not_null();
        trades.column(&col_player_id, ColumnType::Integer).not_null();
        trades.column(&col_shop_id, ColumnType::Integer).not_null();
        trades.column(&col_item1_id, ColumnType::Integer).not_null();
        trades
            .column(&col_item1_amount, ColumnType::Integer)
            .not_null();
        // item2 is optional; an absent item stores a null id and amount 0.
        trades.column(&col_item2_id, ColumnType::Integer);
        trades
            .column(&col_item2_amount, ColumnType::Integer)
            .not_null();
        trades
            .column(&col_result_item_id, ColumnType::Integer)
            .not_null();
        trades
            .column(&col_result_item_amount, ColumnType::Integer)
            .not_null();
        trades.foreign_key(&col_player_id, players.table.name(), COL_ID);
        trades.foreign_key(&col_shop_id, shops.name(), COL_ID);
        trades.foreign_key(&col_item1_id, items.name(), COL_ID);
        trades.foreign_key(&col_item2_id, items.name(), COL_ID);
        trades.foreign_key(&col_result_item_id, items.name(), COL_ID);
        trades.extra(MYSQL_TABLE_EXTRA);
        let trades = trades.build()?;
        let trades_indices = vec![
            IndexBuilder::new().table(trades.name()).column(COL_TIMESTAMP).build()?,
            IndexBuilder::new().table(trades.name()).column(&col_player_id).build()?,
            IndexBuilder::new().table(trades.name()).column(&col_shop_id).build()?,
            IndexBuilder::new().table(trades.name()).column(&col_item1_id).build()?,
            IndexBuilder::new().table(trades.name()).column(&col_item2_id).build()?,
            IndexBuilder::new().table(trades.name()).column(&col_result_item_id).build()?,
        ];

        let fk_player = required_fk(&trades, &col_player_id)?.clone();
        let fk_shop = required_fk(&trades, &col_shop_id)?.clone();
        let fk_item1 = required_fk(&trades, &col_item1_id)?.clone();
        let fk_item2 = required_fk(&trades, &col_item2_id)?.clone();
        let fk_result_item = required_fk(&trades, &col_result_item_id)?.clone();
        let trades_view = CombinedViewBuilder::new(format!("{}_combined_view", trades.name()))
            .table(trades.clone())
            .join(ForeignKeyJoin::new(&trades, &players.table, ROLE_PLAYER, &fk_player)?)
            .join(ForeignKeyJoin::new(&trades, &shops, ROLE_SHOP, &fk_shop)?)
            .join(ForeignKeyJoin::nested(
                &shops,
                ROLE_SHOP,
                &players.table,
                ROLE_OWNER,
                &fk_owner,
            )?)
            .join(ForeignKeyJoin::nested(
                &shops,
                ROLE_SHOP,
                &worlds,
                ROLE_WORLD,
                &fk_world,
            )?)
            .join(ForeignKeyJoin::new(&trades, &items, ROLE_ITEM1, &fk_item1)?)
            .join(ForeignKeyJoin::new(&trades, &items, ROLE_ITEM2, &fk_item2)?)
            .join(ForeignKeyJoin::new(&trades, &items, ROLE_RESULT_ITEM, &fk_result_item)?)
            .build()?;

        Ok(Self {
            worlds,
            worlds_indices,
            items,
            items_indices,
            shops,
            shops_indices,
            shops_view,
            trades,
            trades_indices,
            trades_view,
        })
    }
}

/// A fetch statement and its count variant: same filters, no ordering and no
/// pagination on the count.
struct TradeQuery {
    fetch: String,
    count: String,
}

fn trade_query(view_name: &str, order_col: &str, filter: Option<&str>) -> TradeQuery {
    let where_clause = filter.map(|f| format!(" WHERE {f}")).unwrap_or_default();
    TradeQuery {
        fetch: format!(
            "SELECT * FROM {view_name}{where_clause} \
             ORDER BY {order_col} DESC LIMIT ? OFFSET ?;",
        ),
        count: format!("SELECT COUNT(*) FROM {view_name}{where_clause};"),
    }
}

/// The all-players and single-player variants of one shop filter.
struct TradeQueryPair {
    all_players: TradeQuery,
    single_player: TradeQuery,
}

fn trade_query_pair(
    view_name: &str,
    order_col: &str,
    player_col: &str,
    filter: Option<&str>,
) -> TradeQueryPair {
    let single_filter = match filter {
        None => format!("{player_col}=?"),
        Some(f) => format!("{player_col}=? AND {f}"),
    };
    TradeQueryPair {
        all_players: trade_query(view_name, order_col, filter),
        single_player: trade_query(view_name, order_col, Some(&single_filter)),
    }
}

/// The prepared statement texts of the history storage.
///
/// The trade templates cover the full cross product of shop filters and
/// {all players, single player}; selector dispatch only ever picks one of
/// these, it never assembles SQL at query time.
struct HistoryQueries {
    get_world_id: String,
    add_world: String,
    get_item_id: String,
    add_item: String,
    get_shop_id: String,
    add_shop: String,
    add_trade: String,
    all: TradeQueryPair,
    admin_shops: TradeQueryPair,
    player_shops: TradeQueryPair,
    by_owner: TradeQueryPair,
    by_shop: TradeQueryPair,
    by_owned_shop: TradeQueryPair,
    by_shop_name: TradeQueryPair,
    by_owned_shop_name: TradeQueryPair,
}

impl HistoryQueries {
    fn new(schema: &HistorySchema, dialect: SqlDialect) -> Self {
        let ignore = dialect.insert_ignore();
        let worlds = schema.worlds.quoted_name();
        let items = schema.items.quoted_name();
        let shops = schema.shops.quoted_name();
        let trades = schema.trades.quoted_name();

        let id = quote_ident(COL_ID);
        let server_id = quote_ident(COL_SERVER_ID);
        let name = quote_ident(COL_NAME);
        let ty = quote_ident(COL_TYPE);
        let data = quote_ident(COL_DATA);
        let hash = quote_ident(COL_HASH);
        let uuid = quote_ident(COL_UUID);
        let owner_id = quote_ident(&format!("{ROLE_OWNER}_id"));
        let world_id = quote_ident(&format!("{ROLE_WORLD}_id"));
        let x = quote_ident(COL_X);
        let y = quote_ident(COL_Y);
        let z = quote_ident(COL_Z);
        let timestamp = quote_ident(COL_TIMESTAMP);
        let player_id = quote_ident(&format!("{ROLE_PLAYER}_id"));
        let shop_id = quote_ident(&format!("{ROLE_SHOP}_id"));
        let item1_id = quote_ident(&format!("{ROLE_ITEM1}_id"));
        let item1_amount = quote_ident(&format!("{ROLE_ITEM1}_amount"));
        let item2_id = quote_ident(&format!("{ROLE_ITEM2}_id"));
        let item2_amount = quote_ident(&format!("{ROLE_ITEM2}_amount"));
        let result_item_id = quote_ident(&format!("{ROLE_RESULT_ITEM}_id"));
        let result_item_amount = quote_ident(&format!("{ROLE_RESULT_ITEM}_amount"));

        let view = &schema.trades_view;
        let view_name = view.quoted_name();
        let view_player_id = view.quoted_column(&[ROLE_PLAYER], COL_ID);
        let view_owner_id = view.quoted_column(&[ROLE_SHOP, ROLE_OWNER], COL_ID);
        let view_shop_uuid = view.quoted_column(&[ROLE_SHOP], COL_UUID);
        let view_shop_name = view.quoted_column(&[ROLE_SHOP], COL_NAME);

        let pair = |filter: Option<String>| {
            trade_query_pair(&view_name, &timestamp, &view_player_id, filter.as_deref())
        };

        Self {
            get_world_id: format!(
                "SELECT {id} FROM {worlds} WHERE {server_id}=? AND {name}=? LIMIT 1;",
            ),
            add_world: format!("INSERT {ignore} INTO {worlds} ({server_id},{name}) VALUES(?,?);"),
            get_item_id: format!(
                "SELECT {id} FROM {items} WHERE {hash}=? AND {ty}=? AND {data}=? LIMIT 1;",
            ),
            add_item: format!("INSERT {ignore} INTO {items} ({ty},{data},{hash}) VALUES(?,?,?);"),
            get_shop_id: format!(
                "SELECT {id} FROM {shops} WHERE {hash}=? AND {uuid}=? AND {ty}=? \
                 AND ({owner_id}=? OR ({owner_id} IS NULL AND ? IS NULL)) \
                 AND {name}=? AND {world_id}=? AND {x}=? AND {y}=? AND {z}=? LIMIT 1;",
            ),
            add_shop: format!(
                "INSERT {ignore} INTO {shops} \
                 ({uuid},{ty},{owner_id},{name},{world_id},{x},{y},{z},{hash}) \
                 VALUES(?,?,?,?,?,?,?,?,?);",
            ),
            add_trade: format!(
                "INSERT {ignore} INTO {trades} \
                 ({timestamp},{player_id},{shop_id},{item1_id},{item1_amount},\
                 {item2_id},{item2_amount},{result_item_id},{result_item_amount}) \
                 VALUES(?,?,?,?,?,?,?,?,?);",
            ),
            all: pair(None),
            admin_shops: pair(Some(format!("{view_owner_id} IS NULL"))),
            player_shops: pair(Some(format!("{view_owner_id} IS NOT NULL"))),
            by_owner: pair(Some(format!("{view_owner_id}=?"))),
            by_shop: pair(Some(format!("{view_shop_uuid}=?"))),
            by_owned_shop: pair(Some(format!("{view_shop_uuid}=? AND {view_owner_id}=?"))),
            by_shop_name: pair(Some(format!("{view_shop_name}=?"))),
            by_owned_shop_name: pair(Some(format!("{view_shop_name}=? AND {view_owner_id}=?"))),
        }
    }
}

/// How a requested player or owner is resolved to a stored profile.
enum ProfileLookup {
    ByUuid(Uuid),
    ByName(String),
}

/// Storage component for logged trades.
pub struct HistoryStore {
    connector: Arc<Connector>,
    players: Arc<PlayerStore>,
    omit_item_data: bool,
    schema: HistorySchema,
    queries: HistoryQueries,
}

impl HistoryStore {
    /// Creates the component; no statements run until [`HistoryStore::setup`].
    pub(crate) fn new(
        connector: Arc<Connector>,
        players: Arc<PlayerStore>,
        config: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let schema = HistorySchema::new(config.table_prefix(), players.schema())?;
        let queries = HistoryQueries::new(&schema, connector.dialect());
        Ok(Self {
            connector,
            players,
            omit_item_data: config.omit_item_data(),
            schema,
            queries,
        })
    }

    /// Creates the history tables, indices and combined views.
    ///
    /// The combined views are dropped and recreated so they always match the
    /// current schema.
    pub(crate) async fn setup(&self) -> Result<(), StorageError> {
        let dialect = self.connector.dialect();
        let schema = &self.schema;
        self.connector
            .execute(async |conn| {
                let mut tx = conn.begin().await?;
                connector::create_table(&mut tx, dialect, &schema.worlds).await?;
                for index in &schema.worlds_indices {
                    connector::create_index(&mut tx, dialect, index).await?;
                }
                connector::create_table(&mut tx, dialect, &schema.items).await?;
                for index in &schema.items_indices {
                    connector::create_index(&mut tx, dialect, index).await?;
                }
                connector::create_table(&mut tx, dialect, &schema.shops).await?;
                for index in &schema.shops_indices {
                    connector::create_index(&mut tx, dialect, index).await?;
                }
                connector::drop_view(&mut tx, dialect, schema.shops_view.view()).await?;
                connector::create_combined_view(&mut tx, dialect, &schema.shops_view).await?;
                connector::create_table(&mut tx, dialect, &schema.trades).await?;
                for index in &schema.trades_indices {
                    connector::create_index(&mut tx, dialect, index).await?;
                }
                connector::drop_view(&mut tx, dialect, schema.trades_view.view()).await?;
                connector::create_combined_view(&mut tx, dialect, &schema.trades_view).await?;
                tx.commit().await?;
                Ok(())
            })
            .await?;
        tracing::debug!(table = self.schema.trades.name(), "history storage ready");
        Ok(())
    }

    // WRITE PATH

    /// Appends a trade to the ledger.
    ///
    /// All reference data is interned and the trade row inserted inside one
    /// transaction; any failure rolls the entire write back. Dedup rows
    /// resolved before a failure may remain, they are idempotent and shared
    /// with later trades.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] after shutdown, or a
    /// [`StorageError`] if the transaction fails.
    pub async fn log_trade(&self, trade: &LoggedTrade) -> Result<(), StorageError> {
        let timestamp = format_datetime(trade.timestamp());
        self.connector
            .execute(async |conn| {
                let mut tx = conn.begin().await?;

                let player_id = self
                    .players
                    .get_or_insert_profile(&mut tx, trade.player())
                    .await?;

                let item1_id = self.get_or_insert_item(&mut tx, trade.item_one()).await?;
                let item2_id = match trade.item_two() {
                    Some(item) => Some(self.get_or_insert_item(&mut tx, item).await?),
                    None => None,
                };
                let result_item_id = self
                    .get_or_insert_item(&mut tx, trade.result_item())
                    .await?;

                let shop_id = self.get_or_insert_shop(&mut tx, trade.shop()).await?;

                let item2_amount = trade.item_two().map_or(0, |item| i64::from(item.amount()));
                sqlx::query(&self.queries.add_trade)
                    .bind(timestamp.as_str())
                    .bind(player_id)
                    .bind(shop_id)
                    .bind(item1_id)
                    .bind(i64::from(trade.item_one().amount()))
                    .bind(item2_id)
                    .bind(item2_amount)
                    .bind(result_item_id)
                    .bind(i64::from(trade.result_item().amount()))
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(())
            })
            .await?;
        tracing::debug!(
            player = %trade.player().uuid(),
            shop = %trade.shop().uuid(),
            "trade logged",
        );
        Ok(())
    }

    /// Interns a world row and returns its id.
    async fn get_or_insert_world(
        &self,
        conn: &mut AnyConnection,
        world: &WorldInfo,
    ) -> Result<i64, StorageError> {
        let world_name = world.world_name().unwrap_or("");
        connector::get_or_insert_id(
            conn,
            "world",
            || {
                sqlx::query(&self.queries.get_world_id)
                    .bind(world.server_id())
                    .bind(world_name)
            },
            || {
                sqlx::query(&self.queries.add_world)
                    .bind(world.server_id())
                    .bind(world_name)
            },
        )
        .await
    }

    /// Interns an item row and returns its id. The amount is not part of the
    /// row; it is stored per trade.
    async fn get_or_insert_item(
        &self,
        conn: &mut AnyConnection,
        item: &ItemInfo,
    ) -> Result<i64, StorageError> {
        let data = if self.omit_item_data {
            ""
        } else {
            item.data().unwrap_or("")
        };
        // No delimiter, so the hash matches the type-only checksum whenever
        // the data is omitted.
        let hash = content_hash("", &[item.type_id(), data]);
        connector::get_or_insert_id(
            conn,
            "item",
            || {
                sqlx::query(&self.queries.get_item_id)
                    .bind(hash)
                    .bind(item.type_id())
                    .bind(data)
            },
            || {
                sqlx::query(&self.queries.add_item)
                    .bind(item.type_id())
                    .bind(data)
                    .bind(hash)
            },
        )
        .await
    }

    /// Interns a shop snapshot row (resolving its owner and world first) and
    /// returns its id.
    async fn get_or_insert_shop(
        &self,
        conn: &mut AnyConnection,
        shop: &ShopInfo,
    ) -> Result<i64, StorageError> {
        let owner_id = match shop.owner() {
            Some(owner) => Some(self.players.get_or_insert_profile(&mut *conn, owner).await?),
            None => None,
        };
        let world_id = self.get_or_insert_world(&mut *conn, shop.world()).await?;

        let uuid = shop.uuid().to_string();
        let hash = content_hash(
            "|",
            &[
                uuid.clone(),
                shop.type_id().to_owned(),
                owner_id.map(|id| id.to_string()).unwrap_or_default(),
                shop.name().to_owned(),
                world_id.to_string(),
                shop.x().to_string(),
                shop.y().to_string(),
                shop.z().to_string(),
            ],
        );

        connector::get_or_insert_id(
            conn,
            "shop",
            || {
                sqlx::query(&self.queries.get_shop_id)
                    .bind(hash)
                    .bind(uuid.as_str())
                    .bind(shop.type_id())
                    .bind(owner_id)
                    .bind(owner_id)
                    .bind(shop.name())
                    .bind(world_id)
                    .bind(shop.x())
                    .bind(shop.y())
                    .bind(shop.z())
            },
            || {
                sqlx::query(&self.queries.add_shop)
                    .bind(uuid.as_str())
                    .bind(shop.type_id())
                    .bind(owner_id)
                    .bind(shop.name())
                    .bind(world_id)
                    .bind(shop.x())
                    .bind(shop.y())
                    .bind(shop.z())
                    .bind(hash)
            },
        )
        .await
    }

    // READ PATH

    /// Answers a history request.
    ///
    /// The selectors are compiled up front: the player selector resolves to
    /// an optional player row-id filter, the shop selector picks one of the
    /// pre-built statement templates and resolves an optional owner row-id
    /// filter. A requested but unknown player or owner short-circuits to an
    /// empty result without running the trade query. Otherwise the total
    /// matching count is fetched first and the requested range resolved
    /// against it before the page itself is fetched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] after shutdown, or a
    /// [`StorageError`] if a query fails or a row cannot be decoded.
    pub async fn get_trading_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<HistoryResult, StorageError> {
        let player_lookup = match &request.player {
            PlayerSelector::All => None,
            PlayerSelector::ByUuid(uuid) => Some(ProfileLookup::ByUuid(*uuid)),
            PlayerSelector::ByName(name) => Some(ProfileLookup::ByName(name.clone())),
        };

        let (pair, shop_key, owner_lookup) = self.compile_shop_selector(&request.shop);
        let needs_owner_bind = owner_lookup.is_some();
        let range = request.range;

        self.connector
            .execute(async |conn| {
                let mut tx = conn.begin().await?;

                // Resolve the requested player and owner profiles. A
                // requested but unknown profile means an empty result.
                let player_profile = match &player_lookup {
                    None => None,
                    Some(lookup) => self.resolve_profile(&mut tx, lookup).await?,
                };
                if player_lookup.is_some() && player_profile.is_none() {
                    tx.commit().await?;
                    return Ok(HistoryResult::empty(None, None));
                }
                let owner_profile = match &owner_lookup {
                    None => None,
                    Some(lookup) => self.resolve_profile(&mut tx, lookup).await?,
                };
                if owner_lookup.is_some() && owner_profile.is_none() {
                    tx.commit().await?;
                    return Ok(HistoryResult::empty(
                        player_profile.map(StoredProfile::into_profile),
                        None,
                    ));
                }

                let player_id = player_profile.as_ref().map(StoredProfile::row_id);
                let owner_id = owner_profile.as_ref().map(StoredProfile::row_id);
                let query = if player_id.is_some() {
                    &pair.single_player
                } else {
                    &pair.all_players
                };

                // Total count first: resolves the range against the real
                // total and skips the fetch entirely when nothing matches.
                let mut count_query = sqlx::query(&query.count);
                if let Some(id) = player_id {
                    count_query = count_query.bind(id);
                }
                if let Some(key) = &shop_key {
                    count_query = count_query.bind(key.as_str());
                }
                if needs_owner_bind {
                    count_query = count_query.bind(owner_id);
                }
                let count_row = count_query.fetch_one(&mut *tx).await?;
                let total = usize::try_from(count_row.try_get::<i64, _>(0)?).unwrap_or(0);
                if total == 0 {
                    tx.commit().await?;
                    return Ok(HistoryResult {
                        trading_player: player_profile.map(StoredProfile::into_profile),
                        owner: owner_profile.map(StoredProfile::into_profile),
                        trades: Vec::new(),
                        total_trades: 0,
                    });
                }

                let start = range.start_index(total);
                let end = range.end_index(total);
                let mut fetch_query = sqlx::query(&query.fetch);
                if let Some(id) = player_id {
                    fetch_query = fetch_query.bind(id);
                }
                if let Some(key) = &shop_key {
                    fetch_query = fetch_query.bind(key.as_str());
                }
                if needs_owner_bind {
                    fetch_query = fetch_query.bind(owner_id);
                }
                let limit = i64::try_from(end.saturating_sub(start)).unwrap_or(i64::MAX);
                let offset = i64::try_from(start).unwrap_or(i64::MAX);
                let rows = fetch_query.bind(limit).bind(offset).fetch_all(&mut *tx).await?;
                tx.commit().await?;

                let mut trades = Vec::with_capacity(rows.len());
                for row in &rows {
                    trades.push(self.parse_trade(row)?);
                }
                Ok(HistoryResult {
                    trading_player: player_profile.map(StoredProfile::into_profile),
                    owner: owner_profile.map(StoredProfile::into_profile),
                    trades,
                    total_trades: total,
                })
            })
            .await
    }

    /// Picks the statement template pair, the shop key parameter and the
    /// owner lookup for a shop selector. Exhaustive by construction.
    fn compile_shop_selector(
        &self,
        selector: &ShopSelector,
    ) -> (&TradeQueryPair, Option<String>, Option<ProfileLookup>) {
        let queries = &self.queries;
        match selector {
            ShopSelector::All => (&queries.all, None, None),
            ShopSelector::AdminShops => (&queries.admin_shops, None, None),
            ShopSelector::PlayerShops => (&queries.player_shops, None, None),
            ShopSelector::ByOwnerUuid(uuid) => {
                (&queries.by_owner, None, Some(ProfileLookup::ByUuid(*uuid)))
            }
            ShopSelector::ByOwnerName(name) => (
                &queries.by_owner,
                None,
                Some(ProfileLookup::ByName(name.clone())),
            ),
            ShopSelector::ByShopUuid { uuid, owner } => match owner {
                Some(owner_uuid) => (
                    &queries.by_owned_shop,
                    Some(uuid.to_string()),
                    Some(ProfileLookup::ByUuid(*owner_uuid)),
                ),
                None => (&queries.by_shop, Some(uuid.to_string()), None),
            },
            ShopSelector::ByShopName { name, owner } => match owner {
                Some(owner_uuid) => (
                    &queries.by_owned_shop_name,
                    Some(name.clone()),
                    Some(ProfileLookup::ByUuid(*owner_uuid)),
                ),
                None => (&queries.by_shop_name, Some(name.clone()), None),
            },
        }
    }

    /// Resolves a player/owner lookup to a stored profile.
    ///
    /// Name lookups pick the profile with the most recent last-seen among
    /// all profiles sharing the name.
    async fn resolve_profile(
        &self,
        conn: &mut AnyConnection,
        lookup: &ProfileLookup,
    ) -> Result<Option<StoredProfile>, StorageError> {
        match lookup {
            ProfileLookup::ByUuid(uuid) => self.players.find_profile(conn, *uuid).await,
            ProfileLookup::ByName(name) => {
                Ok(self.players.find_profiles(conn, name).await?.into_iter().next())
            }
        }
    }

    // ROW PARSING

    /// Rebuilds a trade from a combined-view row via role-prefixed columns.
    fn parse_trade(&self, row: &AnyRow) -> Result<LoggedTrade, StorageError> {
        let delimiter = self.schema.trades_view.role_delimiter();

        let timestamp_text: String = row.try_get(COL_TIMESTAMP)?;
        let timestamp = parse_datetime(&timestamp_text)?;

        let player_prefix = format!("{ROLE_PLAYER}{delimiter}");
        let player = parse_profile(row, &player_prefix)?
            .ok_or_else(|| StorageError::Decode(String::from("trade row has no player")))?
            .into_profile();

        let shop = self.parse_shop(row)?;

        let item1_amount: i64 = row.try_get(format!("{ROLE_ITEM1}_amount").as_str())?;
        let item2_amount: i64 = row.try_get(format!("{ROLE_ITEM2}_amount").as_str())?;
        let result_item_amount: i64 =
            row.try_get(format!("{ROLE_RESULT_ITEM}_amount").as_str())?;

        let item_one = parse_item(row, ROLE_ITEM1, delimiter, item1_amount)?
            .ok_or_else(|| StorageError::Decode(String::from("trade row has no first item")))?;
        let item_two = parse_item(row, ROLE_ITEM2, delimiter, item2_amount)?;
        let result_item = parse_item(row, ROLE_RESULT_ITEM, delimiter, result_item_amount)?
            .ok_or_else(|| StorageError::Decode(String::from("trade row has no result item")))?;

        Ok(LoggedTrade::new(
            timestamp,
            player,
            shop,
            item_one,
            item_two,
            result_item,
        ))
    }

    fn parse_shop(&self, row: &AnyRow) -> Result<ShopInfo, StorageError> {
        let delimiter = self.schema.trades_view.role_delimiter();
        let shop_prefix = format!("{ROLE_SHOP}{delimiter}");
        let owner_prefix = format!("{shop_prefix}{ROLE_OWNER}{delimiter}");
        let world_prefix = format!("{shop_prefix}{ROLE_WORLD}{delimiter}");

        let uuid_text: String = row.try_get(format!("{shop_prefix}{COL_UUID}").as_str())?;
        let uuid = Uuid::parse_str(&uuid_text).map_err(|err| {
            StorageError::Decode(format!("invalid shop uuid '{uuid_text}': {err}"))
        })?;
        let type_id: String = row.try_get(format!("{shop_prefix}{COL_TYPE}").as_str())?;
        let owner = parse_profile(row, &owner_prefix)?.map(StoredProfile::into_profile);
        let name: String = row.try_get(format!("{shop_prefix}{COL_NAME}").as_str())?;
        let world = parse_world(row, &world_prefix)?;
        let x = parse_i32(row, &format!("{shop_prefix}{COL_X}"))?;
        let y = parse_i32(row, &format!("{shop_prefix}{COL_Y}"))?;
        let z = parse_i32(row, &format!("{shop_prefix}{COL_Z}"))?;

        ShopInfo::new(uuid, type_id, owner, name, world, x, y, z)
            .map_err(|err| StorageError::Decode(err.to_string()))
    }

    // EXTENSION POINTS

    /// Deletes trades older than the given age.
    ///
    /// Declared but not implemented; retention policy is an explicit
    /// extension point.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] after shutdown.
    pub async fn purge_trades_older_than(&self, max_age: Duration) -> Result<(), StorageError> {
        if self.connector.is_shutdown() {
            return Err(StorageError::Shutdown);
        }
        // TODO retention: delete trades past the cutoff, then run
        // perform_cleanup to collect the dedup rows they referenced.
        tracing::warn!(?max_age, "trade retention is not implemented");
        Ok(())
    }

    /// Removes dedup rows that no trade references anymore.
    ///
    /// Declared but not implemented; cleanup runs as an explicit
    /// garbage-collection pass, never as part of the write path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] after shutdown.
    pub async fn perform_cleanup(&self) -> Result<(), StorageError> {
        if self.connector.is_shutdown() {
            return Err(StorageError::Shutdown);
        }
        // TODO cleanup: delete items/shops/worlds/players with no remaining
        // references from the trades table.
        tracing::warn!("orphaned dedup row cleanup is not implemented");
        Ok(())
    }
}

fn parse_world(row: &AnyRow, prefix: &str) -> Result<WorldInfo, StorageError> {
    let server_id: String = row.try_get(format!("{prefix}{COL_SERVER_ID}").as_str())?;
    let name: String = row.try_get(format!("{prefix}{COL_NAME}").as_str())?;
    // The empty string marks the null world of a virtual shop.
    let name = if name.is_empty() { None } else { Some(name) };
    WorldInfo::new(server_id, name).map_err(|err| StorageError::Decode(err.to_string()))
}

/// Reads an item from its role-prefixed columns. A NULL type means the trade
/// has no item in this role.
fn parse_item(
    row: &AnyRow,
    role: &str,
    delimiter: &str,
    amount: i64,
) -> Result<Option<ItemInfo>, StorageError> {
    let type_id: Option<String> = row.try_get(format!("{role}{delimiter}{COL_TYPE}").as_str())?;
    let Some(type_id) = type_id else {
        return Ok(None);
    };
    let data: Option<String> = row.try_get(format!("{role}{delimiter}{COL_DATA}").as_str())?;
    let data = data.filter(|d| !d.is_empty());
    let amount = u32::try_from(amount).map_err(|err| {
        StorageError::Decode(format!("invalid amount {amount} for item '{type_id}': {err}"))
    })?;
    ItemInfo::new(type_id, data, amount)
        .map(Some)
        .map_err(|err| StorageError::Decode(err.to_string()))
}

fn parse_i32(row: &AnyRow, column: &str) -> Result<i32, StorageError> {
    let value: i64 = row.try_get(column)?;
    i32::try_from(value)
        .map_err(|err| StorageError::Decode(format!("value {value} in `{column}` overflows: {err}")))
}
