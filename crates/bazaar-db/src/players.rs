//! Player profile storage.
//!
//! Profiles are dedup rows keyed by the player's uuid; the name and the
//! first/last-seen timestamps are payload. Unlike the other dedup tables the
//! players table supports guarded updates: newer session data overwrites the
//! stored name and last-seen, older data never does.

use std::sync::Arc;

use bazaar_sql::{ColumnType, Index, IndexBuilder, SqlDialect, Table, TableBuilder, quote_ident};
use bazaar_types::PlayerProfile;
use sqlx::Connection;
use sqlx::any::AnyRow;
use sqlx::AnyConnection;
use sqlx::Row;
use uuid::Uuid;

use crate::connector::{self, Connector};
use crate::datetime::{format_datetime, parse_datetime};
use crate::error::StorageError;

pub(crate) const COL_ID: &str = "id";
pub(crate) const COL_UUID: &str = "uuid";
pub(crate) const COL_NAME: &str = "name";
pub(crate) const COL_FIRST_SEEN: &str = "first_seen";
pub(crate) const COL_LAST_SEEN: &str = "last_seen";

/// Table attributes for MySQL: case sensitive comparison of utf8 text.
pub(crate) const MYSQL_TABLE_EXTRA: &str =
    "ENGINE = InnoDB, DEFAULT CHARSET = utf8mb4, DEFAULT COLLATE = utf8mb4_bin";

/// A profile together with the row id it is stored under.
///
/// The row id is what trade and shop rows reference; it never leaves the
/// storage layer's public results except through this wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
    row_id: i64,
    profile: PlayerProfile,
}

impl StoredProfile {
    /// The id of the row the profile is stored under.
    pub const fn row_id(&self) -> i64 {
        self.row_id
    }

    /// The stored profile.
    pub const fn profile(&self) -> &PlayerProfile {
        &self.profile
    }

    /// Unwraps into the plain profile.
    pub fn into_profile(self) -> PlayerProfile {
        self.profile
    }
}

/// The players table schema.
///
/// | id | uuid (unique index) | name (index) | first_seen | last_seen |
pub(crate) struct PlayersSchema {
    pub table: Table,
    pub indices: Vec<Index>,
}

impl PlayersSchema {
    fn new(prefix: &str) -> Result<Self, StorageError> {
        let mut builder = TableBuilder::new(format!("{prefix}players"));
        builder
            .column(COL_ID, ColumnType::Integer)
            .primary_key()
            .auto_increment()
            .not_null();
        builder.column(COL_UUID, ColumnType::Char(36)).not_null();
        // Player names cap at 32 characters across editions.
        builder.column(COL_NAME, ColumnType::VarChar(32)).not_null();
        builder
            .column(COL_FIRST_SEEN, ColumnType::DateTime)
            .not_null();
        builder
            .column(COL_LAST_SEEN, ColumnType::DateTime)
            .not_null();
        builder.extra(MYSQL_TABLE_EXTRA);
        let table = builder.build()?;

        let indices = vec![
            IndexBuilder::new()
                .table(table.name())
                .unique()
                .column(COL_UUID)
                .build()?,
            IndexBuilder::new()
                .table(table.name())
                .column(COL_NAME)
                .build()?,
        ];
        Ok(Self { table, indices })
    }
}

/// The prepared statement texts of the player storage.
struct PlayerQueries {
    get_by_uuid: String,
    get_id_by_uuid: String,
    get_by_name: String,
    insert: String,
    update: String,
    remove: String,
    count: String,
}

impl PlayerQueries {
    fn new(schema: &PlayersSchema, dialect: SqlDialect) -> Self {
        let table = schema.table.quoted_name();
        let id = quote_ident(COL_ID);
        let uuid = quote_ident(COL_UUID);
        let name = quote_ident(COL_NAME);
        let first_seen = quote_ident(COL_FIRST_SEEN);
        let last_seen = quote_ident(COL_LAST_SEEN);
        Self {
            get_by_uuid: format!("SELECT * FROM {table} WHERE {uuid}=? LIMIT 1;"),
            get_id_by_uuid: format!("SELECT {id} FROM {table} WHERE {uuid}=? LIMIT 1;"),
            get_by_name: format!(
                "SELECT * FROM {table} WHERE {name}=? ORDER BY {last_seen} DESC;",
            ),
            insert: format!(
                "INSERT {} INTO {table} ({uuid},{name},{first_seen},{last_seen}) \
                 VALUES(?,?,?,?);",
                dialect.insert_ignore(),
            ),
            update: format!(
                "UPDATE {table} SET {name}=?,{first_seen}=?,{last_seen}=? \
                 WHERE {uuid}=? AND {last_seen}<?;",
            ),
            remove: format!("DELETE FROM {table} WHERE {uuid}=?;"),
            count: format!("SELECT COUNT(*) FROM {table};"),
        }
    }
}

/// Storage component for player profiles.
pub struct PlayerStore {
    connector: Arc<Connector>,
    schema: PlayersSchema,
    queries: PlayerQueries,
}

impl PlayerStore {
    /// Creates the component; no statements run until [`PlayerStore::setup`].
    pub(crate) fn new(connector: Arc<Connector>, prefix: &str) -> Result<Self, StorageError> {
        let schema = PlayersSchema::new(prefix)?;
        let queries = PlayerQueries::new(&schema, connector.dialect());
        Ok(Self {
            connector,
            schema,
            queries,
        })
    }

    pub(crate) const fn schema(&self) -> &PlayersSchema {
        &self.schema
    }

    /// Creates the players table and its indices.
    pub(crate) async fn setup(&self) -> Result<(), StorageError> {
        let dialect = self.connector.dialect();
        self.connector
            .execute(async |conn| {
                let mut tx = conn.begin().await?;
                connector::create_table(&mut tx, dialect, &self.schema.table).await?;
                for index in &self.schema.indices {
                    connector::create_index(&mut tx, dialect, index).await?;
                }
                tx.commit().await?;
                Ok(())
            })
            .await?;
        tracing::debug!(table = self.schema.table.name(), "player storage ready");
        Ok(())
    }

    /// Looks up the row id for the profile's uuid, inserting the profile if
    /// it is not stored yet. Runs inside the caller's transaction.
    pub(crate) async fn get_or_insert_profile(
        &self,
        conn: &mut AnyConnection,
        profile: &PlayerProfile,
    ) -> Result<i64, StorageError> {
        let uuid = profile.uuid().to_string();
        let first_seen = format_datetime(profile.first_seen());
        let last_seen = format_datetime(profile.last_seen());
        connector::get_or_insert_id(
            conn,
            "player profile",
            || sqlx::query(&self.queries.get_id_by_uuid).bind(uuid.as_str()),
            || {
                sqlx::query(&self.queries.insert)
                    .bind(uuid.as_str())
                    .bind(profile.name())
                    .bind(first_seen.as_str())
                    .bind(last_seen.as_str())
            },
        )
        .await
    }

    /// Fetches a profile by uuid inside an already-running operation.
    pub(crate) async fn find_profile(
        &self,
        conn: &mut AnyConnection,
        uuid: Uuid,
    ) -> Result<Option<StoredProfile>, StorageError> {
        let row = sqlx::query(&self.queries.get_by_uuid)
            .bind(uuid.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => parse_profile(&row, ""),
            None => Ok(None),
        }
    }

    /// Fetches all profiles sharing a name, most recently seen first.
    pub(crate) async fn find_profiles(
        &self,
        conn: &mut AnyConnection,
        name: &str,
    ) -> Result<Vec<StoredProfile>, StorageError> {
        let rows = sqlx::query(&self.queries.get_by_name)
            .bind(name)
            .fetch_all(&mut *conn)
            .await?;
        let mut profiles = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(profile) = parse_profile(row, "")? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    /// Fetches the profile stored for the given player uuid.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the query fails; an unknown player is
    /// `Ok(None)`, not an error.
    pub async fn get_profile(&self, uuid: Uuid) -> Result<Option<StoredProfile>, StorageError> {
        self.connector
            .execute(async |conn| self.find_profile(conn, uuid).await)
            .await
    }

    /// Fetches all profiles stored under the given name, most recently seen
    /// first.
    ///
    /// Several players can have used the same name over time, so this can
    /// return more than one profile.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the query fails.
    pub async fn get_profiles(&self, name: &str) -> Result<Vec<StoredProfile>, StorageError> {
        self.connector
            .execute(async |conn| self.find_profiles(conn, name).await)
            .await
    }

    /// Upserts a profile.
    ///
    /// The update only wins if the given profile is newer than the stored
    /// one (guarded by last-seen); a missing row is inserted. The update is
    /// attempted first because failed conflict-ignoring inserts still burn
    /// auto-increment ids.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the transaction fails.
    pub async fn update_profile(&self, profile: &PlayerProfile) -> Result<(), StorageError> {
        self.connector
            .execute(async |conn| {
                let mut tx = conn.begin().await?;
                let updated = sqlx::query(&self.queries.update)
                    .bind(profile.name())
                    .bind(format_datetime(profile.first_seen()))
                    .bind(format_datetime(profile.last_seen()))
                    .bind(profile.uuid().to_string())
                    .bind(format_datetime(profile.last_seen()))
                    .execute(&mut *tx)
                    .await?
                    .rows_affected;
                if updated == 0 {
                    // Stored profile is either missing or newer.
                    self.get_or_insert_profile(&mut tx, profile).await?;
                }
                tx.commit().await?;
                Ok(())
            })
            .await
    }

    /// Removes the profile stored for the given player uuid.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ProfileNotFound`] if no such profile exists.
    pub async fn remove_profile(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.connector
            .execute(async |conn| {
                let affected = sqlx::query(&self.queries.remove)
                    .bind(uuid.to_string())
                    .execute(&mut *conn)
                    .await?
                    .rows_affected;
                if affected == 0 {
                    return Err(StorageError::ProfileNotFound(uuid));
                }
                Ok(())
            })
            .await
    }

    /// Counts the stored player profiles.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the query fails.
    pub async fn get_player_count(&self) -> Result<u64, StorageError> {
        self.connector
            .execute(async |conn| {
                let row = sqlx::query(&self.queries.count)
                    .fetch_one(&mut *conn)
                    .await?;
                let count: i64 = row.try_get(0)?;
                Ok(u64::try_from(count).unwrap_or(0))
            })
            .await
    }
}

/// Reads a profile from role-prefixed columns.
///
/// An empty prefix reads the bare players table. Under a combined-view
/// prefix a NULL uuid means "no player" (the row's left join found nothing),
/// which maps to `Ok(None)`.
pub(crate) fn parse_profile(
    row: &AnyRow,
    prefix: &str,
) -> Result<Option<StoredProfile>, StorageError> {
    let uuid_text: Option<String> = row.try_get(format!("{prefix}{COL_UUID}").as_str())?;
    let Some(uuid_text) = uuid_text else {
        return Ok(None);
    };
    let uuid = Uuid::parse_str(&uuid_text)
        .map_err(|err| StorageError::Decode(format!("invalid player uuid '{uuid_text}': {err}")))?;
    let row_id: i64 = row.try_get(format!("{prefix}{COL_ID}").as_str())?;
    let name: String = row.try_get(format!("{prefix}{COL_NAME}").as_str())?;
    let first_seen_text: String = row.try_get(format!("{prefix}{COL_FIRST_SEEN}").as_str())?;
    let last_seen_text: String = row.try_get(format!("{prefix}{COL_LAST_SEEN}").as_str())?;
    let profile = PlayerProfile::new(
        uuid,
        name,
        parse_datetime(&first_seen_text)?,
        parse_datetime(&last_seen_text)?,
    )
    .map_err(|err| StorageError::Decode(err.to_string()))?;
    Ok(Some(StoredProfile { row_id, profile }))
}
