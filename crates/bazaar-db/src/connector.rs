//! The single-connection connector: serialized execution, retrying, and the
//! get-or-insert dedup primitive.
//!
//! Each storage backend owns exactly one physical connection, guarded by a
//! mutex that is held for the full duration of a logical operation including
//! all of its retries. Operations are therefore strictly serialized and never
//! interleave on the connection. The driver's per-connection prepared
//! statement cache means repeated statement text compiles only once.

use std::ops::AsyncFnMut;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bazaar_sql::{CombinedView, Index, SqlDialect, Table, Trigger, View};
use sqlx::any::{Any, AnyArguments};
use sqlx::AnyConnection;
use sqlx::query::Query;
use sqlx::{Connection, Row};
use tokio::sync::Mutex;

use crate::config::StorageConfig;
use crate::error::StorageError;

/// How often to attempt establishing a connection before giving up.
const CONNECT_MAX_ATTEMPTS: u32 = 3;

/// Sleep between connection attempts.
const CONNECT_RETRY_SLEEP: Duration = Duration::from_millis(500);

/// How often to attempt a logical operation before giving up.
const RETRY_MAX_ATTEMPTS: u32 = 10;

/// After this many failed attempts, retries first sleep and re-validate the
/// connection.
const RETRY_SLEEP_AFTER_ATTEMPTS: u32 = 3;

/// Sleep before a late retry attempt.
const RETRY_SLEEP: Duration = Duration::from_millis(200);

static INSTALL_DRIVERS: Once = Once::new();

/// A parameterized query against the `Any` driver.
pub type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Owns the single physical connection of one storage backend.
///
/// The connection lifecycle is disconnected, connected, and finally shut
/// down; once shut down, every public method fails fast with
/// [`StorageError::Shutdown`] without touching the network.
pub struct Connector {
    dialect: SqlDialect,
    url: String,
    connection: Mutex<Option<AnyConnection>>,
    shutdown: AtomicBool,
}

impl Connector {
    /// Creates a connector for the configured backend.
    ///
    /// No connection is established yet; that happens lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the URL scheme is not recognized.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let dialect = config.dialect()?;
        Ok(Self {
            dialect,
            url: normalize_url(config.url(), dialect),
            connection: Mutex::new(None),
            shutdown: AtomicBool::new(false),
        })
    }

    /// The dialect this connector speaks.
    pub const fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Whether [`Connector::shutdown`] has been called.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn check_not_shutdown(&self) -> Result<(), StorageError> {
        if self.is_shutdown() {
            return Err(StorageError::Shutdown);
        }
        Ok(())
    }

    /// Shuts the connector down and closes the connection.
    ///
    /// This is a hard barrier: every subsequent operation fails fast.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] if already shut down.
    pub async fn shutdown(&self) -> Result<(), StorageError> {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return Err(StorageError::Shutdown);
        }
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.take() {
            if let Err(err) = connection.close().await {
                tracing::warn!(error = %err, "error while closing the database connection");
            }
        }
        tracing::debug!("database connector shut down");
        Ok(())
    }

    /// Runs a unit of work while holding the connection lock.
    ///
    /// The work is retried up to a fixed number of attempts; once past a
    /// threshold attempt, each retry first sleeps briefly and re-validates
    /// the connection (reconnecting if it died). The error of the final
    /// attempt is the one surfaced. Non-retryable errors (a missing profile,
    /// a shutdown fence, a malformed row) surface immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] after shutdown, a connection error
    /// if reconnecting fails, or whatever the work itself failed with.
    pub async fn execute<T, F>(&self, mut work: F) -> Result<T, StorageError>
    where
        F: AsyncFnMut(&mut AnyConnection) -> Result<T, StorageError>,
    {
        self.check_not_shutdown()?;
        let mut slot = self.connection.lock().await;
        let mut attempt: u32 = 1;
        loop {
            let connection = self.ensure_connection(&mut slot, false).await?;
            match work(connection).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < RETRY_MAX_ATTEMPTS && err.is_retryable() => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "database operation failed, retrying");
                    if attempt > RETRY_SLEEP_AFTER_ATTEMPTS {
                        tokio::time::sleep(RETRY_SLEEP).await;
                        self.ensure_connection(&mut slot, true).await?;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Validates the connection in `slot` and reconnects if necessary.
    async fn ensure_connection<'s>(
        &self,
        slot: &'s mut Option<AnyConnection>,
        check_alive: bool,
    ) -> Result<&'s mut AnyConnection, StorageError> {
        let alive = match slot.as_mut() {
            None => false,
            Some(_) if !check_alive => true,
            Some(connection) => {
                let ok = connection.ping().await.is_ok();
                if !ok {
                    tracing::warn!("database connection failed its liveness probe");
                }
                ok
            }
        };
        if alive {
            if let Some(connection) = slot.take() {
                return Ok(slot.insert(connection));
            }
        }
        if let Some(dead) = slot.take() {
            let _ = dead.close().await;
        }
        let connection = self.connect_with_retries().await?;
        Ok(slot.insert(connection))
    }

    async fn connect_with_retries(&self) -> Result<AnyConnection, StorageError> {
        let mut last_error = match self.connect_once().await {
            Ok(connection) => return Ok(connection),
            Err(err) => err,
        };
        for attempt in 2..=CONNECT_MAX_ATTEMPTS {
            tracing::warn!(
                attempt = attempt - 1,
                error = %last_error,
                "failed to establish database connection",
            );
            tokio::time::sleep(CONNECT_RETRY_SLEEP).await;
            match self.connect_once().await {
                Ok(connection) => return Ok(connection),
                Err(err) => last_error = err,
            }
        }
        Err(StorageError::Connection {
            attempts: CONNECT_MAX_ATTEMPTS,
            source: last_error,
        })
    }

    async fn connect_once(&self) -> Result<AnyConnection, sqlx::Error> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
        let mut connection = AnyConnection::connect(&self.url).await?;
        match self.dialect {
            SqlDialect::Sqlite => {
                // Busy waiting stays short since operations retry anyway.
                sqlx::query("PRAGMA busy_timeout = 1000;")
                    .execute(&mut connection)
                    .await?;
                sqlx::query("PRAGMA foreign_keys = ON;")
                    .execute(&mut connection)
                    .await?;
                sqlx::query("PRAGMA recursive_triggers = OFF;")
                    .execute(&mut connection)
                    .await?;
            }
            SqlDialect::MySql => {
                sqlx::query("SET SQL_SAFE_UPDATES = 0;")
                    .execute(&mut connection)
                    .await?;
            }
        }
        tracing::debug!(dialect = %self.dialect, "database connection established");
        Ok(connection)
    }
}

/// SQLite file databases are created on first use, matching how the other
/// backends behave; in-memory URLs and explicit modes are left alone.
fn normalize_url(url: &str, dialect: SqlDialect) -> String {
    if dialect == SqlDialect::Sqlite && !url.contains(":memory:") && !url.contains("mode=") {
        let separator = if url.contains('?') { '&' } else { '?' };
        return format!("{url}{separator}mode=rwc");
    }
    url.to_owned()
}

// ---------------------------------------------------------------------------
// Statement execution helpers
// ---------------------------------------------------------------------------
//
// These take the connection explicitly so they compose inside a transaction
// owned by the caller's unit of work.

pub(crate) async fn exec_raw(
    connection: &mut AnyConnection,
    sql: &str,
) -> Result<(), StorageError> {
    sqlx::query(sql).execute(&mut *connection).await?;
    Ok(())
}

/// Looks up a dedup row and returns its id, inserting it if missing.
///
/// Must be called inside a transaction. Both statement factories are bound
/// to already-computed dedup keys; the insert is expected to be
/// conflict-ignoring. If the insert is swallowed (an external writer raced
/// the same content) or the driver reports no generated key, the lookup runs
/// once more; only if that also finds nothing does a retryable
/// [`StorageError::Dedup`] surface.
pub async fn get_or_insert_id<'q, L, I>(
    connection: &mut AnyConnection,
    kind: &'static str,
    mut lookup: L,
    insert: I,
) -> Result<i64, StorageError>
where
    L: FnMut() -> AnyQuery<'q>,
    I: FnOnce() -> AnyQuery<'q>,
{
    if let Some(row) = lookup().fetch_optional(&mut *connection).await? {
        return Ok(row.try_get::<i64, _>(0)?);
    }
    let result = insert().execute(&mut *connection).await?;
    if result.rows_affected > 0 {
        if let Some(id) = result.last_insert_id {
            tracing::debug!(kind, id, "added new dedup row");
            return Ok(id);
        }
    }
    match lookup().fetch_optional(&mut *connection).await? {
        Some(row) => Ok(row.try_get::<i64, _>(0)?),
        None => Err(StorageError::Dedup { kind }),
    }
}

// ---------------------------------------------------------------------------
// DDL helpers
// ---------------------------------------------------------------------------

/// Creates a table.
pub async fn create_table(
    connection: &mut AnyConnection,
    dialect: SqlDialect,
    table: &Table,
) -> Result<(), StorageError> {
    exec_raw(connection, &table.create_sql(dialect)).await
}

/// Creates an index, checking for existence first where the dialect
/// requires it.
pub async fn create_index(
    connection: &mut AnyConnection,
    dialect: SqlDialect,
    index: &Index,
) -> Result<(), StorageError> {
    if !dialect.supports_if_not_exists() && index_exists(connection, index).await? {
        return Ok(());
    }
    exec_raw(connection, &index.create_sql(dialect)).await
}

/// `MySQL` has no `IF NOT EXISTS` for indices; existence is checked against
/// the information schema instead.
async fn index_exists(
    connection: &mut AnyConnection,
    index: &Index,
) -> Result<bool, StorageError> {
    let row = sqlx::query(
        "SELECT COUNT(1) FROM INFORMATION_SCHEMA.STATISTICS \
         WHERE TABLE_SCHEMA=DATABASE() AND TABLE_NAME=? AND INDEX_NAME=?;",
    )
    .bind(index.table())
    .bind(index.name())
    .fetch_one(&mut *connection)
    .await?;
    Ok(row.try_get::<i64, _>(0)? > 0)
}

/// Creates a trigger, checking for existence first where the dialect
/// requires it.
pub async fn create_trigger(
    connection: &mut AnyConnection,
    dialect: SqlDialect,
    trigger: &Trigger,
) -> Result<(), StorageError> {
    if !dialect.supports_if_not_exists() && trigger_exists(connection, trigger).await? {
        return Ok(());
    }
    exec_raw(connection, &trigger.create_sql(dialect)).await
}

/// `MySQL` has no `IF NOT EXISTS` for triggers either.
async fn trigger_exists(
    connection: &mut AnyConnection,
    trigger: &Trigger,
) -> Result<bool, StorageError> {
    let row = sqlx::query(
        "SELECT COUNT(1) FROM INFORMATION_SCHEMA.TRIGGERS \
         WHERE TRIGGER_SCHEMA=DATABASE() AND TRIGGER_NAME=?;",
    )
    .bind(trigger.name())
    .fetch_one(&mut *connection)
    .await?;
    Ok(row.try_get::<i64, _>(0)? > 0)
}

/// Creates a plain view.
pub async fn create_view(
    connection: &mut AnyConnection,
    dialect: SqlDialect,
    view: &View,
) -> Result<(), StorageError> {
    exec_raw(connection, &view.create_sql(dialect)).await
}

/// Drops a plain view.
pub async fn drop_view(
    connection: &mut AnyConnection,
    dialect: SqlDialect,
    view: &View,
) -> Result<(), StorageError> {
    exec_raw(connection, &view.drop_sql(dialect)).await
}

/// Creates a combined view, enforcing the dialect's join limit first.
pub async fn create_combined_view(
    connection: &mut AnyConnection,
    dialect: SqlDialect,
    view: &CombinedView,
) -> Result<(), StorageError> {
    if view.joins().len() > dialect.join_limit() {
        return Err(StorageError::Config(format!(
            "combined view `{}` joins {} tables, but {dialect} allows at most {}",
            view.name(),
            view.joins().len(),
            dialect.join_limit(),
        )));
    }
    create_view(connection, dialect, view.view()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_file_urls_get_create_mode() {
        assert_eq!(
            normalize_url("sqlite://ledger.db", SqlDialect::Sqlite),
            "sqlite://ledger.db?mode=rwc",
        );
        assert_eq!(
            normalize_url("sqlite://ledger.db?cache=shared", SqlDialect::Sqlite),
            "sqlite://ledger.db?cache=shared&mode=rwc",
        );
    }

    #[test]
    fn memory_and_explicit_mode_urls_are_untouched() {
        assert_eq!(
            normalize_url("sqlite::memory:", SqlDialect::Sqlite),
            "sqlite::memory:",
        );
        assert_eq!(
            normalize_url("sqlite://ledger.db?mode=ro", SqlDialect::Sqlite),
            "sqlite://ledger.db?mode=ro",
        );
        assert_eq!(
            normalize_url("mysql://localhost/bazaar", SqlDialect::MySql),
            "mysql://localhost/bazaar",
        );
    }
}
