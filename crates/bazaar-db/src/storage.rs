//! The storage façade: one backend, both components, one shutdown barrier.

use std::sync::Arc;
use std::time::Duration;

use bazaar_sql::SqlDialect;
use bazaar_types::{HistoryRequest, HistoryResult, LoggedTrade, PlayerProfile};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::connector::Connector;
use crate::error::StorageError;
use crate::history::HistoryStore;
use crate::players::{PlayerStore, StoredProfile};

/// A fully set-up storage backend.
///
/// Opening a storage picks the dialect from the configured URL, builds the
/// connector and both storage components, and runs their schema setup. All
/// methods are `async` and safe to spawn; the connector below serializes the
/// actual database work, so exactly one operation runs at a time.
pub struct Storage {
    config: StorageConfig,
    connector: Arc<Connector>,
    players: Arc<PlayerStore>,
    history: HistoryStore,
}

impl Storage {
    /// Opens the configured backend and sets up its schema.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the URL is unusable, the connection
    /// cannot be established, or the schema setup fails.
    pub async fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let connector = Arc::new(Connector::new(&config)?);
        let players = Arc::new(PlayerStore::new(
            Arc::clone(&connector),
            config.table_prefix(),
        )?);
        let history = HistoryStore::new(Arc::clone(&connector), Arc::clone(&players), &config)?;

        players.setup().await?;
        history.setup().await?;

        tracing::info!(dialect = %connector.dialect(), "trading-history storage ready");
        Ok(Self {
            config,
            connector,
            players,
            history,
        })
    }

    /// The configuration this storage was opened with.
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// The SQL dialect of the backend.
    pub fn dialect(&self) -> SqlDialect {
        self.connector.dialect()
    }

    /// The connector owning the backend's single connection.
    ///
    /// Exposed for callers that need to run custom statements with the same
    /// serialization and retry guarantees as the built-in operations.
    pub const fn connector(&self) -> &Arc<Connector> {
        &self.connector
    }

    /// The player storage component.
    pub const fn players(&self) -> &Arc<PlayerStore> {
        &self.players
    }

    // TRADES

    /// Appends a trade to the ledger. See [`HistoryStore::log_trade`].
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails; the whole trade is
    /// rolled back in that case.
    pub async fn log_trade(&self, trade: &LoggedTrade) -> Result<(), StorageError> {
        self.history.log_trade(trade).await
    }

    /// Answers a history request. See [`HistoryStore::get_trading_history`].
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the query fails. An unknown player or
    /// owner yields an empty result, not an error.
    pub async fn get_trading_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<HistoryResult, StorageError> {
        self.history.get_trading_history(request).await
    }

    /// Deletes trades older than the given age (declared extension point).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] after shutdown.
    pub async fn purge_trades_older_than(&self, max_age: Duration) -> Result<(), StorageError> {
        self.history.purge_trades_older_than(max_age).await
    }

    /// Removes unreferenced dedup rows (declared extension point).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] after shutdown.
    pub async fn perform_cleanup(&self) -> Result<(), StorageError> {
        self.history.perform_cleanup().await
    }

    // PROFILES

    /// Fetches the profile stored for the given player uuid.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the query fails.
    pub async fn get_profile(&self, uuid: Uuid) -> Result<Option<StoredProfile>, StorageError> {
        self.players.get_profile(uuid).await
    }

    /// Fetches all profiles stored under a name, most recently seen first.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the query fails.
    pub async fn get_profiles(&self, name: &str) -> Result<Vec<StoredProfile>, StorageError> {
        self.players.get_profiles(name).await
    }

    /// Upserts a profile; only newer session data wins.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the transaction fails.
    pub async fn update_profile(&self, profile: &PlayerProfile) -> Result<(), StorageError> {
        self.players.update_profile(profile).await
    }

    /// Removes the profile stored for the given player uuid.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ProfileNotFound`] if no such profile exists.
    pub async fn remove_profile(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.players.remove_profile(uuid).await
    }

    /// Counts the stored player profiles.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the query fails.
    pub async fn get_player_count(&self) -> Result<u64, StorageError> {
        self.players.get_player_count().await
    }

    // SHUTDOWN

    /// Shuts the storage down.
    ///
    /// A hard barrier: the connection is closed and every subsequent
    /// operation on this storage fails fast with
    /// [`StorageError::Shutdown`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Shutdown`] if already shut down.
    pub async fn shutdown(&self) -> Result<(), StorageError> {
        tracing::info!("shutting down trading-history storage");
        self.connector.shutdown().await
    }
}
