//! Storage configuration.

use bazaar_sql::SqlDialect;

use crate::error::StorageError;

/// Default prefix for all ledger table names.
pub const DEFAULT_TABLE_PREFIX: &str = "bazaar_";

/// Configuration for a storage backend.
///
/// The backend dialect is inferred from the URL scheme: `sqlite:` URLs open
/// an embedded database (use `sqlite::memory:` for a throwaway in-memory
/// one), `mysql:` URLs connect over the network.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    url: String,
    table_prefix: String,
    omit_item_data: bool,
}

impl StorageConfig {
    /// Creates a configuration for the given database URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            table_prefix: String::from(DEFAULT_TABLE_PREFIX),
            omit_item_data: false,
        }
    }

    /// Sets the prefix prepended to every table name.
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Disables persisting serialized item data.
    ///
    /// Items are then deduplicated by type alone; the stored hash still
    /// matches the type-only checksum.
    #[must_use]
    pub const fn with_omit_item_data(mut self, omit: bool) -> Self {
        self.omit_item_data = omit;
        self
    }

    /// The database URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The table name prefix.
    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Whether serialized item data is omitted from storage.
    pub const fn omit_item_data(&self) -> bool {
        self.omit_item_data
    }

    /// The SQL dialect implied by the URL scheme.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] for unrecognized schemes.
    pub fn dialect(&self) -> Result<SqlDialect, StorageError> {
        if self.url.starts_with("sqlite:") {
            Ok(SqlDialect::Sqlite)
        } else if self.url.starts_with("mysql:") {
            Ok(SqlDialect::MySql)
        } else {
            Err(StorageError::Config(format!(
                "unsupported database URL: {}",
                self.url,
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dialect_from_url_scheme() {
        assert_eq!(
            StorageConfig::new("sqlite::memory:").dialect().unwrap(),
            SqlDialect::Sqlite,
        );
        assert_eq!(
            StorageConfig::new("mysql://user:pw@localhost/bazaar").dialect().unwrap(),
            SqlDialect::MySql,
        );
        assert!(StorageConfig::new("postgres://nope").dialect().is_err());
    }

    #[test]
    fn builder_overrides() {
        let config = StorageConfig::new("sqlite::memory:")
            .with_table_prefix("test_")
            .with_omit_item_data(true);
        assert_eq!(config.table_prefix(), "test_");
        assert!(config.omit_item_data());
    }
}
