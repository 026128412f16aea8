//! Dialect capabilities and the dialect-neutral column type.

use std::fmt;

/// Quotes an identifier for use in generated SQL.
///
/// Both supported dialects accept backtick quoting.
pub fn quote_ident(ident: &str) -> String {
    format!("`{ident}`")
}

/// Quotes a `table.column` pair.
pub fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(table), quote_ident(column))
}

/// The SQL dialects the ledger can run on.
///
/// Dialects only differ in a handful of keywords and capabilities; all
/// statement *structure* is shared. Matching on this enum is exhaustive, so
/// adding a dialect flags every site that needs a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    /// `SQLite`, the embedded file (or in-memory) backend.
    Sqlite,
    /// `MySQL` (or compatible) over the network.
    MySql,
}

impl SqlDialect {
    /// The keyword that turns an `INSERT` into a conflict-ignoring insert.
    pub const fn insert_ignore(self) -> &'static str {
        match self {
            Self::Sqlite => "OR IGNORE",
            Self::MySql => "IGNORE",
        }
    }

    /// The keyword marking an auto-incrementing primary key column.
    pub const fn auto_increment(self) -> &'static str {
        match self {
            Self::Sqlite => "AUTOINCREMENT",
            Self::MySql => "AUTO_INCREMENT",
        }
    }

    /// The column type used for timestamps.
    ///
    /// `SQLite` stores timestamps as text; `MySQL` uses `DATETIME` with
    /// millisecond precision.
    pub const fn datetime_type(self) -> &'static str {
        match self {
            Self::Sqlite => "TEXT",
            Self::MySql => "DATETIME(3)",
        }
    }

    /// An SQL expression evaluating to the current time.
    pub const fn current_time(self) -> &'static str {
        match self {
            Self::Sqlite => "strftime('%Y-%m-%d %H:%M:%f','now')",
            Self::MySql => "NOW(3)",
        }
    }

    /// The maximum number of tables a single query may join.
    pub const fn join_limit(self) -> usize {
        match self {
            // https://www.sqlite.org/limits.html
            Self::Sqlite => 64,
            // https://dev.mysql.com/doc/refman/8.0/en/joins-limits.html
            Self::MySql => 61,
        }
    }

    /// Whether `CREATE TABLE` accepts trailing table attributes
    /// (engine, charset, collation).
    pub const fn supports_table_extra(self) -> bool {
        matches!(self, Self::MySql)
    }

    /// Whether `CREATE INDEX` / `CREATE TRIGGER` accept `IF NOT EXISTS`.
    ///
    /// `MySQL` does not; existence has to be checked separately before
    /// creating these objects.
    pub const fn supports_if_not_exists(self) -> bool {
        matches!(self, Self::Sqlite)
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::MySql => write!(f, "mysql"),
        }
    }
}

/// A dialect-neutral column type, rendered per dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// A 32-bit (or wider, on `SQLite`) integer.
    Integer,
    /// A 64-bit integer.
    BigInt,
    /// A double-precision float.
    Double,
    /// A fixed-length character column.
    Char(u16),
    /// A variable-length character column.
    VarChar(u16),
    /// A timestamp column; type and precision depend on the dialect.
    DateTime,
}

impl ColumnType {
    /// Renders the column type for the given dialect.
    pub fn render(self, dialect: SqlDialect) -> String {
        match self {
            Self::Integer => String::from("INTEGER"),
            Self::BigInt => String::from("BIGINT"),
            Self::Double => String::from("DOUBLE"),
            Self::Char(len) => format!("CHAR({len})"),
            Self::VarChar(len) => format!("VARCHAR({len})"),
            Self::DateTime => String::from(dialect.datetime_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(quote_ident("trades"), "`trades`");
        assert_eq!(qualified("trades", "id"), "`trades`.`id`");
    }

    #[test]
    fn dialect_keywords_differ() {
        assert_eq!(SqlDialect::Sqlite.insert_ignore(), "OR IGNORE");
        assert_eq!(SqlDialect::MySql.insert_ignore(), "IGNORE");
        assert_eq!(SqlDialect::Sqlite.auto_increment(), "AUTOINCREMENT");
        assert_eq!(SqlDialect::MySql.auto_increment(), "AUTO_INCREMENT");
    }

    #[test]
    fn datetime_renders_per_dialect() {
        assert_eq!(ColumnType::DateTime.render(SqlDialect::Sqlite), "TEXT");
        assert_eq!(ColumnType::DateTime.render(SqlDialect::MySql), "DATETIME(3)");
    }

    #[test]
    fn sized_types_render_their_length() {
        assert_eq!(ColumnType::Char(36).render(SqlDialect::Sqlite), "CHAR(36)");
        assert_eq!(ColumnType::VarChar(128).render(SqlDialect::MySql), "VARCHAR(128)");
    }

    #[test]
    fn join_limits() {
        assert_eq!(SqlDialect::Sqlite.join_limit(), 64);
        assert_eq!(SqlDialect::MySql.join_limit(), 61);
    }
}
