//! Two-phase builders for tables, columns, foreign keys, indices, triggers
//! and plain views.
//!
//! Builders are mutable and collect a definition; `build()` validates the
//! minimum required fields and produces an immutable schema object whose only
//! job is to generate `CREATE`/`DROP` text. The generated text never executes
//! anything here.

use crate::dialect::{ColumnType, SqlDialect, qualified, quote_ident};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// An immutable column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    ty: ColumnType,
    primary_key: bool,
    auto_increment: bool,
    not_null: bool,
    default_value: Option<String>,
}

impl Column {
    /// The column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The quoted column name.
    pub fn quoted_name(&self) -> String {
        quote_ident(&self.name)
    }

    /// The dialect-neutral column type.
    pub const fn column_type(&self) -> ColumnType {
        self.ty
    }

    /// Whether this column is the primary key.
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Whether this column auto-increments.
    pub const fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Whether this column is `NOT NULL`.
    pub const fn is_not_null(&self) -> bool {
        self.not_null
    }

    /// The explicit default value, if one was declared.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    fn to_sql(&self, dialect: SqlDialect) -> String {
        let mut sql = format!("{} {}", self.quoted_name(), self.ty.render(dialect));
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.auto_increment {
            sql.push(' ');
            sql.push_str(dialect.auto_increment());
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

/// Collects a column definition inside a [`TableBuilder`].
#[derive(Debug)]
pub struct ColumnBuilder {
    name: String,
    ty: ColumnType,
    primary_key: bool,
    auto_increment: bool,
    not_null: bool,
    default_value: Option<String>,
}

impl ColumnBuilder {
    fn new(name: String, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            default_value: None,
        }
    }

    /// Marks the column as the primary key.
    pub fn primary_key(&mut self) -> &mut Self {
        self.primary_key = true;
        self
    }

    /// Marks the column as auto-incrementing.
    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(&mut self) -> &mut Self {
        self.not_null = true;
        self
    }

    /// Declares an explicit default value.
    ///
    /// `"NULL"` (in any casing) is normalized to "no default".
    pub fn default_value(&mut self, default: impl Into<String>) -> &mut Self {
        let default = default.into();
        self.default_value = if default.eq_ignore_ascii_case("NULL") {
            None
        } else {
            Some(default)
        };
        self
    }

    fn build(self) -> Column {
        Column {
            name: self.name,
            ty: self.ty,
            primary_key: self.primary_key,
            auto_increment: self.auto_increment,
            not_null: self.not_null,
            default_value: self.default_value,
        }
    }
}

// ---------------------------------------------------------------------------
// Foreign keys
// ---------------------------------------------------------------------------

/// An immutable foreign key definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    column: String,
    referenced_table: String,
    referenced_column: String,
    cascade_delete: bool,
}

impl ForeignKey {
    /// The source column on the declaring table.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The referenced table.
    pub fn referenced_table(&self) -> &str {
        &self.referenced_table
    }

    /// The referenced column.
    pub fn referenced_column(&self) -> &str {
        &self.referenced_column
    }

    /// Whether deletes cascade from the referenced table.
    pub const fn is_cascade_delete(&self) -> bool {
        self.cascade_delete
    }

    fn to_sql(&self) -> String {
        let mut sql = format!(
            "FOREIGN KEY({}) REFERENCES {}({})",
            quote_ident(&self.column),
            quote_ident(&self.referenced_table),
            quote_ident(&self.referenced_column),
        );
        if self.cascade_delete {
            sql.push_str(" ON DELETE CASCADE");
        }
        sql
    }
}

/// Collects a foreign key definition inside a [`TableBuilder`].
#[derive(Debug)]
pub struct ForeignKeyBuilder {
    column: String,
    referenced_table: String,
    referenced_column: String,
    cascade_delete: bool,
}

impl ForeignKeyBuilder {
    /// Deletes on the referenced table cascade to rows referencing them.
    pub fn cascade_delete(&mut self) -> &mut Self {
        self.cascade_delete = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Collects a table definition; [`TableBuilder::build`] produces the
/// immutable [`Table`].
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnBuilder>,
    foreign_keys: Vec<ForeignKeyBuilder>,
    extra: String,
}

impl TableBuilder {
    /// Starts a table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            extra: String::new(),
        }
    }

    /// Adds a column and returns its builder for further qualification.
    pub fn column(&mut self, name: impl Into<String>, ty: ColumnType) -> &mut ColumnBuilder {
        let index = self.columns.len();
        self.columns.push(ColumnBuilder::new(name.into(), ty));
        &mut self.columns[index]
    }

    /// Adds a foreign key and returns its builder for further qualification.
    pub fn foreign_key(
        &mut self,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> &mut ForeignKeyBuilder {
        let index = self.foreign_keys.len();
        self.foreign_keys.push(ForeignKeyBuilder {
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            cascade_delete: false,
        });
        &mut self.foreign_keys[index]
    }

    /// Declares trailing table attributes (engine, charset, collation).
    ///
    /// Only emitted on dialects that support them.
    pub fn extra(&mut self, extra: impl Into<String>) -> &mut Self {
        self.extra = extra.into();
        self
    }

    /// Validates the definition and produces the immutable [`Table`].
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the table or a column has an empty name,
    /// the table has no columns, or a foreign key is incomplete.
    pub fn build(self) -> Result<Table, SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyName { kind: "table" });
        }
        if self.columns.is_empty() {
            return Err(SchemaError::NoColumns { table: self.name });
        }
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(SchemaError::EmptyColumnName { table: self.name });
            }
        }
        for foreign_key in &self.foreign_keys {
            if foreign_key.column.is_empty()
                || foreign_key.referenced_table.is_empty()
                || foreign_key.referenced_column.is_empty()
            {
                return Err(SchemaError::IncompleteForeignKey { table: self.name });
            }
        }
        Ok(Table {
            name: self.name,
            columns: self.columns.into_iter().map(ColumnBuilder::build).collect(),
            foreign_keys: self
                .foreign_keys
                .into_iter()
                .map(|fk| ForeignKey {
                    column: fk.column,
                    referenced_table: fk.referenced_table,
                    referenced_column: fk.referenced_column,
                    cascade_delete: fk.cascade_delete,
                })
                .collect(),
            extra: self.extra,
        })
    }
}

/// An immutable table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    foreign_keys: Vec<ForeignKey>,
    extra: String,
}

impl Table {
    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The quoted table name.
    pub fn quoted_name(&self) -> String {
        quote_ident(&self.name)
    }

    /// The table's columns, in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The table's foreign keys, in declaration order.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// The foreign key whose source column is `column`, if any.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column() == column)
    }

    /// Generates the `CREATE TABLE` statement.
    pub fn create_sql(&self, dialect: SqlDialect) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_sql(dialect)).collect();
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {}({}",
            self.quoted_name(),
            columns.join(","),
        );
        if !self.foreign_keys.is_empty() {
            let foreign_keys: Vec<String> =
                self.foreign_keys.iter().map(ForeignKey::to_sql).collect();
            sql.push(',');
            sql.push_str(&foreign_keys.join(","));
        }
        sql.push(')');
        if dialect.supports_table_extra() && !self.extra.is_empty() {
            sql.push(' ');
            sql.push_str(&self.extra);
        }
        sql.push(';');
        sql
    }

    /// Generates the `DROP TABLE` statement.
    pub fn drop_sql(&self, _dialect: SqlDialect) -> String {
        format!("DROP TABLE IF EXISTS {};", self.quoted_name())
    }
}

// ---------------------------------------------------------------------------
// Indices
// ---------------------------------------------------------------------------

/// Collects an index definition.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    table: Option<String>,
    name: Option<String>,
    unique: bool,
    columns: Vec<String>,
}

impl IndexBuilder {
    /// Starts an index definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table the index lives on.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// An explicit index name.
    ///
    /// If omitted, a single-column index is named `<table>_<column>`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds an indexed column.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Validates the definition and produces the immutable [`Index`].
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the table name is missing, no columns
    /// were added, or no name was given and none can be derived.
    pub fn build(self) -> Result<Index, SchemaError> {
        let table = match self.table {
            Some(table) if !table.is_empty() => table,
            _ => return Err(SchemaError::EmptyName { kind: "index table" }),
        };
        let first_column = match self.columns.first() {
            Some(column) => column.clone(),
            None => {
                return Err(SchemaError::IndexWithoutColumns {
                    name: self.name.unwrap_or_default(),
                });
            }
        };
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => format!("{table}_{first_column}"),
        };
        Ok(Index {
            table,
            name,
            unique: self.unique,
            columns: self.columns,
        })
    }
}

/// An immutable index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    table: String,
    name: String,
    unique: bool,
    columns: Vec<String>,
}

impl Index {
    /// The table the index lives on.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the index is unique.
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// The indexed columns, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Generates the `CREATE INDEX` statement.
    ///
    /// On dialects without `IF NOT EXISTS` support the caller has to check
    /// for existence before executing this.
    pub fn create_sql(&self, dialect: SqlDialect) -> String {
        let mut sql = String::from("CREATE");
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        sql.push_str(" INDEX");
        if dialect.supports_if_not_exists() {
            sql.push_str(" IF NOT EXISTS");
        }
        let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
        sql.push_str(&format!(
            " {} ON {} ({});",
            quote_ident(&self.name),
            quote_ident(&self.table),
            columns.join(","),
        ));
        sql
    }

    /// Generates the `DROP INDEX` statement.
    ///
    /// `MySQL` has no `IF EXISTS` here and requires the table name; the
    /// caller has to check for existence before executing this.
    pub fn drop_sql(&self, dialect: SqlDialect) -> String {
        match dialect {
            SqlDialect::Sqlite => format!("DROP INDEX IF EXISTS {};", quote_ident(&self.name)),
            SqlDialect::MySql => format!(
                "DROP INDEX {} ON {};",
                quote_ident(&self.name),
                quote_ident(&self.table),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// The statement kinds a trigger can fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Fire on `DELETE`.
    Delete,
    /// Fire on `INSERT`.
    Insert,
    /// Fire on `UPDATE`.
    Update,
}

impl TriggerEvent {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
        }
    }
}

/// Collects a trigger definition.
#[derive(Debug)]
pub struct TriggerBuilder {
    table: Option<String>,
    name: Option<String>,
    after: bool,
    event: Option<TriggerEvent>,
    columns: Vec<String>,
    for_each_row: bool,
    when_expr: Option<String>,
    reaction: Option<String>,
}

impl Default for TriggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerBuilder {
    /// Starts a trigger definition; triggers fire `AFTER` by default.
    pub const fn new() -> Self {
        Self {
            table: None,
            name: None,
            after: true,
            event: None,
            columns: Vec::new(),
            for_each_row: false,
            when_expr: None,
            reaction: None,
        }
    }

    /// The table the trigger watches.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// The trigger name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fire after the triggering statement (the default).
    #[must_use]
    pub const fn after(mut self) -> Self {
        self.after = true;
        self
    }

    /// Fire before the triggering statement.
    #[must_use]
    pub const fn before(mut self) -> Self {
        self.after = false;
        self
    }

    /// The statement kind to fire on.
    #[must_use]
    pub const fn event(mut self, event: TriggerEvent) -> Self {
        self.event = Some(event);
        self
    }

    /// Restricts an `UPDATE` trigger to specific columns.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Fire once per affected row.
    #[must_use]
    pub const fn for_each_row(mut self) -> Self {
        self.for_each_row = true;
        self
    }

    /// A `WHEN` condition guarding the reaction.
    #[must_use]
    pub fn when(mut self, when_expr: impl Into<String>) -> Self {
        self.when_expr = Some(when_expr.into());
        self
    }

    /// The reaction statement executed when the trigger fires.
    #[must_use]
    pub fn reaction(mut self, reaction: impl Into<String>) -> Self {
        self.reaction = Some(reaction.into());
        self
    }

    /// Validates the definition and produces the immutable [`Trigger`].
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the table, name, event or reaction is
    /// missing.
    pub fn build(self) -> Result<Trigger, SchemaError> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(SchemaError::EmptyName { kind: "trigger" }),
        };
        let table = match self.table {
            Some(table) if !table.is_empty() => table,
            _ => {
                return Err(SchemaError::IncompleteTrigger {
                    name,
                    missing: "table",
                });
            }
        };
        let Some(event) = self.event else {
            return Err(SchemaError::IncompleteTrigger {
                name,
                missing: "event",
            });
        };
        let reaction = match self.reaction {
            Some(reaction) if !reaction.is_empty() => reaction,
            _ => {
                return Err(SchemaError::IncompleteTrigger {
                    name,
                    missing: "reaction",
                });
            }
        };
        Ok(Trigger {
            table,
            name,
            after: self.after,
            event,
            columns: self.columns,
            for_each_row: self.for_each_row,
            when_expr: self.when_expr,
            reaction,
        })
    }
}

/// An immutable trigger definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    table: String,
    name: String,
    after: bool,
    event: TriggerEvent,
    columns: Vec<String>,
    for_each_row: bool,
    when_expr: Option<String>,
    reaction: String,
}

impl Trigger {
    /// The trigger name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table the trigger watches.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn reaction_sql(&self, dialect: SqlDialect) -> String {
        match dialect {
            // SQLite trigger bodies are statement blocks.
            SqlDialect::Sqlite => format!("BEGIN {}; END", self.reaction),
            SqlDialect::MySql => self.reaction.clone(),
        }
    }

    /// Generates the `CREATE TRIGGER` statement.
    ///
    /// On dialects without `IF NOT EXISTS` support the caller has to check
    /// for existence before executing this.
    pub fn create_sql(&self, dialect: SqlDialect) -> String {
        let mut sql = String::from("CREATE TRIGGER");
        if dialect.supports_if_not_exists() {
            sql.push_str(" IF NOT EXISTS");
        }
        sql.push(' ');
        sql.push_str(&quote_ident(&self.name));
        sql.push_str(if self.after { " AFTER" } else { " BEFORE" });
        sql.push(' ');
        sql.push_str(self.event.keyword());
        if self.event == TriggerEvent::Update && !self.columns.is_empty() {
            let columns: Vec<String> = self.columns.iter().map(|c| quote_ident(c)).collect();
            sql.push_str(" OF ");
            sql.push_str(&columns.join(","));
        }
        sql.push_str(" ON ");
        sql.push_str(&quote_ident(&self.table));
        if self.for_each_row {
            sql.push_str(" FOR EACH ROW");
        }
        if let Some(when_expr) = &self.when_expr {
            sql.push_str(" WHEN ");
            sql.push_str(when_expr);
        }
        sql.push(' ');
        sql.push_str(&self.reaction_sql(dialect));
        sql.push(';');
        sql
    }

    /// Generates the `DROP TRIGGER` statement.
    pub fn drop_sql(&self, _dialect: SqlDialect) -> String {
        format!("DROP TRIGGER IF EXISTS {};", quote_ident(&self.name))
    }
}

/// Builds the dialect-specific "touch last-modified" trigger.
///
/// Updates to `event_table` stamp `last_modified_column` on `reaction_table`
/// with the current time. `MySQL` cannot modify the event table from an
/// `AFTER` trigger, so when both tables are the same it uses a `BEFORE`
/// trigger with a `SET NEW` reaction instead.
///
/// # Errors
///
/// Returns a [`SchemaError`] if any of the names is empty.
pub fn last_modified_trigger(
    dialect: SqlDialect,
    event_table: &str,
    reaction_table: &str,
    last_modified_column: &str,
    id_column: &str,
) -> Result<Trigger, SchemaError> {
    let name = format!("{event_table}_last_modified");
    let update_reaction = format!(
        "UPDATE {} SET {}={} WHERE {}=NEW.{}",
        quote_ident(reaction_table),
        quote_ident(last_modified_column),
        dialect.current_time(),
        quote_ident(id_column),
        quote_ident(id_column),
    );
    let builder = TriggerBuilder::new()
        .table(event_table)
        .name(name)
        .event(TriggerEvent::Update)
        .for_each_row();
    match dialect {
        SqlDialect::Sqlite => builder.after().reaction(update_reaction).build(),
        SqlDialect::MySql => {
            let reaction = if event_table == reaction_table {
                format!(
                    "SET NEW.{}={}",
                    quote_ident(last_modified_column),
                    dialect.current_time(),
                )
            } else {
                update_reaction
            };
            // Only a BEFORE trigger may modify the event table on MySQL.
            builder.before().reaction(reaction).build()
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// An immutable view definition: a name and its backing `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    name: String,
    select_sql: String,
}

impl View {
    /// Creates a view definition.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the name or the select statement is
    /// empty.
    pub fn new(name: impl Into<String>, select_sql: impl Into<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName { kind: "view" });
        }
        let select_sql = select_sql.into();
        if select_sql.is_empty() {
            return Err(SchemaError::ViewWithoutSelect { name });
        }
        Ok(Self { name, select_sql })
    }

    /// The view name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The quoted view name.
    pub fn quoted_name(&self) -> String {
        quote_ident(&self.name)
    }

    /// The backing `SELECT` statement.
    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    /// Generates the `CREATE VIEW` statement.
    ///
    /// `MySQL` has no `IF NOT EXISTS` for views and replaces instead.
    pub fn create_sql(&self, dialect: SqlDialect) -> String {
        match dialect {
            SqlDialect::Sqlite => format!(
                "CREATE VIEW IF NOT EXISTS {} AS {};",
                self.quoted_name(),
                self.select_sql,
            ),
            SqlDialect::MySql => format!(
                "CREATE OR REPLACE VIEW {} AS {};",
                self.quoted_name(),
                self.select_sql,
            ),
        }
    }

    /// Generates the `DROP VIEW` statement.
    pub fn drop_sql(&self, _dialect: SqlDialect) -> String {
        format!("DROP VIEW IF EXISTS {};", self.quoted_name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut builder = TableBuilder::new("shops");
        builder
            .column("id", ColumnType::Integer)
            .primary_key()
            .auto_increment()
            .not_null();
        builder.column("name", ColumnType::VarChar(128)).not_null();
        builder.column("owner_id", ColumnType::Integer);
        builder.foreign_key("owner_id", "players", "id");
        builder.extra("ENGINE = InnoDB");
        builder.build().unwrap()
    }

    #[test]
    fn create_table_sqlite() {
        assert_eq!(
            sample_table().create_sql(SqlDialect::Sqlite),
            "CREATE TABLE IF NOT EXISTS `shops`(\
             `id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,\
             `name` VARCHAR(128) NOT NULL,\
             `owner_id` INTEGER,\
             FOREIGN KEY(`owner_id`) REFERENCES `players`(`id`));",
        );
    }

    #[test]
    fn create_table_mysql_emits_extra() {
        let sql = sample_table().create_sql(SqlDialect::MySql);
        assert!(sql.contains("AUTO_INCREMENT"));
        assert!(sql.ends_with(") ENGINE = InnoDB;"));
    }

    #[test]
    fn drop_table() {
        assert_eq!(
            sample_table().drop_sql(SqlDialect::Sqlite),
            "DROP TABLE IF EXISTS `shops`;",
        );
    }

    #[test]
    fn cascade_delete_clause() {
        let mut builder = TableBuilder::new("trades");
        builder.column("id", ColumnType::Integer).primary_key();
        builder.column("shop_id", ColumnType::Integer);
        builder.foreign_key("shop_id", "shops", "id").cascade_delete();
        let table = builder.build().unwrap();
        assert!(
            table
                .create_sql(SqlDialect::Sqlite)
                .contains("FOREIGN KEY(`shop_id`) REFERENCES `shops`(`id`) ON DELETE CASCADE"),
        );
    }

    #[test]
    fn null_default_is_normalized_away() {
        let mut builder = TableBuilder::new("t");
        builder.column("a", ColumnType::Integer).default_value("null");
        builder.column("b", ColumnType::Integer).default_value("0");
        let table = builder.build().unwrap();
        assert_eq!(
            table.create_sql(SqlDialect::Sqlite),
            "CREATE TABLE IF NOT EXISTS `t`(`a` INTEGER,`b` INTEGER DEFAULT 0);",
        );
    }

    #[test]
    fn table_requires_columns() {
        let builder = TableBuilder::new("empty");
        assert!(matches!(builder.build(), Err(SchemaError::NoColumns { .. })));
    }

    #[test]
    fn foreign_key_lookup_by_column() {
        let table = sample_table();
        assert_eq!(
            table.foreign_key_for("owner_id").map(ForeignKey::referenced_table),
            Some("players"),
        );
        assert!(table.foreign_key_for("name").is_none());
    }

    #[test]
    fn index_default_name_and_if_not_exists() {
        let index = IndexBuilder::new().table("shops").column("uuid").build().unwrap();
        assert_eq!(index.name(), "shops_uuid");
        assert_eq!(
            index.create_sql(SqlDialect::Sqlite),
            "CREATE INDEX IF NOT EXISTS `shops_uuid` ON `shops` (`uuid`);",
        );
        assert_eq!(
            index.create_sql(SqlDialect::MySql),
            "CREATE INDEX `shops_uuid` ON `shops` (`uuid`);",
        );
    }

    #[test]
    fn unique_multi_column_index() {
        let index = IndexBuilder::new()
            .table("worlds")
            .unique()
            .column("name")
            .column("server_id")
            .build()
            .unwrap();
        assert_eq!(
            index.create_sql(SqlDialect::Sqlite),
            "CREATE UNIQUE INDEX IF NOT EXISTS `worlds_name` ON `worlds` (`name`,`server_id`);",
        );
    }

    #[test]
    fn drop_index_needs_table_on_mysql() {
        let index = IndexBuilder::new().table("shops").column("uuid").build().unwrap();
        assert_eq!(index.drop_sql(SqlDialect::Sqlite), "DROP INDEX IF EXISTS `shops_uuid`;");
        assert_eq!(index.drop_sql(SqlDialect::MySql), "DROP INDEX `shops_uuid` ON `shops`;");
    }

    #[test]
    fn index_requires_columns() {
        let result = IndexBuilder::new().table("shops").build();
        assert!(matches!(result, Err(SchemaError::IndexWithoutColumns { .. })));
    }

    #[test]
    fn trigger_sql_per_dialect() {
        let trigger = TriggerBuilder::new()
            .table("players")
            .name("players_touch")
            .event(TriggerEvent::Update)
            .column("name")
            .for_each_row()
            .reaction("UPDATE `players` SET `flag`=1")
            .build()
            .unwrap();
        assert_eq!(
            trigger.create_sql(SqlDialect::Sqlite),
            "CREATE TRIGGER IF NOT EXISTS `players_touch` AFTER UPDATE OF `name` ON `players` \
             FOR EACH ROW BEGIN UPDATE `players` SET `flag`=1; END;",
        );
        assert_eq!(
            trigger.create_sql(SqlDialect::MySql),
            "CREATE TRIGGER `players_touch` AFTER UPDATE OF `name` ON `players` \
             FOR EACH ROW UPDATE `players` SET `flag`=1;",
        );
        assert_eq!(trigger.drop_sql(SqlDialect::MySql), "DROP TRIGGER IF EXISTS `players_touch`;");
    }

    #[test]
    fn trigger_requires_reaction() {
        let result = TriggerBuilder::new()
            .table("players")
            .name("t")
            .event(TriggerEvent::Insert)
            .build();
        assert!(matches!(
            result,
            Err(SchemaError::IncompleteTrigger { missing: "reaction", .. }),
        ));
    }

    #[test]
    fn last_modified_trigger_same_table_mysql() {
        let trigger =
            last_modified_trigger(SqlDialect::MySql, "players", "players", "last_seen", "id")
                .unwrap();
        let sql = trigger.create_sql(SqlDialect::MySql);
        assert!(sql.starts_with("CREATE TRIGGER `players_last_modified` BEFORE UPDATE"));
        assert!(sql.contains("SET NEW.`last_seen`=NOW(3)"));
    }

    #[test]
    fn last_modified_trigger_sqlite() {
        let trigger =
            last_modified_trigger(SqlDialect::Sqlite, "trades", "players", "last_seen", "id")
                .unwrap();
        let sql = trigger.create_sql(SqlDialect::Sqlite);
        assert!(sql.starts_with("CREATE TRIGGER IF NOT EXISTS `trades_last_modified` AFTER UPDATE"));
        assert!(sql.contains("BEGIN UPDATE `players` SET `last_seen`="));
        assert!(sql.ends_with("END;"));
    }

    #[test]
    fn view_create_per_dialect() {
        let view = View::new("combined", "SELECT 1").unwrap();
        assert_eq!(
            view.create_sql(SqlDialect::Sqlite),
            "CREATE VIEW IF NOT EXISTS `combined` AS SELECT 1;",
        );
        assert_eq!(
            view.create_sql(SqlDialect::MySql),
            "CREATE OR REPLACE VIEW `combined` AS SELECT 1;",
        );
        assert_eq!(view.drop_sql(SqlDialect::Sqlite), "DROP VIEW IF EXISTS `combined`;");
    }
}
