//! Combined views: a fact table flattened together with its foreign-key
//! targets into one read-only relation.
//!
//! Every column of the fact table that is the source of a joined foreign key
//! is recursively replaced by the referenced table's columns, aliased under a
//! chain of role names (`shop_owner_name`). Joined tables contribute `LEFT
//! JOIN`s so nullable participants (an admin shop without an owner) never
//! eliminate rows. The flattening is a pure function from schema to text and
//! is testable without any database.

use crate::dialect::{SqlDialect, qualified, quote_ident};
use crate::error::SchemaError;
use crate::schema::{Column, ForeignKey, Table, View};

/// One foreign-key hop participating in a combined view.
///
/// The `role` is the alias namespace the *source* table was joined under
/// (empty for the fact table itself); the `joined_role` is the alias assigned
/// to the joined table, used to disambiguate repeated joins to the same
/// target (item1/item2/result items all join the items table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyJoin {
    table_name: String,
    role: String,
    joined_table: Table,
    joined_role: String,
    foreign_key: ForeignKey,
}

impl ForeignKeyJoin {
    /// A join from the fact table itself; no source role is needed.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::JoinTargetMismatch`] if the foreign key does
    /// not reference `joined_table`.
    pub fn new(
        table: &Table,
        joined_table: &Table,
        joined_role: impl Into<String>,
        foreign_key: &ForeignKey,
    ) -> Result<Self, SchemaError> {
        Self::nested(table, "", joined_table, joined_role, foreign_key)
    }

    /// A join from a table that is itself joined under `role`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::JoinTargetMismatch`] if the foreign key does
    /// not reference `joined_table`.
    pub fn nested(
        table: &Table,
        role: impl Into<String>,
        joined_table: &Table,
        joined_role: impl Into<String>,
        foreign_key: &ForeignKey,
    ) -> Result<Self, SchemaError> {
        if foreign_key.referenced_table() != joined_table.name() {
            return Err(SchemaError::JoinTargetMismatch {
                table: table.name().to_owned(),
                column: foreign_key.column().to_owned(),
                referenced: foreign_key.referenced_table().to_owned(),
                joined: joined_table.name().to_owned(),
            });
        }
        Ok(Self {
            table_name: table.name().to_owned(),
            role: role.into(),
            joined_table: joined_table.clone(),
            joined_role: joined_role.into(),
            foreign_key: foreign_key.clone(),
        })
    }

    /// The name of the table the foreign key lives on.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The alias namespace of the source table; empty for the fact table.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The joined table.
    pub const fn joined_table(&self) -> &Table {
        &self.joined_table
    }

    /// The alias assigned to the joined table.
    pub fn joined_role(&self) -> &str {
        &self.joined_role
    }

    /// The foreign key this join follows.
    pub const fn foreign_key(&self) -> &ForeignKey {
        &self.foreign_key
    }
}

/// Recursively replaces foreign-key columns with the referenced table's
/// columns, collecting aliased select items.
fn expand_column(
    table: &Table,
    column: &Column,
    role: &str,
    joins: &[ForeignKeyJoin],
    delimiter: &str,
    omit_referenced_columns: bool,
    out: &mut Vec<String>,
) {
    let join = joins
        .iter()
        .find(|j| j.table_name == table.name() && j.foreign_key.column() == column.name());
    if let Some(join) = join {
        for joined_column in join.joined_table.columns() {
            if omit_referenced_columns
                && joined_column.name() == join.foreign_key.referenced_column()
            {
                continue;
            }
            // Combine the parent role and the joined role; omit the
            // delimiter when either side is empty.
            let joined_role = if role.is_empty() || join.joined_role.is_empty() {
                format!("{role}{}", join.joined_role)
            } else {
                format!("{role}{delimiter}{}", join.joined_role)
            };
            expand_column(
                &join.joined_table,
                joined_column,
                &joined_role,
                joins,
                delimiter,
                omit_referenced_columns,
                out,
            );
        }
    } else {
        let (role_prefix, role_name) = if role.is_empty() {
            (String::new(), table.name())
        } else {
            (format!("{role}{delimiter}"), role)
        };
        out.push(format!(
            "{} AS {}",
            qualified(role_name, column.name()),
            quote_ident(&format!("{role_prefix}{}", column.name())),
        ));
    }
}

/// Computes the backing `SELECT` of a combined view.
///
/// `omit_referenced_columns` controls whether the referenced id columns of
/// joined tables appear in the output. The returned statement carries no
/// trailing `;` so it can be embedded.
pub fn select_combined_sql(
    table: &Table,
    joins: &[ForeignKeyJoin],
    role_delimiter: &str,
    omit_referenced_columns: bool,
) -> String {
    let mut select_items = Vec::new();
    for column in table.columns() {
        expand_column(
            table,
            column,
            "",
            joins,
            role_delimiter,
            omit_referenced_columns,
            &mut select_items,
        );
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        select_items.join(","),
        table.quoted_name(),
    );

    for join in joins {
        let mut clause = format!(" LEFT JOIN {}", join.joined_table.quoted_name());

        // Alias namespace of the join's source table.
        let role = if join.role.is_empty() {
            join.table_name.as_str()
        } else {
            join.role.as_str()
        };

        // Alias of the joined table; only emitted when a role is assigned.
        let joined_role = if join.joined_role.is_empty() {
            join.foreign_key.referenced_table().to_owned()
        } else {
            let combined = if join.role.is_empty() {
                join.joined_role.clone()
            } else {
                format!("{}{role_delimiter}{}", join.role, join.joined_role)
            };
            clause.push(' ');
            clause.push_str(&quote_ident(&combined));
            combined
        };

        clause.push_str(&format!(
            " ON {}={}",
            qualified(&joined_role, join.foreign_key.referenced_column()),
            qualified(role, join.foreign_key.column()),
        ));
        sql.push_str(&clause);
    }
    sql
}

/// Collects a combined view definition.
#[derive(Debug)]
pub struct CombinedViewBuilder {
    name: String,
    table: Option<Table>,
    joins: Vec<ForeignKeyJoin>,
    omit_referenced_columns: bool,
    role_delimiter: String,
}

impl CombinedViewBuilder {
    /// Starts a combined view definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            joins: Vec::new(),
            omit_referenced_columns: false,
            role_delimiter: String::from(crate::DEFAULT_ROLE_DELIMITER),
        }
    }

    /// The fact table the view is built around.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// Adds a foreign-key join.
    #[must_use]
    pub fn join(mut self, join: ForeignKeyJoin) -> Self {
        self.joins.push(join);
        self
    }

    /// Whether to omit the referenced id columns of joined tables.
    #[must_use]
    pub const fn omit_referenced_columns(mut self, omit: bool) -> Self {
        self.omit_referenced_columns = omit;
        self
    }

    /// The delimiter between role names in column aliases.
    #[must_use]
    pub fn role_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.role_delimiter = delimiter.into();
        self
    }

    /// Computes the backing `SELECT` and produces the immutable
    /// [`CombinedView`].
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the name is empty or no fact table was
    /// set.
    pub fn build(self) -> Result<CombinedView, SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyName {
                kind: "combined view",
            });
        }
        let Some(table) = self.table else {
            return Err(SchemaError::ViewWithoutTable { name: self.name });
        };
        let select_sql = select_combined_sql(
            &table,
            &self.joins,
            &self.role_delimiter,
            self.omit_referenced_columns,
        );
        let view = View::new(self.name, select_sql)?;
        Ok(CombinedView {
            table,
            joins: self.joins,
            role_delimiter: self.role_delimiter,
            view,
        })
    }
}

/// An immutable combined view: the computed flat relation over a fact table
/// and its foreign-key joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedView {
    table: Table,
    joins: Vec<ForeignKeyJoin>,
    role_delimiter: String,
    view: View,
}

impl CombinedView {
    /// The view name.
    pub fn name(&self) -> &str {
        self.view.name()
    }

    /// The quoted view name.
    pub fn quoted_name(&self) -> String {
        self.view.quoted_name()
    }

    /// The fact table.
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// The participating joins, in declaration order.
    pub fn joins(&self) -> &[ForeignKeyJoin] {
        &self.joins
    }

    /// The delimiter between role names in column aliases.
    pub fn role_delimiter(&self) -> &str {
        &self.role_delimiter
    }

    /// The backing plain [`View`].
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// Resolves the output column name for `column` reached through the
    /// given role chain.
    ///
    /// An empty role chain addresses the fact table's own columns.
    pub fn column_name(&self, roles: &[&str], column: &str) -> String {
        if roles.is_empty() {
            return column.to_owned();
        }
        let mut name = roles.join(&self.role_delimiter);
        name.push_str(&self.role_delimiter);
        name.push_str(column);
        name
    }

    /// Like [`CombinedView::column_name`], but quoted for embedding in SQL.
    pub fn quoted_column(&self, roles: &[&str], column: &str) -> String {
        quote_ident(&self.column_name(roles, column))
    }

    /// Generates the `CREATE VIEW` statement.
    pub fn create_sql(&self, dialect: SqlDialect) -> String {
        self.view.create_sql(dialect)
    }

    /// Generates the `DROP VIEW` statement.
    pub fn drop_sql(&self, dialect: SqlDialect) -> String {
        self.view.drop_sql(dialect)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dialect::ColumnType;
    use crate::schema::TableBuilder;

    fn players_table() -> Table {
        let mut builder = TableBuilder::new("players");
        builder.column("id", ColumnType::Integer).primary_key();
        builder.column("uuid", ColumnType::Char(36)).not_null();
        builder.build().unwrap()
    }

    fn shops_table() -> Table {
        let mut builder = TableBuilder::new("shops");
        builder.column("id", ColumnType::Integer).primary_key();
        builder.column("owner_id", ColumnType::Integer);
        builder.foreign_key("owner_id", "players", "id");
        builder.build().unwrap()
    }

    fn trades_table() -> Table {
        let mut builder = TableBuilder::new("trades");
        builder.column("id", ColumnType::Integer).primary_key();
        builder.column("player_id", ColumnType::Integer).not_null();
        builder.column("shop_id", ColumnType::Integer).not_null();
        builder.foreign_key("player_id", "players", "id");
        builder.foreign_key("shop_id", "shops", "id");
        builder.build().unwrap()
    }

    #[test]
    fn single_join_flattening() {
        let players = players_table();
        let mut builder = TableBuilder::new("trades");
        builder.column("id", ColumnType::Integer).primary_key();
        builder.column("player_id", ColumnType::Integer).not_null();
        builder.foreign_key("player_id", "players", "id");
        let trades = builder.build().unwrap();
        let fk = trades.foreign_key_for("player_id").unwrap().clone();

        let join = ForeignKeyJoin::new(&trades, &players, "player", &fk).unwrap();
        let sql = select_combined_sql(&trades, &[join], "_", false);
        assert_eq!(
            sql,
            "SELECT `trades`.`id` AS `id`,\
             `player`.`id` AS `player_id`,\
             `player`.`uuid` AS `player_uuid` \
             FROM `trades` \
             LEFT JOIN `players` `player` ON `player`.`id`=`trades`.`player_id`",
        );
    }

    #[test]
    fn omitting_referenced_columns_drops_ids() {
        let players = players_table();
        let mut builder = TableBuilder::new("trades");
        builder.column("id", ColumnType::Integer).primary_key();
        builder.column("player_id", ColumnType::Integer).not_null();
        builder.foreign_key("player_id", "players", "id");
        let trades = builder.build().unwrap();
        let fk = trades.foreign_key_for("player_id").unwrap().clone();

        let join = ForeignKeyJoin::new(&trades, &players, "player", &fk).unwrap();
        let sql = select_combined_sql(&trades, &[join], "_", true);
        assert!(sql.contains("`player`.`uuid` AS `player_uuid`"));
        assert!(!sql.contains("AS `player_id`"));
    }

    #[test]
    fn chained_joins_combine_roles() {
        let players = players_table();
        let shops = shops_table();
        let trades = trades_table();
        let fk_player = trades.foreign_key_for("player_id").unwrap().clone();
        let fk_shop = trades.foreign_key_for("shop_id").unwrap().clone();
        let fk_owner = shops.foreign_key_for("owner_id").unwrap().clone();

        let joins = vec![
            ForeignKeyJoin::new(&trades, &players, "player", &fk_player).unwrap(),
            ForeignKeyJoin::new(&trades, &shops, "shop", &fk_shop).unwrap(),
            ForeignKeyJoin::nested(&shops, "shop", &players, "owner", &fk_owner).unwrap(),
        ];
        let sql = select_combined_sql(&trades, &joins, "_", false);

        // The owner's columns surface under the combined shop_owner role.
        assert!(sql.contains("`shop_owner`.`id` AS `shop_owner_id`"));
        assert!(sql.contains("`shop_owner`.`uuid` AS `shop_owner_uuid`"));
        // The nested join aliases the players table as shop_owner.
        assert!(sql.contains("LEFT JOIN `players` `shop_owner` ON `shop_owner`.`id`=`shop`.`owner_id`"));
        // The shop's own id survives under the shop role.
        assert!(sql.contains("`shop`.`id` AS `shop_id`"));
    }

    #[test]
    fn custom_role_delimiter() {
        let players = players_table();
        let mut builder = TableBuilder::new("trades");
        builder.column("player_id", ColumnType::Integer).not_null();
        builder.foreign_key("player_id", "players", "id");
        let trades = builder.build().unwrap();
        let fk = trades.foreign_key_for("player_id").unwrap().clone();

        let join = ForeignKeyJoin::new(&trades, &players, "player", &fk).unwrap();
        let sql = select_combined_sql(&trades, &[join], "$", false);
        assert!(sql.contains("AS `player$uuid`"));
    }

    #[test]
    fn join_target_must_match_foreign_key() {
        let players = players_table();
        let shops = shops_table();
        let trades = trades_table();
        let fk_player = trades.foreign_key_for("player_id").unwrap().clone();

        let result = ForeignKeyJoin::new(&trades, &shops, "player", &fk_player);
        assert!(matches!(result, Err(SchemaError::JoinTargetMismatch { .. })));
    }

    #[test]
    fn builder_produces_create_statement() {
        let players = players_table();
        let mut builder = TableBuilder::new("trades");
        builder.column("player_id", ColumnType::Integer).not_null();
        builder.foreign_key("player_id", "players", "id");
        let trades = builder.build().unwrap();
        let fk = trades.foreign_key_for("player_id").unwrap().clone();

        let view = CombinedViewBuilder::new("trades_combined_view")
            .table(trades.clone())
            .join(ForeignKeyJoin::new(&trades, &players, "player", &fk).unwrap())
            .build()
            .unwrap();

        let create = view.create_sql(SqlDialect::Sqlite);
        assert!(create.starts_with("CREATE VIEW IF NOT EXISTS `trades_combined_view` AS SELECT"));
        assert_eq!(view.drop_sql(SqlDialect::Sqlite), "DROP VIEW IF EXISTS `trades_combined_view`;");
    }

    #[test]
    fn column_name_resolution() {
        let players = players_table();
        let mut builder = TableBuilder::new("trades");
        builder.column("player_id", ColumnType::Integer).not_null();
        builder.foreign_key("player_id", "players", "id");
        let trades = builder.build().unwrap();
        let fk = trades.foreign_key_for("player_id").unwrap().clone();

        let view = CombinedViewBuilder::new("v")
            .table(trades.clone())
            .join(ForeignKeyJoin::new(&trades, &players, "player", &fk).unwrap())
            .build()
            .unwrap();

        assert_eq!(view.column_name(&[], "id"), "id");
        assert_eq!(view.column_name(&["player"], "uuid"), "player_uuid");
        assert_eq!(view.column_name(&["shop", "owner"], "name"), "shop_owner_name");
        assert_eq!(view.quoted_column(&["player"], "uuid"), "`player_uuid`");
    }

    #[test]
    fn missing_fact_table_is_rejected() {
        let result = CombinedViewBuilder::new("v").build();
        assert!(matches!(result, Err(SchemaError::ViewWithoutTable { .. })));
    }
}
