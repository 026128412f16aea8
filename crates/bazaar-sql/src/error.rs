//! Schema definition errors.

/// An invalid schema definition was handed to a builder.
///
/// These indicate programming errors in the schema declarations, not
/// operational failures; they surface before any SQL is generated or
/// executed and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A schema object was given an empty name.
    #[error("{kind} name must not be empty")]
    EmptyName {
        /// The kind of schema object ("table", "index", ...).
        kind: &'static str,
    },

    /// A table was built without any columns.
    #[error("table `{table}` has no columns")]
    NoColumns {
        /// The offending table.
        table: String,
    },

    /// A column was given an empty name.
    #[error("table `{table}` declares a column with an empty name")]
    EmptyColumnName {
        /// The table declaring the column.
        table: String,
    },

    /// A foreign key was built with an empty column or reference.
    #[error("foreign key on table `{table}` is incomplete")]
    IncompleteForeignKey {
        /// The table declaring the foreign key.
        table: String,
    },

    /// An index was built without any columns.
    #[error("index `{name}` has no columns")]
    IndexWithoutColumns {
        /// The offending index.
        name: String,
    },

    /// A trigger was built without an event or reaction.
    #[error("trigger `{name}` is missing its {missing}")]
    IncompleteTrigger {
        /// The offending trigger.
        name: String,
        /// Which required part is missing.
        missing: &'static str,
    },

    /// A view was built without a backing SELECT.
    #[error("view `{name}` has no select statement")]
    ViewWithoutSelect {
        /// The offending view.
        name: String,
    },

    /// A combined view was built without a fact table.
    #[error("combined view `{name}` has no fact table")]
    ViewWithoutTable {
        /// The offending combined view.
        name: String,
    },

    /// A join's foreign key does not reference the joined table.
    #[error(
        "foreign key join on `{table}.{column}` references `{referenced}`, \
         but the joined table is `{joined}`"
    )]
    JoinTargetMismatch {
        /// The table the foreign key lives on.
        table: String,
        /// The foreign key's source column.
        column: String,
        /// The table the foreign key references.
        referenced: String,
        /// The table the join was declared against.
        joined: String,
    },
}
