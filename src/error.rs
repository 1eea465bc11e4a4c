use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgCrudError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    PoolError(#[from] deadpool_postgres::PoolError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("whereIn on column {column} requires at least one value")]
    EmptyInValues { column: String },

    #[error("Where clause required for {operation}")]
    WhereClauseRequired { operation: &'static str },

    #[error("findOne cannot be combined with an explicit limit ({limit})")]
    LimitAlreadySet { limit: u64 },

    #[error("findIn expects exactly one column, got {keys}")]
    FindInArity { keys: usize },

    #[error("findIn value for column {column} must be a non-empty array")]
    FindInNotArray { column: String },

    #[error("{operation} requires at least one column value")]
    EmptyMutation { operation: &'static str },

    #[error("column {column} is not declared on table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("no single-column foreign key links table {table} to table {related}")]
    ForeignKeyNotFound { table: String, related: String },
}

impl PgCrudError {
    /// True for errors raised by the builder before any SQL was sent.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInValues { .. }
                | Self::WhereClauseRequired { .. }
                | Self::LimitAlreadySet { .. }
                | Self::FindInArity { .. }
                | Self::FindInNotArray { .. }
                | Self::EmptyMutation { .. }
                | Self::UnknownColumn { .. }
        )
    }
}
