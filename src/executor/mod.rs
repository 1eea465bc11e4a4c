mod targets;

use async_trait::async_trait;

use crate::error::PgCrudError;
use crate::results::ResultSet;
use crate::types::RowValues;

pub(crate) use targets::ConnectionTarget;

/// Anything that can run one parameterized statement and hand back its rows.
///
/// Implemented for `tokio_postgres::Client`, `tokio_postgres::Transaction`, pooled
/// `deadpool_postgres::Object`s and `deadpool_postgres::Transaction`s. Pass a
/// transaction to [`Query::using`](crate::crud::Query::using) to run several operations
/// atomically; this crate never issues `BEGIN`/`COMMIT` itself.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute `sql` with positional `$n` parameters and return every row produced.
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, PgCrudError>;
}

/// Source of connections for operations that were not handed one by the caller.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Connection: Executor + 'static;

    /// Check out a connection. Dropping it returns it to the provider.
    async fn acquire(&self) -> Result<Self::Connection, PgCrudError>;
}
