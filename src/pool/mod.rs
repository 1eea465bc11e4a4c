mod settings;

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};

pub use settings::{DEFAULT_SOFT_DELETE_COLUMN, DatabaseSettings};

use crate::error::PgCrudError;
use crate::executor::ConnectionProvider;

/// Configuration and connection pool for a Postgres database
///
/// This is the production [`ConnectionProvider`]: every operation that is not given a
/// caller-owned connection checks one out of `pool` and returns it when done.
#[derive(Clone, Debug)]
pub struct ConfigAndPool {
    /// The connection pool
    pub pool: Pool,
}

impl ConfigAndPool {
    /// Build a pool from [`DatabaseSettings`].
    ///
    /// # Errors
    /// Same as [`ConfigAndPool::new_postgres`].
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, PgCrudError> {
        Self::new_postgres(settings.to_pg_config()).await
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    /// Returns `PgCrudError::PoolError` if the pool fails to provide a connection
    /// (including wait/create timeouts).
    pub async fn get_connection(&self) -> Result<Object, PgCrudError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl ConnectionProvider for ConfigAndPool {
    type Connection = Object;

    async fn acquire(&self) -> Result<Object, PgCrudError> {
        self.get_connection().await
    }
}
