use deadpool_postgres::Config as PgConfig;
use tokio_postgres::NoTls;

use crate::error::PgCrudError;
use crate::pool::ConfigAndPool;

impl ConfigAndPool {
    /// Build a Postgres pool from a deadpool config.
    ///
    /// # Errors
    /// Returns `PgCrudError::ConfigError` if a required config field is missing or
    /// `PgCrudError::ConnectionError` if pool creation fails.
    #[allow(clippy::unused_async)]
    pub async fn new_postgres(pg_config: PgConfig) -> Result<Self, PgCrudError> {
        if pg_config.dbname.is_none() {
            return Err(PgCrudError::ConfigError("dbname is required".to_string()));
        }
        if pg_config.host.is_none() {
            return Err(PgCrudError::ConfigError("host is required".to_string()));
        }
        if pg_config.port.is_none() {
            return Err(PgCrudError::ConfigError("port is required".to_string()));
        }
        if pg_config.user.is_none() {
            return Err(PgCrudError::ConfigError("user is required".to_string()));
        }
        if pg_config.password.is_none() {
            return Err(PgCrudError::ConfigError("password is required".to_string()));
        }

        let pool = pg_config
            .create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)
            .map_err(|e| {
                PgCrudError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })?;

        tracing::debug!(
            host = ?pg_config.host,
            dbname = ?pg_config.dbname,
            max_size = pool.status().max_size,
            "postgres pool created"
        );

        Ok(ConfigAndPool { pool })
    }
}
