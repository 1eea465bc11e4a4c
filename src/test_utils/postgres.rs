use std::sync::LazyLock;

use postgresql_embedded::PostgreSQL;
use tokio::runtime::Runtime;

use crate::pool::{ConfigAndPool, DatabaseSettings};

/// Runtime that owns the embedded server's background work across tests.
static SHARED_RUNTIME: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new().expect("Failed to create tokio runtime for test utilities"));

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    pub database_url: String,
    /// Settings that connect to the embedded instance
    pub settings: DatabaseSettings,
}

/// Start an embedded `PostgreSQL` and create `dbname` in it.
///
/// # Errors
/// Returns an error if the server cannot be set up or started, the database cannot be
/// created, or the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    dbname: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(dbname).await?;

        let server = postgresql.settings();
        let settings = DatabaseSettings {
            host: server.host.clone(),
            port: server.port,
            user: server.username.clone(),
            password: server.password.clone(),
            dbname: dbname.to_string(),
            pool_max_size: 4,
            ..DatabaseSettings::default()
        };
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            settings.user, settings.password, settings.host, settings.port, settings.dbname
        );

        let pool = ConfigAndPool::from_settings(&settings).await?;
        let conn = pool.get_connection().await?;
        conn.execute("SELECT 1", &[]).await?;
        tracing::info!(port = settings.port, "embedded postgres ready");

        Ok(EmbeddedPostgres {
            port: settings.port,
            postgresql,
            database_url,
            settings,
        })
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
