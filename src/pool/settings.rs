use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use deadpool_postgres::{Config as PgConfig, PoolConfig};
use serde::Deserialize;

use crate::error::PgCrudError;

pub const DEFAULT_SOFT_DELETE_COLUMN: &str = "is_deleted";

/// Connection and pool settings.
///
/// Deserializable so it can be embedded in an application config file; see
/// [`DatabaseSettings::from_env`] for the environment variable form.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub pool_max_size: usize,
    pub connect_timeout_secs: u64,
    pub wait_timeout_secs: u64,
    /// Boolean column set to true by `soft_delete`
    pub soft_delete_column: String,
}

// The password never reaches logs through `{:?}`.
impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .field("pool_max_size", &self.pool_max_size)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("wait_timeout_secs", &self.wait_timeout_secs)
            .field("soft_delete_column", &self.soft_delete_column)
            .finish()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "postgres".to_string(),
            pool_max_size: 16,
            connect_timeout_secs: 10,
            wait_timeout_secs: 30,
            soft_delete_column: DEFAULT_SOFT_DELETE_COLUMN.to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Read settings from `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD`, `PGDATABASE`,
    /// `PG_POOL_MAX_SIZE`, `PG_CONNECT_TIMEOUT_SECS`, `PG_WAIT_TIMEOUT_SECS` and
    /// `PG_SOFT_DELETE_COLUMN`. Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns `PgCrudError::ConfigError` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, PgCrudError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, PgCrudError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(v) = lookup("PGHOST") {
            settings.host = v;
        }
        if let Some(v) = lookup("PGPORT") {
            settings.port = parse_var("PGPORT", &v)?;
        }
        if let Some(v) = lookup("PGUSER") {
            settings.user = v;
        }
        if let Some(v) = lookup("PGPASSWORD") {
            settings.password = v;
        }
        if let Some(v) = lookup("PGDATABASE") {
            settings.dbname = v;
        }
        if let Some(v) = lookup("PG_POOL_MAX_SIZE") {
            settings.pool_max_size = parse_var("PG_POOL_MAX_SIZE", &v)?;
        }
        if let Some(v) = lookup("PG_CONNECT_TIMEOUT_SECS") {
            settings.connect_timeout_secs = parse_var("PG_CONNECT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("PG_WAIT_TIMEOUT_SECS") {
            settings.wait_timeout_secs = parse_var("PG_WAIT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("PG_SOFT_DELETE_COLUMN") {
            settings.soft_delete_column = v;
        }
        Ok(settings)
    }

    /// Map onto a deadpool config, pool sizing and timeouts included.
    #[must_use]
    pub fn to_pg_config(&self) -> PgConfig {
        let mut cfg = PgConfig::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.dbname = Some(self.dbname.clone());
        cfg.connect_timeout = Some(Duration::from_secs(self.connect_timeout_secs));
        let mut pool = PoolConfig::new(self.pool_max_size);
        pool.timeouts.wait = Some(Duration::from_secs(self.wait_timeout_secs));
        pool.timeouts.create = Some(Duration::from_secs(self.connect_timeout_secs));
        cfg.pool = Some(pool);
        cfg
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, PgCrudError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| PgCrudError::ConfigError(format!("{key}={raw:?} is invalid: {e}")))
}
