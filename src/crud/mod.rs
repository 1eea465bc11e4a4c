//! Table accessors and the CRUD executor.
//!
//! [`Database`] hands out a fresh [`Query`] per logical operation. A query is
//! configured by chaining and then consumed by exactly one terminal call.
//!
//! ```rust,no_run
//! use pg_crud::prelude::*;
//!
//! # async fn demo(db: &Database<ConfigAndPool>) -> Result<(), PgCrudError> {
//! let page = db
//!     .table("users")
//!     .select("id,name")
//!     .populate("orders", "id,total")
//!     .where_eq([("status", "active")])
//!     .sort(Some("name"), "1")
//!     .pagination(0, 20)
//!     .find()
//!     .await?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```

mod read;
mod write;

pub use write::UpdateEntry;

use crate::entity::Entity;
use crate::error::PgCrudError;
use crate::executor::{ConnectionProvider, ConnectionTarget, Executor};
use crate::introspect::SchemaIntrospector;
use crate::pool::{ConfigAndPool, DEFAULT_SOFT_DELETE_COLUMN, DatabaseSettings};
use crate::query::{QueryAndParams, QuerySpec};
use crate::results::ResultSet;
use crate::types::{ColumnValues, RowValues, SortOrder};

/// Connection provider plus process-lifetime schema knowledge.
#[derive(Debug)]
pub struct Database<P> {
    provider: P,
    introspector: SchemaIntrospector,
    soft_delete_column: String,
}

impl Database<ConfigAndPool> {
    /// Build a pool from `settings` and wrap it.
    ///
    /// # Errors
    /// Same as [`ConfigAndPool::new_postgres`].
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, PgCrudError> {
        let pool = ConfigAndPool::from_settings(settings).await?;
        Ok(Self::new(pool).with_soft_delete_column(&settings.soft_delete_column))
    }
}

impl<P: ConnectionProvider> Database<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            introspector: SchemaIntrospector::new(),
            soft_delete_column: DEFAULT_SOFT_DELETE_COLUMN.to_string(),
        }
    }

    #[must_use]
    pub fn with_soft_delete_column(mut self, column: &str) -> Self {
        self.soft_delete_column = column.to_string();
        self
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn introspector(&self) -> &SchemaIntrospector {
        &self.introspector
    }

    /// Forget cached foreign keys, e.g. after a migration.
    pub fn reload_schema(&self) {
        self.introspector.invalidate();
    }

    /// A fresh builder bound to `table`.
    #[must_use]
    pub fn table(&self, table: &str) -> Query<'_, P> {
        Query {
            db: self,
            spec: QuerySpec::new(table),
            external: None,
        }
    }

    /// A fresh builder bound to `E::TABLE`, restricted to `E::COLUMNS`.
    #[must_use]
    pub fn entity<E: Entity>(&self) -> Query<'_, P> {
        Query {
            db: self,
            spec: QuerySpec::new(E::TABLE).with_declared_columns(E::COLUMNS),
            external: None,
        }
    }
}

/// A table-bound query in progress.
///
/// Configuration methods consume the query and return a new one; terminal methods
/// (`find`, `create_one`, `update_one`, ...) consume it for good.
#[must_use = "a query does nothing until a terminal method is awaited"]
pub struct Query<'a, P> {
    db: &'a Database<P>,
    spec: QuerySpec,
    external: Option<&'a dyn Executor>,
}

impl<'a, P: ConnectionProvider> Query<'a, P> {
    /// Run on a caller-owned connection or transaction instead of a pooled one.
    /// The caller stays responsible for committing and releasing it.
    pub fn using(mut self, conn: &'a dyn Executor) -> Self {
        self.external = Some(conn);
        self
    }

    #[must_use]
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn select(mut self, fields: &str) -> Self {
        self.spec = self.spec.select(fields);
        self
    }

    pub fn where_eq(mut self, conditions: impl Into<ColumnValues>) -> Self {
        self.spec = self.spec.where_eq(conditions);
        self
    }

    /// # Errors
    /// See [`QuerySpec::where_in`].
    pub fn where_in<V>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, PgCrudError>
    where
        V: Into<RowValues>,
    {
        self.spec = self.spec.where_in(column, values)?;
        Ok(self)
    }

    /// # Errors
    /// See [`QuerySpec::where_raw`].
    pub fn where_raw(
        mut self,
        sql: impl Into<String>,
        params: Vec<RowValues>,
    ) -> Result<Self, PgCrudError> {
        self.spec = self.spec.where_raw(sql, params)?;
        Ok(self)
    }

    pub fn or(mut self, conditions: impl Into<ColumnValues>) -> Self {
        self.spec = self.spec.or(conditions);
        self
    }

    pub fn filter(mut self, conditions: impl Into<ColumnValues>) -> Self {
        self.spec = self.spec.filter(conditions);
        self
    }

    pub fn populate(mut self, related: impl Into<String>, fields: &str) -> Self {
        self.spec = self.spec.populate(related, fields);
        self
    }

    pub fn sort(mut self, by: Option<&str>, order: impl Into<SortOrder>) -> Self {
        self.spec = self.spec.sort(by, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.spec = self.spec.limit(limit);
        self
    }

    pub fn skip(mut self, offset: u64) -> Self {
        self.spec = self.spec.skip(offset);
        self
    }

    pub fn pagination(mut self, page_index: u64, page_size: u64) -> Self {
        self.spec = self.spec.pagination(page_index, page_size);
        self
    }

    /// Connection for one terminal operation; released when the target drops.
    async fn target(&self) -> Result<ConnectionTarget<'a, P::Connection>, PgCrudError> {
        ConnectionTarget::resolve(&self.db.provider, self.external).await
    }

    /// Pass caller SQL straight through. No clause bookkeeping applies.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn raw_sql(
        self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<crate::Document>, PgCrudError> {
        let target = self.target().await?;
        let stmt = QueryAndParams {
            query: sql.to_string(),
            params: params.to_vec(),
        };
        let rows = execute(target.executor(), self.spec.table(), "rawSql", &stmt).await?;
        Ok(rows.into_documents())
    }
}

/// Run one assembled statement, logging its shape (never its values).
pub(crate) async fn execute(
    conn: &dyn Executor,
    table: &str,
    operation: &'static str,
    stmt: &QueryAndParams,
) -> Result<ResultSet, PgCrudError> {
    tracing::debug!(
        table,
        operation,
        sql = %stmt.query,
        params = stmt.params.len(),
        "executing statement"
    );
    let rows = conn.query(&stmt.query, &stmt.params).await?;
    tracing::trace!(table, operation, rows = rows.results.len(), "statement finished");
    Ok(rows)
}
