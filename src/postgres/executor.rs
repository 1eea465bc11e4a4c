use async_trait::async_trait;
use deadpool_postgres::Object;
use tokio_postgres::{Client, GenericClient, Transaction};

use super::{Params, build_result_set_from_statement};
use crate::error::PgCrudError;
use crate::executor::Executor;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Prepare and run one parameterized statement on any tokio-postgres client.
///
/// # Errors
/// Driver errors are returned unchanged.
pub async fn query_on_client<C>(
    client: &C,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, PgCrudError>
where
    C: GenericClient + Sync,
{
    let stmt = client.prepare(sql).await?;
    let converted = Params::convert(params)?;
    let rows = client.query(&stmt, converted.as_refs()).await?;
    build_result_set_from_statement(&stmt, &rows)
}

#[async_trait]
impl Executor for Client {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, PgCrudError> {
        query_on_client(self, sql, params).await
    }
}

#[async_trait]
impl Executor for Transaction<'_> {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, PgCrudError> {
        query_on_client(self, sql, params).await
    }
}

#[async_trait]
impl Executor for Object {
    /// Pooled connections reuse deadpool's per-connection statement cache.
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, PgCrudError> {
        let stmt = self.prepare_cached(sql).await?;
        let converted = Params::convert(params)?;
        let rows = Client::query(self, &stmt, converted.as_refs()).await?;
        build_result_set_from_statement(&stmt, &rows)
    }
}

#[async_trait]
impl Executor for deadpool_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, PgCrudError> {
        let stmt = self.prepare_cached(sql).await?;
        let converted = Params::convert(params)?;
        let rows = Transaction::query(self, &stmt, converted.as_refs()).await?;
        build_result_set_from_statement(&stmt, &rows)
    }
}
