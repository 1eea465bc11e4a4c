//! Foreign-key discovery from the Postgres catalog.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;

use crate::error::PgCrudError;
use crate::executor::Executor;
use crate::query::{JoinSpec, QueryAndParams, quote_table};
use crate::types::RowValues;

static FIRST_PAREN_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\(([^)]*)\)").expect("valid foreign key pattern")
});

/// Catalog query listing foreign keys declared on `table` that reference `related`.
#[must_use]
pub fn foreign_key_query(table: &str, related: &str) -> QueryAndParams {
    QueryAndParams {
        query: "SELECT conname, pg_get_constraintdef(oid) AS condef \
                FROM pg_constraint \
                WHERE contype = 'f' \
                AND conrelid = to_regclass($1) \
                AND confrelid = to_regclass($2) \
                ORDER BY conname"
            .to_string(),
        params: vec![
            RowValues::Text(quote_table(table)),
            RowValues::Text(quote_table(related)),
        ],
    }
}

/// Pull the referencing column out of a constraint definition such as
/// `FOREIGN KEY (order_id) REFERENCES orders(id)`.
///
/// Returns `None` for composite keys.
#[must_use]
pub fn parse_foreign_key_column(definition: &str) -> Option<String> {
    let group = FIRST_PAREN_GROUP.captures(definition)?.get(1)?.as_str().trim();
    if group.is_empty() || group.contains(',') {
        return None;
    }
    let column = group
        .strip_prefix('"')
        .and_then(|g| g.strip_suffix('"'))
        .map_or_else(|| group.to_string(), |g| g.replace("\"\"", "\""));
    Some(column)
}

/// Resolves the column linking a table to a related table, caching each answer per
/// `(table, related)` pair until [`SchemaIntrospector::invalidate`] is called.
#[derive(Debug, Default)]
pub struct SchemaIntrospector {
    cache: RwLock<HashMap<(String, String), String>>,
}

impl SchemaIntrospector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cached(&self, table: &str, related: &str) -> Option<String> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(&(table.to_string(), related.to_string()))
            .cloned()
    }

    /// Drop every cached relationship; the next populate re-reads the catalog.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.clear();
        tracing::debug!("foreign key cache cleared");
    }

    /// Column of `table` holding a single-column foreign key to `related`.
    ///
    /// # Errors
    /// Returns `PgCrudError::ForeignKeyNotFound` when no such constraint exists, or the
    /// driver error if the catalog query fails.
    pub async fn detect_foreign_key(
        &self,
        conn: &dyn Executor,
        table: &str,
        related: &str,
    ) -> Result<String, PgCrudError> {
        if let Some(column) = self.cached(table, related) {
            tracing::debug!(table, related, column = %column, "foreign key cache hit");
            return Ok(column);
        }

        let stmt = foreign_key_query(table, related);
        let rows = conn.query(&stmt.query, &stmt.params).await?;
        let column = rows
            .results
            .iter()
            .filter_map(|row| row.get("condef").and_then(RowValues::as_text))
            .find_map(parse_foreign_key_column)
            .ok_or_else(|| PgCrudError::ForeignKeyNotFound {
                table: table.to_string(),
                related: related.to_string(),
            })?;

        tracing::debug!(table, related, column = %column, "foreign key detected");
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.insert((table.to_string(), related.to_string()), column.clone());
        Ok(column)
    }

    /// Foreign key columns for each populate request, in order.
    ///
    /// # Errors
    /// The first failure of [`SchemaIntrospector::detect_foreign_key`].
    pub async fn resolve_joins(
        &self,
        conn: &dyn Executor,
        table: &str,
        joins: &[JoinSpec],
    ) -> Result<Vec<String>, PgCrudError> {
        let mut columns = Vec::with_capacity(joins.len());
        for join in joins {
            columns.push(self.detect_foreign_key(conn, table, &join.table).await?);
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingProvider;
    use crate::executor::ConnectionProvider;

    #[test]
    fn parses_constraint_definitions() {
        assert_eq!(
            parse_foreign_key_column("FOREIGN KEY (order_id) REFERENCES orders(id)"),
            Some("order_id".to_string())
        );
        assert_eq!(
            parse_foreign_key_column(r#"FOREIGN KEY ("orderId") REFERENCES orders(id)"#),
            Some("orderId".to_string())
        );
        assert_eq!(
            parse_foreign_key_column("FOREIGN KEY (a, b) REFERENCES pairs(a, b)"),
            None
        );
        assert_eq!(parse_foreign_key_column("CHECK true"), None);
    }

    #[test]
    fn catalog_query_quotes_table_names() {
        let stmt = foreign_key_query("users", "public.orders");
        assert_eq!(
            stmt.params,
            vec![
                RowValues::Text("\"users\"".into()),
                RowValues::Text("\"public\".\"orders\"".into())
            ]
        );
        assert!(stmt.query.contains("contype = 'f'"));
    }

    #[test]
    fn detection_is_cached_per_pair() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let provider = RecordingProvider::new();
        provider.push_rows(
            &["conname", "condef"],
            vec![vec![
                RowValues::Text("users_order_id_fkey".into()),
                RowValues::Text("FOREIGN KEY (order_id) REFERENCES orders(id)".into()),
            ]],
        );
        let introspector = SchemaIntrospector::new();

        rt.block_on(async {
            let conn = provider.acquire().await.unwrap();
            let first = introspector
                .detect_foreign_key(&conn, "users", "orders")
                .await
                .unwrap();
            let second = introspector
                .detect_foreign_key(&conn, "users", "orders")
                .await
                .unwrap();
            assert_eq!(first, "order_id");
            assert_eq!(second, "order_id");
        });
        assert_eq!(provider.statements().len(), 1);

        introspector.invalidate();
        assert_eq!(introspector.cached("users", "orders"), None);
    }

    #[test]
    fn missing_relationship_names_both_tables() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let provider = RecordingProvider::new();
        let introspector = SchemaIntrospector::new();
        let err = rt
            .block_on(async {
                let conn = provider.acquire().await.unwrap();
                introspector.detect_foreign_key(&conn, "users", "coupons").await
            })
            .unwrap_err();
        assert!(
            matches!(err, PgCrudError::ForeignKeyNotFound { ref table, ref related } if table == "users" && related == "coupons")
        );
        assert!(err.to_string().contains("users") && err.to_string().contains("coupons"));
    }
}
