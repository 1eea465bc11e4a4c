use serde_json::Value;

use super::{Query, execute};
use crate::error::PgCrudError;
use crate::executor::ConnectionProvider;
use crate::results::Document;
use crate::transform::transform_response;
use crate::types::RowValues;

impl<P: ConnectionProvider> Query<'_, P> {
    /// Every matching row, with populated relations nested under their table name.
    ///
    /// # Errors
    /// Usage errors before any connection is taken; then connection, catalog
    /// (`ForeignKeyNotFound`) and driver errors.
    pub async fn find(self) -> Result<Vec<Document>, PgCrudError> {
        self.spec.validate(&[])?;
        self.select_rows("find", false).await
    }

    /// The first matching row, or `None`.
    ///
    /// # Errors
    /// `PgCrudError::LimitAlreadySet` if a positive `limit` was configured, plus the
    /// errors of [`Query::find`].
    pub async fn find_one(self) -> Result<Option<Document>, PgCrudError> {
        self.spec.validate(&[])?;
        self.spec.check_find_one()?;
        let rows = self.select_rows("findOne", true).await?;
        Ok(rows.into_iter().next())
    }

    /// Rows whose column is in a list, given as a JSON object with exactly one key
    /// whose value is an array: `{"id": [1, 2, 3]}`.
    ///
    /// The values are bound as parameters like every other condition. Any conditions
    /// already configured still apply.
    ///
    /// # Errors
    /// `FindInArity` unless there is exactly one key, `FindInNotArray` if its value is
    /// not an array, `EmptyInValues` for an empty array, plus the errors of
    /// [`Query::find`].
    pub async fn find_in(mut self, conditions: &Value) -> Result<Vec<Document>, PgCrudError> {
        let Value::Object(map) = conditions else {
            return Err(PgCrudError::ParameterError(
                "findIn conditions must be a JSON object".to_string(),
            ));
        };
        if map.len() != 1 {
            return Err(PgCrudError::FindInArity { keys: map.len() });
        }
        let Some((column, values)) = map.iter().next() else {
            return Err(PgCrudError::FindInArity { keys: 0 });
        };
        let Value::Array(values) = values else {
            return Err(PgCrudError::FindInNotArray {
                column: column.clone(),
            });
        };
        self.spec = self.spec.where_in(column.as_str(), values.iter().map(RowValues::from_json))?;
        self.spec.validate(&[])?;
        self.select_rows("findIn", false).await
    }

    /// Number of matching rows; `0` when the table is empty.
    ///
    /// # Errors
    /// Usage, connection and driver errors.
    pub async fn count_documents(self) -> Result<i64, PgCrudError> {
        self.spec.validate(&[])?;
        let stmt = self.spec.build_count();
        let target = self.target().await?;
        let rows = execute(target.executor(), self.spec.table(), "countDocuments", &stmt).await?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(RowValues::as_int)
            .copied()
            .unwrap_or(0);
        Ok(count)
    }

    async fn select_rows(
        &self,
        operation: &'static str,
        single: bool,
    ) -> Result<Vec<Document>, PgCrudError> {
        let target = self.target().await?;
        let conn = target.executor();
        let foreign_keys = self
            .db
            .introspector
            .resolve_joins(conn, self.spec.table(), self.spec.populates())
            .await?;
        let stmt = if single {
            self.spec.build_find_one(&foreign_keys)?
        } else {
            self.spec.build_select(&foreign_keys)?
        };
        let rows = execute(conn, self.spec.table(), operation, &stmt).await?;
        Ok(transform_response(
            rows.into_documents(),
            &self.spec.populate_prefixes(),
        ))
    }
}
