use serde_json::Value;

use super::{Query, execute};
use crate::error::PgCrudError;
use crate::executor::ConnectionProvider;
use crate::results::{Document, ResultSet};
use crate::types::ColumnValues;

/// One step of [`Query::update_many`]: the equality conditions selecting the row and
/// the values to set on it.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEntry {
    pub filter: ColumnValues,
    pub data: ColumnValues,
}

impl UpdateEntry {
    pub fn new(filter: impl Into<ColumnValues>, data: impl Into<ColumnValues>) -> Self {
        Self {
            filter: filter.into(),
            data: data.into(),
        }
    }

    /// Split `{"where": {...}, "field": value, ...}` into conditions and values.
    ///
    /// # Errors
    /// `PgCrudError::ParameterError` if `value` or its `where` member is not an object.
    pub fn from_json(value: &Value) -> Result<Self, PgCrudError> {
        let Value::Object(map) = value else {
            return Err(PgCrudError::ParameterError(format!(
                "expected an update entry object, got {value}"
            )));
        };
        let filter = match map.get("where") {
            Some(conditions) => ColumnValues::from_json(conditions)?,
            None => ColumnValues::new(),
        };
        let data = map
            .iter()
            .filter(|(key, _)| key.as_str() != "where")
            .map(|(key, v)| (key.clone(), crate::types::RowValues::from_json(v)))
            .collect();
        Ok(Self { filter, data })
    }
}

fn ids(rows: &ResultSet) -> Vec<Value> {
    rows.results
        .iter()
        .filter_map(|row| row.get("id"))
        .map(|id| id.to_json())
        .collect()
}

impl<P: ConnectionProvider> Query<'_, P> {
    /// Insert one row and return what `RETURNING` produced (the selected fields, or `id`).
    ///
    /// # Errors
    /// Usage, connection and driver errors.
    pub async fn create_one(self, data: impl Into<ColumnValues>) -> Result<Document, PgCrudError> {
        let record = data.into();
        self.spec.validate(&record.columns().collect::<Vec<_>>())?;
        let stmt = self.spec.build_insert(&record);
        let target = self.target().await?;
        let rows = execute(target.executor(), self.spec.table(), "createOne", &stmt).await?;
        rows.into_documents().into_iter().next().ok_or_else(|| {
            PgCrudError::ExecutionError(format!(
                "insert into {} returned no row",
                self.spec.table()
            ))
        })
    }

    /// Insert every record with one multi-row statement.
    ///
    /// # Errors
    /// `PgCrudError::EmptyMutation` for an empty batch, plus the errors of
    /// [`Query::create_one`].
    pub async fn create_many(self, records: &[ColumnValues]) -> Result<Vec<Document>, PgCrudError> {
        for record in records {
            self.spec.validate(&record.columns().collect::<Vec<_>>())?;
        }
        let stmt = self.spec.build_insert_many(records)?;
        let target = self.target().await?;
        let rows = execute(target.executor(), self.spec.table(), "createMany", &stmt).await?;
        Ok(rows.into_documents())
    }

    /// Update matching rows; returns the first `RETURNING` row, or `None` when nothing
    /// matched.
    ///
    /// # Errors
    /// `WhereClauseRequired` without bound conditions and `EmptyMutation` for an empty
    /// record, both before a connection is taken.
    pub async fn update_one(
        self,
        data: impl Into<ColumnValues>,
    ) -> Result<Option<Document>, PgCrudError> {
        let record = data.into();
        self.spec.validate(&record.columns().collect::<Vec<_>>())?;
        let stmt = self.spec.build_update(&record)?;
        let target = self.target().await?;
        let rows = execute(target.executor(), self.spec.table(), "updateOne", &stmt).await?;
        Ok(rows.into_documents().into_iter().next())
    }

    /// Apply each entry's update on one connection and collect the updated ids.
    ///
    /// Entries are checked up front, so a bad entry fails the call before anything
    /// is written. Entries are not wrapped in a transaction; pass one with
    /// [`Query::using`] for all-or-nothing behavior.
    ///
    /// # Errors
    /// `WhereClauseRequired` for an entry without conditions, `EmptyMutation` for one
    /// without values, then connection and driver errors.
    pub async fn update_many(self, entries: Vec<UpdateEntry>) -> Result<Vec<Value>, PgCrudError> {
        let mut statements = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.filter.is_empty() {
                return Err(PgCrudError::WhereClauseRequired {
                    operation: "updateMany",
                });
            }
            if entry.data.is_empty() {
                return Err(PgCrudError::EmptyMutation {
                    operation: "updateMany",
                });
            }
            let spec = self.spec.clone().select("id").where_eq(entry.filter);
            spec.validate(&entry.data.columns().collect::<Vec<_>>())?;
            statements.push(spec.build_update(&entry.data)?);
        }

        let target = self.target().await?;
        let mut updated = Vec::new();
        for stmt in &statements {
            let rows = execute(target.executor(), self.spec.table(), "updateMany", stmt).await?;
            updated.extend(ids(&rows));
        }
        Ok(updated)
    }

    /// Flag matching rows as deleted; returns the first affected id.
    ///
    /// # Errors
    /// `WhereClauseRequired` without bound conditions, then connection and driver errors.
    pub async fn soft_delete(self) -> Result<Option<Value>, PgCrudError> {
        self.spec.validate(&[])?;
        let stmt = self.spec.build_soft_delete(&self.db.soft_delete_column)?;
        let target = self.target().await?;
        let rows = execute(target.executor(), self.spec.table(), "softDelete", &stmt).await?;
        Ok(ids(&rows).into_iter().next())
    }

    /// `DELETE` matching rows; returns their ids.
    ///
    /// # Errors
    /// `WhereClauseRequired` without bound conditions, then connection and driver errors.
    pub async fn permanent_delete(self) -> Result<Vec<Value>, PgCrudError> {
        self.spec.validate(&[])?;
        let stmt = self.spec.build_delete()?;
        let target = self.target().await?;
        let rows = execute(target.executor(), self.spec.table(), "permanentDelete", &stmt).await?;
        Ok(ids(&rows))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::UpdateEntry;
    use crate::crud::test_support::{block_on, recording_db};
    use crate::error::PgCrudError;
    use crate::types::{ColumnValues, RowValues};

    #[test]
    fn create_one_returns_inserted_row() {
        let (db, provider) = recording_db();
        provider.push_rows(&["id"], vec![vec![RowValues::Int(11)]]);
        let row = block_on(
            db.table("users")
                .create_one([("name", "O'Brien"), ("city", "Zürich")]),
        )
        .unwrap();
        assert_eq!(row.get("id"), Some(&json!(11)));
        let stmt = &provider.statements()[0];
        assert_eq!(
            stmt.query,
            r#"INSERT INTO "users" ("name", "city") VALUES ($1, $2) RETURNING "id""#
        );
        assert_eq!(stmt.params[0], RowValues::Text("O'Brien".into()));
        assert_eq!(provider.released(), 1);
    }

    #[test]
    fn create_many_empty_batch_is_refused() {
        let (db, provider) = recording_db();
        let err = block_on(db.table("users").create_many(&[])).unwrap_err();
        assert!(matches!(err, PgCrudError::EmptyMutation { operation: "createMany" }));
        assert_eq!(provider.acquired(), 0);
    }

    #[test]
    fn update_without_where_issues_no_statement() {
        let (db, provider) = recording_db();
        let err = block_on(db.table("users").update_one([("name", "x")])).unwrap_err();
        assert!(matches!(err, PgCrudError::WhereClauseRequired { .. }));
        let err = block_on(db.table("users").soft_delete()).unwrap_err();
        assert!(matches!(err, PgCrudError::WhereClauseRequired { operation: "softDelete" }));
        let err = block_on(db.table("users").permanent_delete()).unwrap_err();
        assert!(matches!(
            err,
            PgCrudError::WhereClauseRequired { operation: "permanentDelete" }
        ));
        assert!(provider.statements().is_empty());
        assert_eq!(provider.acquired(), 0);
    }

    #[test]
    fn update_one_with_no_match_is_none() {
        let (db, provider) = recording_db();
        let row = block_on(
            db.table("users")
                .where_eq([("id", 404)])
                .update_one([("name", "x")]),
        )
        .unwrap();
        assert!(row.is_none());
        assert_eq!(
            provider.statements()[0].params,
            vec![RowValues::Int(404), RowValues::Text("x".into())]
        );
    }

    #[test]
    fn update_many_runs_every_entry_on_one_connection() {
        let (db, provider) = recording_db();
        provider.push_rows(&["id"], vec![vec![RowValues::Int(1)]]);
        provider.push_rows(&["id"], vec![]);
        provider.push_rows(&["id"], vec![vec![RowValues::Int(3)]]);
        let entries = vec![
            UpdateEntry::new([("id", 1)], [("stock", 5)]),
            UpdateEntry::new([("id", 2)], [("stock", 6)]),
            UpdateEntry::from_json(&json!({"where": {"id": 3}, "stock": 7})).unwrap(),
        ];
        let ids = block_on(db.table("products").update_many(entries)).unwrap();
        assert_eq!(ids, vec![json!(1), json!(3)]);
        assert_eq!(provider.acquired(), 1);
        assert_eq!(provider.released(), 1);

        let stmts = provider.statements();
        assert_eq!(stmts.len(), 3);
        assert_eq!(
            stmts[2].query,
            r#"UPDATE "products" SET "stock" = $2 WHERE "products"."id" = $1 RETURNING "id""#
        );
    }

    #[test]
    fn update_many_checks_entries_before_writing() {
        let (db, provider) = recording_db();
        let entries = vec![
            UpdateEntry::new([("id", 1)], [("stock", 5)]),
            UpdateEntry::new(ColumnValues::new(), [("stock", 6)]),
        ];
        let err = block_on(db.table("products").update_many(entries)).unwrap_err();
        assert!(matches!(err, PgCrudError::WhereClauseRequired { operation: "updateMany" }));
        assert!(provider.statements().is_empty());
    }

    #[test]
    fn soft_and_permanent_delete_return_ids() {
        let (db, provider) = recording_db();
        provider.push_rows(&["id"], vec![vec![RowValues::Int(9)]]);
        provider.push_rows(&["id"], vec![vec![RowValues::Int(4)], vec![RowValues::Int(5)]]);

        let soft = block_on(db.table("products").where_eq([("id", 9)]).soft_delete()).unwrap();
        assert_eq!(soft, Some(json!(9)));

        let gone = block_on(
            db.table("products")
                .where_in("id", [4, 5])
                .unwrap()
                .permanent_delete(),
        )
        .unwrap();
        assert_eq!(gone, vec![json!(4), json!(5)]);
        assert_eq!(
            provider.statements()[1].query,
            r#"DELETE FROM "products" WHERE "products"."id" IN ($1, $2) RETURNING "id""#
        );
    }

    #[test]
    fn update_entry_requires_object() {
        assert!(UpdateEntry::from_json(&json!([1])).is_err());
        assert!(UpdateEntry::from_json(&json!({"where": 3, "a": 1})).is_err());
        let entry = UpdateEntry::from_json(&json!({"a": 1})).unwrap();
        assert!(entry.filter.is_empty());
    }
}
