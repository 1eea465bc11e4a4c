use super::{Bindings, QueryAndParams, QuerySpec, quote_ident, quote_table};
use crate::error::PgCrudError;
use crate::types::ColumnValues;

impl QuerySpec {
    /// `INSERT ... RETURNING`. An empty record inserts `DEFAULT VALUES`.
    ///
    /// Condition clauses play no part in an insert.
    #[must_use]
    pub fn build_insert(&self, record: &ColumnValues) -> QueryAndParams {
        let mut bindings = Bindings::default();
        let table = quote_table(&self.table);
        let returning = self.returning_list();

        if record.is_empty() {
            return bindings.finish(format!(
                "INSERT INTO {table} DEFAULT VALUES RETURNING {returning}"
            ));
        }

        let columns: Vec<String> = record.columns().map(quote_ident).collect();
        let values: Vec<String> = record.values().map(|v| bindings.bind(v.clone())).collect();
        bindings.finish(format!(
            "INSERT INTO {table} ({}) VALUES ({}) RETURNING {returning}",
            columns.join(", "),
            values.join(", ")
        ))
    }

    /// Multi-row `INSERT`. The column list is the union of every record's columns in
    /// first-seen order; a record lacking a column gets `DEFAULT` there.
    ///
    /// # Errors
    /// Returns `PgCrudError::EmptyMutation` when there are no records or no columns.
    pub fn build_insert_many(
        &self,
        records: &[ColumnValues],
    ) -> Result<QueryAndParams, PgCrudError> {
        let mut columns: Vec<&str> = Vec::new();
        for record in records {
            for column in record.columns() {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        if columns.is_empty() {
            return Err(PgCrudError::EmptyMutation {
                operation: "createMany",
            });
        }

        let mut bindings = Bindings::default();
        let rows: Vec<String> = records
            .iter()
            .map(|record| {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|column| match record.get(column) {
                        Some(value) => bindings.bind(value.clone()),
                        None => "DEFAULT".to_string(),
                    })
                    .collect();
                format!("({})", cells.join(", "))
            })
            .collect();

        Ok(bindings.finish(format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING {}",
            quote_table(&self.table),
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            rows.join(", "),
            self.returning_list()
        )))
    }

    /// `UPDATE ... SET ... WHERE ... RETURNING`. SET placeholders follow the condition
    /// placeholders.
    ///
    /// # Errors
    /// `PgCrudError::WhereClauseRequired` without bound conditions,
    /// `PgCrudError::EmptyMutation` for an empty record.
    pub fn build_update(&self, record: &ColumnValues) -> Result<QueryAndParams, PgCrudError> {
        self.require_conditions("updateOne")?;
        if record.is_empty() {
            return Err(PgCrudError::EmptyMutation {
                operation: "updateOne",
            });
        }
        Ok(self.update_statement(record, &self.returning_list()))
    }

    /// Set the soft-delete flag column to true on matching rows, returning `id`.
    ///
    /// # Errors
    /// `PgCrudError::WhereClauseRequired` without bound conditions.
    pub fn build_soft_delete(&self, flag_column: &str) -> Result<QueryAndParams, PgCrudError> {
        self.require_conditions("softDelete")?;
        let record = ColumnValues::new().with(flag_column, true);
        Ok(self.update_statement(&record, &quote_ident("id")))
    }

    /// `DELETE ... RETURNING "id"`.
    ///
    /// # Errors
    /// `PgCrudError::WhereClauseRequired` without bound conditions.
    pub fn build_delete(&self) -> Result<QueryAndParams, PgCrudError> {
        self.require_conditions("permanentDelete")?;
        let mut bindings = Bindings::default();
        let mut sql = format!("DELETE FROM {}", quote_table(&self.table));
        sql.push_str(&self.where_sql(&mut bindings));
        sql.push_str(" RETURNING \"id\"");
        Ok(bindings.finish(sql))
    }

    pub(crate) fn require_conditions(&self, operation: &'static str) -> Result<(), PgCrudError> {
        if self.condition_param_count() == 0 {
            Err(PgCrudError::WhereClauseRequired { operation })
        } else {
            Ok(())
        }
    }

    fn update_statement(&self, record: &ColumnValues, returning: &str) -> QueryAndParams {
        let mut bindings = Bindings::default();
        let conditions = self.where_sql(&mut bindings);
        let assignments: Vec<String> = record
            .iter()
            .map(|(column, value)| format!("{} = {}", quote_ident(column), bindings.bind(value.clone())))
            .collect();
        bindings.finish(format!(
            "UPDATE {} SET {}{conditions} RETURNING {returning}",
            quote_table(&self.table),
            assignments.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PgCrudError;
    use crate::query::QuerySpec;
    use crate::types::{ColumnValues, RowValues};

    #[test]
    fn insert_columns_match_values() {
        let record = ColumnValues::new()
            .with("name", "Tee")
            .with("price", 1999)
            .with("active", true);
        let stmt = QuerySpec::new("products").build_insert(&record);
        assert_eq!(
            stmt.query,
            r#"INSERT INTO "products" ("name", "price", "active") VALUES ($1, $2, $3) RETURNING "id""#
        );
        assert_eq!(
            stmt.params,
            vec![
                RowValues::Text("Tee".into()),
                RowValues::Int(1999),
                RowValues::Bool(true)
            ]
        );
    }

    #[test]
    fn insert_returns_selected_fields() {
        let stmt = QuerySpec::new("products")
            .select("id,name")
            .build_insert(&ColumnValues::from([("name", "Tee")]));
        assert!(stmt.query.ends_with(r#"RETURNING "id", "name""#));
    }

    #[test]
    fn insert_ignores_conditions() {
        let stmt = QuerySpec::new("t")
            .where_eq([("id", 1)])
            .build_insert(&ColumnValues::from([("a", 2)]));
        assert_eq!(stmt.params, vec![RowValues::Int(2)]);
    }

    #[test]
    fn empty_insert_uses_default_values() {
        let stmt = QuerySpec::new("carts").build_insert(&ColumnValues::new());
        assert_eq!(
            stmt.query,
            r#"INSERT INTO "carts" DEFAULT VALUES RETURNING "id""#
        );
    }

    #[test]
    fn insert_many_renumbers_across_rows() {
        let rows = vec![
            ColumnValues::new().with("a", 1).with("b", 2),
            ColumnValues::new().with("b", 3),
            ColumnValues::new().with("c", 4).with("a", 5),
        ];
        let stmt = QuerySpec::new("t").build_insert_many(&rows).unwrap();
        assert_eq!(
            stmt.query,
            r#"INSERT INTO "t" ("a", "b", "c") VALUES ($1, $2, DEFAULT), (DEFAULT, $3, DEFAULT), ($4, DEFAULT, $5) RETURNING "id""#
        );
        assert_eq!(
            stmt.params,
            vec![
                RowValues::Int(1),
                RowValues::Int(2),
                RowValues::Int(3),
                RowValues::Int(5),
                RowValues::Int(4)
            ]
        );
    }

    #[test]
    fn insert_many_needs_columns() {
        let err = QuerySpec::new("t").build_insert_many(&[]).unwrap_err();
        assert!(matches!(err, PgCrudError::EmptyMutation { .. }));
    }

    #[test]
    fn update_numbers_set_after_conditions() {
        let stmt = QuerySpec::new("orders")
            .where_in("id", [7, 8])
            .unwrap()
            .where_eq([("status", "pending")])
            .build_update(&ColumnValues::from([("status", "shipped")]))
            .unwrap();
        assert_eq!(
            stmt.query,
            r#"UPDATE "orders" SET "status" = $4 WHERE "orders"."id" IN ($1, $2) AND "orders"."status" = $3 RETURNING "id""#
        );
        assert_eq!(stmt.params.len(), 4);
        assert_eq!(stmt.params[3], RowValues::Text("shipped".into()));
    }

    #[test]
    fn update_without_where_is_refused() {
        let err = QuerySpec::new("orders")
            .build_update(&ColumnValues::from([("status", "x")]))
            .unwrap_err();
        assert!(matches!(
            err,
            PgCrudError::WhereClauseRequired { operation: "updateOne" }
        ));
    }

    #[test]
    fn update_needs_values() {
        let err = QuerySpec::new("orders")
            .where_eq([("id", 1)])
            .build_update(&ColumnValues::new())
            .unwrap_err();
        assert!(matches!(err, PgCrudError::EmptyMutation { .. }));
    }

    #[test]
    fn soft_delete_sets_flag() {
        let stmt = QuerySpec::new("products")
            .where_eq([("id", 9)])
            .build_soft_delete("is_deleted")
            .unwrap();
        assert_eq!(
            stmt.query,
            r#"UPDATE "products" SET "is_deleted" = $2 WHERE "products"."id" = $1 RETURNING "id""#
        );
        assert_eq!(stmt.params, vec![RowValues::Int(9), RowValues::Bool(true)]);
        assert!(QuerySpec::new("products").build_soft_delete("is_deleted").is_err());
    }

    #[test]
    fn delete_requires_where() {
        let stmt = QuerySpec::new("products")
            .where_eq([("id", 9)])
            .build_delete()
            .unwrap();
        assert_eq!(
            stmt.query,
            r#"DELETE FROM "products" WHERE "products"."id" = $1 RETURNING "id""#
        );
        let err = QuerySpec::new("products").build_delete().unwrap_err();
        assert!(matches!(
            err,
            PgCrudError::WhereClauseRequired { operation: "permanentDelete" }
        ));
    }
}
