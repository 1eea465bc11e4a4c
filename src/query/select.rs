use super::{Bindings, QueryAndParams, QuerySpec, qualified, quote_ident, quote_table};
use crate::error::PgCrudError;

impl QuerySpec {
    /// Assemble the `SELECT` for `find`.
    ///
    /// `foreign_keys[i]` is the column of this table that references
    /// `populates()[i]`; see [`SchemaIntrospector`](crate::SchemaIntrospector).
    ///
    /// # Errors
    /// Returns `PgCrudError::ExecutionError` if `foreign_keys` does not line up with the
    /// populate requests.
    pub fn build_select(&self, foreign_keys: &[String]) -> Result<QueryAndParams, PgCrudError> {
        self.build_select_limited(foreign_keys, self.limit)
    }

    /// `find` with `LIMIT 1`.
    ///
    /// # Errors
    /// Returns `PgCrudError::LimitAlreadySet` if a positive limit was configured, plus
    /// the errors of [`QuerySpec::build_select`].
    pub fn build_find_one(&self, foreign_keys: &[String]) -> Result<QueryAndParams, PgCrudError> {
        self.check_find_one()?;
        self.build_select_limited(foreign_keys, Some(1))
    }

    pub(crate) fn check_find_one(&self) -> Result<(), PgCrudError> {
        match self.limit {
            Some(limit) if limit > 0 => Err(PgCrudError::LimitAlreadySet { limit }),
            _ => Ok(()),
        }
    }

    fn build_select_limited(
        &self,
        foreign_keys: &[String],
        limit: Option<u64>,
    ) -> Result<QueryAndParams, PgCrudError> {
        if foreign_keys.len() != self.populate.len() {
            return Err(PgCrudError::ExecutionError(format!(
                "{} foreign key(s) supplied for {} populate request(s)",
                foreign_keys.len(),
                self.populate.len()
            )));
        }

        let mut projections = vec![self.field_list()];
        let mut joins = String::new();
        for (join, fk) in self.populate.iter().zip(foreign_keys) {
            for field in &join.fields {
                projections.push(format!(
                    "{} AS {}",
                    qualified(&join.table, field),
                    quote_ident(&join.alias(field))
                ));
            }
            joins.push_str(&format!(
                " LEFT JOIN {} ON {} = {}",
                quote_table(&join.table),
                qualified(&join.table, "id"),
                qualified(&self.table, fk)
            ));
        }

        let mut bindings = Bindings::default();
        let mut sql = format!(
            "SELECT {} FROM {}{joins}",
            projections.join(", "),
            quote_table(&self.table)
        );
        sql.push_str(&self.where_sql(&mut bindings));

        if let Some(sort) = self.sort_clause() {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                quote_ident(&sort.column),
                sort.order.as_sql()
            ));
        }
        if let Some(limit) = limit.filter(|l| *l > 0) {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset.filter(|o| *o > 0) {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(bindings.finish(sql))
    }

    /// `SELECT COUNT(*)` over the same conditions `find` would use. Joins, sorting and
    /// pagination do not apply.
    #[must_use]
    pub fn build_count(&self) -> QueryAndParams {
        let mut bindings = Bindings::default();
        let mut sql = format!("SELECT COUNT(*) AS \"count\" FROM {}", quote_table(&self.table));
        sql.push_str(&self.where_sql(&mut bindings));
        bindings.finish(sql)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PgCrudError;
    use crate::query::QuerySpec;
    use crate::types::RowValues;

    #[test]
    fn select_where_limit_skip() {
        let stmt = QuerySpec::new("t")
            .select("a,b")
            .where_eq([("id", "x")])
            .limit(5)
            .skip(10)
            .build_select(&[])
            .unwrap();
        assert_eq!(
            stmt.query,
            r#"SELECT "t"."a", "t"."b" FROM "t" WHERE "t"."id" = $1 LIMIT 5 OFFSET 10"#
        );
        assert_eq!(stmt.params, vec![RowValues::Text("x".into())]);
    }

    #[test]
    fn default_projection_is_table_star() {
        let stmt = QuerySpec::new("t").build_select(&[]).unwrap();
        assert_eq!(stmt.query, r#"SELECT "t".* FROM "t""#);
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn populate_adds_aliased_projection_and_left_join() {
        let stmt = QuerySpec::new("users")
            .populate("orders", "id,total")
            .where_eq([("userId", "u1")])
            .build_select(&["order_id".to_string()])
            .unwrap();
        assert_eq!(
            stmt.query,
            concat!(
                r#"SELECT "users".*, "orders"."id" AS "orders_id", "orders"."total" AS "orders_total" "#,
                r#"FROM "users" LEFT JOIN "orders" ON "orders"."id" = "users"."order_id" "#,
                r#"WHERE "users"."userId" = $1"#
            )
        );
        assert_eq!(stmt.params, vec![RowValues::Text("u1".into())]);
    }

    #[test]
    fn populate_needs_matching_foreign_keys() {
        let err = QuerySpec::new("users")
            .populate("orders", "id")
            .build_select(&[])
            .unwrap_err();
        assert!(matches!(err, PgCrudError::ExecutionError(_)));
    }

    #[test]
    fn sort_then_limit_then_offset() {
        let stmt = QuerySpec::new("products")
            .sort(Some("price"), "1")
            .pagination(2, 20)
            .build_select(&[])
            .unwrap();
        assert_eq!(
            stmt.query,
            r#"SELECT "products".* FROM "products" ORDER BY "price" ASC LIMIT 20 OFFSET 40"#
        );
    }

    #[test]
    fn zero_offset_is_not_emitted() {
        let stmt = QuerySpec::new("t").pagination(0, 10).build_select(&[]).unwrap();
        assert_eq!(stmt.query, r#"SELECT "t".* FROM "t" LIMIT 10"#);
    }

    #[test]
    fn find_one_appends_limit_one() {
        let stmt = QuerySpec::new("t")
            .where_eq([("id", 3)])
            .build_find_one(&[])
            .unwrap();
        assert_eq!(stmt.query, r#"SELECT "t".* FROM "t" WHERE "t"."id" = $1 LIMIT 1"#);
    }

    #[test]
    fn find_one_conflicts_with_explicit_limit() {
        let err = QuerySpec::new("t").limit(5).build_find_one(&[]).unwrap_err();
        assert!(matches!(err, PgCrudError::LimitAlreadySet { limit: 5 }));
        assert!(QuerySpec::new("t").limit(0).build_find_one(&[]).is_ok());
    }

    #[test]
    fn count_uses_conditions_only() {
        let stmt = QuerySpec::new("t")
            .where_eq([("status", "paid")])
            .filter([("note", "%gift%")])
            .sort(None, "1")
            .limit(3)
            .build_count();
        assert_eq!(
            stmt.query,
            r#"SELECT COUNT(*) AS "count" FROM "t" WHERE "t"."status" = $1 AND "t"."note" LIKE $2"#
        );
        assert_eq!(stmt.params.len(), 2);
    }
}
