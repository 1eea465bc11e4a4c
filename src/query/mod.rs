//! Table-bound query state.
//!
//! [`QuerySpec`] accumulates select fields, condition clauses, populate requests,
//! sorting and pagination for one table. Every configuration call consumes the builder
//! and returns a new one; clauses keep their own values and placeholder numbers are
//! assigned only when a statement is assembled, in this order:
//!
//! 1. `IN` clauses
//! 2. equality conditions
//! 3. the raw fragment
//! 4. `LIKE` filters
//! 5. `OR` conditions
//! 6. new values for `UPDATE`
//!
//! ```rust
//! use pg_crud::prelude::*;
//!
//! let stmt = QuerySpec::new("t")
//!     .select("a,b")
//!     .where_eq([("id", "x")])
//!     .limit(5)
//!     .skip(10)
//!     .build_select(&[])
//!     .unwrap();
//! assert_eq!(
//!     stmt.query,
//!     r#"SELECT "t"."a", "t"."b" FROM "t" WHERE "t"."id" = $1 LIMIT 5 OFFSET 10"#
//! );
//! assert_eq!(stmt.params, vec![RowValues::Text("x".into())]);
//! ```

mod dml;
mod select;
mod sql;

pub use sql::QueryAndParams;
pub(crate) use sql::{Bindings, qualified, quote_ident, quote_table, split_fields};

use crate::error::PgCrudError;
use crate::placeholders::{max_placeholder, shift_placeholders};
use crate::types::{ColumnValues, RowValues, SortOrder};

/// A populate request: columns of `table` joined in through a foreign key and
/// projected as `<table>_<column>`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub table: String,
    pub fields: Vec<String>,
}

impl JoinSpec {
    /// Alias a projected column gets in the flattened row.
    #[must_use]
    pub fn alias(&self, field: &str) -> String {
        format!("{}_{}", self.table, field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub column: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
struct InClause {
    column: String,
    values: Vec<RowValues>,
}

#[derive(Debug, Clone, PartialEq)]
struct RawClause {
    sql: String,
    params: Vec<RowValues>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    table: String,
    fields: Vec<String>,
    in_clauses: Vec<InClause>,
    equals: ColumnValues,
    raw: Option<RawClause>,
    like: ColumnValues,
    or: ColumnValues,
    populate: Vec<JoinSpec>,
    sort: Option<Sort>,
    limit: Option<u64>,
    offset: Option<u64>,
    declared_columns: Option<&'static [&'static str]>,
}

impl QuerySpec {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            in_clauses: Vec::new(),
            equals: ColumnValues::new(),
            raw: None,
            like: ColumnValues::new(),
            or: ColumnValues::new(),
            populate: Vec::new(),
            sort: None,
            limit: None,
            offset: None,
            declared_columns: None,
        }
    }

    /// Restrict column references to a declared set; see [`QuerySpec::validate`].
    #[must_use]
    pub fn with_declared_columns(mut self, columns: &'static [&'static str]) -> Self {
        self.declared_columns = Some(columns);
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Comma-separated projection list. `*` (the default) selects every column.
    #[must_use]
    pub fn select(mut self, fields: &str) -> Self {
        self.fields = split_fields(fields);
        self
    }

    /// ANDed `column = value` conditions. A second call replaces the first.
    #[must_use]
    pub fn where_eq(mut self, conditions: impl Into<ColumnValues>) -> Self {
        self.equals = conditions.into();
        self
    }

    /// `column IN (...)`. Each call adds another ANDed clause.
    ///
    /// # Errors
    /// Returns `PgCrudError::EmptyInValues` when `values` is empty.
    pub fn where_in<V>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, PgCrudError>
    where
        V: Into<RowValues>,
    {
        let column = column.into();
        let values: Vec<RowValues> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(PgCrudError::EmptyInValues { column });
        }
        self.in_clauses.push(InClause { column, values });
        Ok(self)
    }

    /// Caller-written predicate numbered from `$1`, ANDed after the equality
    /// conditions. Its placeholders are renumbered when the statement is assembled.
    ///
    /// The text is spliced in verbatim: never build it from untrusted input.
    ///
    /// # Errors
    /// Returns `PgCrudError::ParameterError` when the highest placeholder in `sql`
    /// does not match the number of `params`.
    pub fn where_raw(
        mut self,
        sql: impl Into<String>,
        params: Vec<RowValues>,
    ) -> Result<Self, PgCrudError> {
        let sql = sql.into();
        let highest = max_placeholder(&sql);
        if highest != params.len() {
            return Err(PgCrudError::ParameterError(format!(
                "raw clause references {highest} placeholder(s) but {} parameter(s) were supplied",
                params.len()
            )));
        }
        tracing::warn!(table = %self.table, "raw where clause in use");
        self.raw = Some(RawClause { sql, params });
        Ok(self)
    }

    /// Conditions ANDed together and ORed against everything before them.
    #[must_use]
    pub fn or(mut self, conditions: impl Into<ColumnValues>) -> Self {
        self.or = conditions.into();
        self
    }

    /// `column LIKE value` conditions. Wildcards are the caller's to add.
    #[must_use]
    pub fn filter(mut self, conditions: impl Into<ColumnValues>) -> Self {
        self.like = conditions.into();
        self
    }

    /// Join `related` through its foreign key and project `fields` from it.
    #[must_use]
    pub fn populate(mut self, related: impl Into<String>, fields: &str) -> Self {
        self.populate.push(JoinSpec {
            table: related.into(),
            fields: split_fields(fields),
        });
        self
    }

    /// Order by `by` (default `id`). Dots become underscores so `orders.total`
    /// addresses the populated `orders_total` column.
    #[must_use]
    pub fn sort(mut self, by: Option<&str>, order: impl Into<SortOrder>) -> Self {
        let column = by
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or("id")
            .replace('.', "_");
        self.sort = Some(Sort {
            column,
            order: order.into(),
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn skip(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// `offset = page_index * page_size`, `limit = page_size`.
    #[must_use]
    pub fn pagination(self, page_index: u64, page_size: u64) -> Self {
        self.skip(page_index.saturating_mul(page_size))
            .limit(page_size)
    }

    #[must_use]
    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    #[must_use]
    pub fn populates(&self) -> &[JoinSpec] {
        &self.populate
    }

    /// Tables requested through `populate`, in request order.
    #[must_use]
    pub fn populate_prefixes(&self) -> Vec<&str> {
        self.populate.iter().map(|j| j.table.as_str()).collect()
    }

    /// Number of parameters the condition clauses bind.
    #[must_use]
    pub fn condition_param_count(&self) -> usize {
        self.in_clauses.iter().map(|c| c.values.len()).sum::<usize>()
            + self.equals.len()
            + self.raw.as_ref().map_or(0, |r| r.params.len())
            + self.like.len()
            + self.or.len()
    }

    /// Check every referenced column against the declared column set, if any.
    ///
    /// # Errors
    /// Returns `PgCrudError::UnknownColumn` naming the first undeclared column.
    pub fn validate(&self, record_columns: &[&str]) -> Result<(), PgCrudError> {
        let Some(declared) = self.declared_columns else {
            return Ok(());
        };
        let check = |column: &str| {
            if declared.iter().any(|d| *d == column) {
                Ok(())
            } else {
                Err(PgCrudError::UnknownColumn {
                    table: self.table.clone(),
                    column: column.to_string(),
                })
            }
        };

        for field in &self.fields {
            if field != "*" && !field.contains('.') {
                check(field.as_str())?;
            }
        }
        for clause in &self.in_clauses {
            check(clause.column.as_str())?;
        }
        for column in self
            .equals
            .columns()
            .chain(self.like.columns())
            .chain(self.or.columns())
        {
            check(column)?;
        }
        if let Some(sort) = &self.sort {
            let populated = self
                .populate
                .iter()
                .any(|j| sort.column.starts_with(&format!("{}_", j.table)));
            if !populated {
                check(sort.column.as_str())?;
            }
        }
        for column in record_columns {
            check(*column)?;
        }
        Ok(())
    }

    /// Assemble the `WHERE` part (with its leading space) binding condition values.
    ///
    /// `WHERE` is emitted when any IN, equality, raw or LIKE clause exists; the OR
    /// clause follows as `OR ...`, or stands alone as `WHERE ...` when it is the only
    /// condition.
    pub(crate) fn where_sql(&self, bindings: &mut Bindings) -> String {
        let table = &self.table;
        let mut parts: Vec<String> = Vec::new();

        for clause in &self.in_clauses {
            let placeholders: Vec<String> = clause
                .values
                .iter()
                .map(|v| bindings.bind(v.clone()))
                .collect();
            parts.push(format!(
                "{} IN ({})",
                qualified(table, &clause.column),
                placeholders.join(", ")
            ));
        }

        for (column, value) in self.equals.iter() {
            let p = bindings.bind(value.clone());
            parts.push(format!("{} = {p}", qualified(table, column)));
        }

        if let Some(raw) = &self.raw {
            let offset = bindings.extend(&raw.params);
            parts.push(format!("({})", shift_placeholders(&raw.sql, offset)));
        }

        for (column, value) in self.like.iter() {
            let p = bindings.bind(value.clone());
            parts.push(format!("{} LIKE {p}", qualified(table, column)));
        }

        let or_terms: Vec<String> = self
            .or
            .iter()
            .map(|(column, value)| {
                let p = bindings.bind(value.clone());
                format!("{} = {p}", qualified(table, column))
            })
            .collect();

        let mut out = String::new();
        if !parts.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&parts.join(" AND "));
        }
        if !or_terms.is_empty() {
            out.push_str(if parts.is_empty() { " WHERE " } else { " OR " });
            out.push_str(&or_terms.join(" AND "));
        }
        out
    }

    /// Projection list for the base table.
    pub(crate) fn field_list(&self) -> String {
        if self.fields.is_empty() {
            return format!("{}.*", quote_table(&self.table));
        }
        self.fields
            .iter()
            .map(|field| {
                if field == "*" {
                    format!("{}.*", quote_table(&self.table))
                } else if let Some((rel, col)) = field.rsplit_once('.') {
                    qualified(rel, col)
                } else {
                    qualified(&self.table, field)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `RETURNING` list for mutations: the selected fields, or `id`.
    pub(crate) fn returning_list(&self) -> String {
        let plain: Vec<String> = self
            .fields
            .iter()
            .filter(|f| *f != "*" && !f.contains('.'))
            .map(|f| quote_ident(f))
            .collect();
        if plain.is_empty() {
            quote_ident("id")
        } else {
            plain.join(", ")
        }
    }

    pub(crate) fn sort_clause(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_eq_binds_one_param_per_condition() {
        for n in 0..5 {
            let conditions: ColumnValues = (0..n).map(|i| (format!("c{i}"), i)).collect();
            let spec = QuerySpec::new("t").where_eq(conditions);
            let mut b = Bindings::default();
            let sql = spec.where_sql(&mut b);
            assert_eq!(b.len(), n as usize);
            assert_eq!(sql.matches(" = $").count(), n as usize);
            if n > 1 {
                assert_eq!(sql.matches(" AND ").count(), n as usize - 1);
            }
        }
    }

    #[test]
    fn second_where_eq_replaces_clause_and_params() {
        let spec = QuerySpec::new("t")
            .where_eq([("a", 1)])
            .where_eq([("b", 2)]);
        let mut b = Bindings::default();
        let sql = spec.where_sql(&mut b);
        assert_eq!(sql, r#" WHERE "t"."b" = $1"#);
        assert_eq!(b.finish(String::new()).params, vec![RowValues::Int(2)]);
    }

    #[test]
    fn where_in_rejects_empty_values() {
        let err = QuerySpec::new("t")
            .where_in("id", Vec::<i64>::new())
            .unwrap_err();
        assert!(matches!(err, PgCrudError::EmptyInValues { column } if column == "id"));
    }

    #[test]
    fn where_in_placeholders_are_contiguous() {
        let spec = QuerySpec::new("t")
            .where_in("a", [1, 2])
            .unwrap()
            .where_in("b", [3, 4, 5])
            .unwrap();
        let mut b = Bindings::default();
        let sql = spec.where_sql(&mut b);
        assert_eq!(
            sql,
            r#" WHERE "t"."a" IN ($1, $2) AND "t"."b" IN ($3, $4, $5)"#
        );
        assert_eq!(b.len(), 5);
    }

    #[test]
    fn clause_order_is_in_eq_raw_like_or() {
        let spec = QuerySpec::new("p")
            .or([("featured", true)])
            .filter([("name", "%shoe%")])
            .where_raw("price > $1", vec![RowValues::Int(10)])
            .unwrap()
            .where_eq([("active", true)])
            .where_in("category", ["a", "b"])
            .unwrap();
        let mut b = Bindings::default();
        let sql = spec.where_sql(&mut b);
        assert_eq!(
            sql,
            r#" WHERE "p"."category" IN ($1, $2) AND "p"."active" = $3 AND (price > $4) AND "p"."name" LIKE $5 OR "p"."featured" = $6"#
        );
        let params = b.finish(String::new()).params;
        assert_eq!(
            params,
            vec![
                RowValues::Text("a".into()),
                RowValues::Text("b".into()),
                RowValues::Bool(true),
                RowValues::Int(10),
                RowValues::Text("%shoe%".into()),
                RowValues::Bool(true),
            ]
        );
    }

    #[test]
    fn or_alone_still_emits_where() {
        let spec = QuerySpec::new("t").or([("a", 1), ("b", 2)]);
        let mut b = Bindings::default();
        assert_eq!(
            spec.where_sql(&mut b),
            r#" WHERE "t"."a" = $1 AND "t"."b" = $2"#
        );
    }

    #[test]
    fn raw_clause_param_count_must_match() {
        let err = QuerySpec::new("t")
            .where_raw("a = $1 AND b = $2", vec![RowValues::Int(1)])
            .unwrap_err();
        assert!(matches!(err, PgCrudError::ParameterError(_)));
    }

    #[test]
    fn pagination_sets_offset_and_limit() {
        for (page, size) in [(0, 10), (1, 10), (3, 25), (7, 1), (0, 0)] {
            let spec = QuerySpec::new("t").pagination(page, size);
            assert_eq!(spec.offset_value(), Some(page * size));
            assert_eq!(spec.limit_value(), Some(size));
        }
    }

    #[test]
    fn sort_defaults_to_id_and_flattens_dots() {
        let spec = QuerySpec::new("t").sort(None, "1");
        let sort = spec.sort_clause().unwrap();
        assert_eq!(sort.column, "id");
        assert_eq!(sort.order, SortOrder::Asc);

        let spec = QuerySpec::new("t").sort(Some("orders.total"), "-1");
        let sort = spec.sort_clause().unwrap();
        assert_eq!(sort.column, "orders_total");
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn declared_columns_reject_unknown_references() {
        static COLUMNS: &[&str] = &["id", "name"];
        let spec = QuerySpec::new("users")
            .with_declared_columns(COLUMNS)
            .select("id,name")
            .where_eq([("email", "a@b.c")]);
        let err = spec.validate(&[]).unwrap_err();
        assert!(matches!(err, PgCrudError::UnknownColumn { column, .. } if column == "email"));

        let spec = QuerySpec::new("users")
            .with_declared_columns(COLUMNS)
            .populate("orders", "id,total")
            .sort(Some("orders.total"), "1");
        assert!(spec.validate(&["name"]).is_ok());
        assert!(spec.validate(&["nickname"]).is_err());
    }

    #[test]
    fn returning_defaults_to_id() {
        assert_eq!(QuerySpec::new("t").returning_list(), "\"id\"");
        assert_eq!(
            QuerySpec::new("t").select("id, name").returning_list(),
            "\"id\", \"name\""
        );
    }

    #[test]
    fn condition_param_count_covers_every_clause() {
        let spec = QuerySpec::new("t")
            .where_in("a", [1, 2, 3])
            .unwrap()
            .where_eq([("b", 1)])
            .filter([("c", "%x%")])
            .or([("d", 1)]);
        assert_eq!(spec.condition_param_count(), 6);
        assert_eq!(QuerySpec::new("t").condition_param_count(), 0);
    }
}
