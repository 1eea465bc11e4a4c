//! Dynamic query building and CRUD execution for PostgreSQL.
//!
//! A [`Database`] wraps a [`ConnectionProvider`] (normally a [`ConfigAndPool`]) and hands
//! out one table-bound [`Query`] per logical operation. Queries are configured by
//! chaining (`select`, `where_eq`, `where_in`, `populate`, `sort`, `pagination`, ...)
//! and consumed by a single terminal call such as `find`, `create_one` or
//! `soft_delete`. Every value travels as a bound parameter; identifiers are quoted.
//!
//! Related rows requested with `populate` are joined through foreign keys discovered
//! from the catalog by [`SchemaIntrospector`] and come back nested under the related
//! table's name (see [`transform_response`]).

pub mod crud;
pub mod entity;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod placeholders;
pub mod pool;
pub mod postgres;
pub mod prelude;
pub mod query;
pub mod results;
pub mod transform;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crud::{Database, Query, UpdateEntry};
pub use entity::Entity;
pub use error::PgCrudError;
pub use executor::{ConnectionProvider, Executor};
pub use introspect::SchemaIntrospector;
pub use pool::{ConfigAndPool, DatabaseSettings};
pub use query::{JoinSpec, QueryAndParams, QuerySpec};
pub use results::{CustomDbRow, Document, ResultSet};
pub use transform::{transform_response, transform_response_one};
pub use types::{ColumnValues, RowValues, SortOrder};
