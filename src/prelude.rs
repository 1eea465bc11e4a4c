//! Convenient imports for common functionality.
//!
//! ```rust
//! use pg_crud::prelude::*;
//! ```

pub use crate::crud::{Database, Query, UpdateEntry};
pub use crate::entity::Entity;
pub use crate::error::PgCrudError;
pub use crate::executor::{ConnectionProvider, Executor};
pub use crate::introspect::SchemaIntrospector;
pub use crate::pool::{ConfigAndPool, DatabaseSettings};
pub use crate::query::{QueryAndParams, QuerySpec};
pub use crate::results::{Document, ResultSet};
pub use crate::transform::{transform_response, transform_response_one};
pub use crate::types::{ColumnValues, RowValues, SortOrder};
