// PostgreSQL module - the driver-facing half of the crate
//
// - config: pool construction from a deadpool config
// - params: encoding `RowValues` as bound parameters
// - query: row extraction and result set building
// - executor: `Executor` implementations for clients, pooled objects and transactions

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use params::Params;
pub use query::{build_result_set_from_statement, postgres_extract_value};
