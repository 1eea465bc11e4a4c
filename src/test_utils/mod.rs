//! Test support: a recording connection provider for unit tests and, behind the
//! `test-utils` feature, an embedded PostgreSQL for integration tests.

mod recording;

pub use recording::{RecordingConnection, RecordingProvider};

#[cfg(feature = "test-utils")]
pub mod postgres;

#[cfg(feature = "test-utils")]
pub use postgres::{EmbeddedPostgres, setup_postgres_embedded, stop_postgres_embedded};
