use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::PgCrudError;
use crate::executor::{ConnectionProvider, Executor};
use crate::query::QueryAndParams;
use crate::results::ResultSet;
use crate::types::RowValues;

#[derive(Debug, Default)]
struct Inner {
    statements: Mutex<Vec<QueryAndParams>>,
    responses: Mutex<VecDeque<Result<ResultSet, String>>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    refuse_acquire: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection provider that records every statement instead of talking to a server.
///
/// Responses are served in the order they were queued; once the queue is empty every
/// statement returns an empty result set.
#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    inner: Arc<Inner>,
}

impl RecordingProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result set with the given columns and rows.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<RowValues>>) {
        let mut rs = ResultSet::with_capacity(rows.len());
        rs.set_column_names(Arc::new(columns.iter().map(|c| (*c).to_string()).collect()));
        for row in rows {
            rs.add_row_values(row);
        }
        lock(&self.inner.responses).push_back(Ok(rs));
    }

    /// Queue a failure, surfaced as `PgCrudError::ExecutionError`.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.inner.responses).push_back(Err(message.into()));
    }

    /// Make every later `acquire` fail.
    pub fn refuse_connections(&self) {
        self.inner.refuse_acquire.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn statements(&self) -> Vec<QueryAndParams> {
        lock(&self.inner.statements).clone()
    }

    #[must_use]
    pub fn acquired(&self) -> usize {
        self.inner.acquired.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn released(&self) -> usize {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// A connection that is not counted as checked out, standing in for a
    /// caller-owned transaction.
    #[must_use]
    pub fn detached_connection(&self) -> RecordingConnection {
        RecordingConnection {
            inner: self.inner.clone(),
            pooled: false,
        }
    }
}

/// Connection handed out by [`RecordingProvider`]. Dropping a pooled one counts as a release.
#[derive(Debug)]
pub struct RecordingConnection {
    inner: Arc<Inner>,
    pooled: bool,
}

impl Drop for RecordingConnection {
    fn drop(&mut self) {
        if self.pooled {
            self.inner.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Executor for RecordingConnection {
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<ResultSet, PgCrudError> {
        lock(&self.inner.statements).push(QueryAndParams {
            query: sql.to_string(),
            params: params.to_vec(),
        });
        let next = lock(&self.inner.responses).pop_front();
        match next {
            Some(Ok(rs)) => Ok(rs),
            Some(Err(message)) => Err(PgCrudError::ExecutionError(message)),
            None => Ok(ResultSet::default()),
        }
    }
}

#[async_trait]
impl ConnectionProvider for RecordingProvider {
    type Connection = RecordingConnection;

    async fn acquire(&self) -> Result<RecordingConnection, PgCrudError> {
        if self.inner.refuse_acquire.load(Ordering::SeqCst) {
            return Err(PgCrudError::ConnectionError(
                "recording provider refused connection".to_string(),
            ));
        }
        self.inner.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(RecordingConnection {
            inner: self.inner.clone(),
            pooled: true,
        })
    }
}
