use super::{ConnectionProvider, Executor};
use crate::error::PgCrudError;

/// Connection a terminal operation runs on: one it checked out itself, or one the
/// caller lent it.
///
/// A checked-out connection is released when the target drops, whether the operation
/// succeeded or not. A lent connection is left alone.
pub(crate) enum ConnectionTarget<'a, C: Executor> {
    Pooled(C),
    Caller(&'a dyn Executor),
}

impl<'a, C: Executor> ConnectionTarget<'a, C> {
    pub(crate) async fn resolve<P>(
        provider: &P,
        external: Option<&'a dyn Executor>,
    ) -> Result<Self, PgCrudError>
    where
        P: ConnectionProvider<Connection = C> + ?Sized,
    {
        match external {
            Some(conn) => Ok(ConnectionTarget::Caller(conn)),
            None => {
                let conn = provider.acquire().await?;
                tracing::trace!("acquired pooled connection");
                Ok(ConnectionTarget::Pooled(conn))
            }
        }
    }

    pub(crate) fn executor(&self) -> &dyn Executor {
        match self {
            ConnectionTarget::Pooled(conn) => conn,
            ConnectionTarget::Caller(conn) => *conn,
        }
    }
}

impl<C: Executor> Drop for ConnectionTarget<'_, C> {
    fn drop(&mut self) {
        if matches!(self, ConnectionTarget::Pooled(_)) {
            tracing::debug!("releasing pooled connection");
        }
    }
}
