//! Session trait over a live database connection.

use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// A live database session.
///
/// Everything the crate sends to the database goes through this trait: the guard's
/// introspection queries and the builders' parameterized statements. It is implemented
/// for `tokio_postgres::Client`; tests substitute an in-memory session.
pub trait Session: Send + Sync + 'static {
    /// Execute a statement and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Whether the underlying connection has been closed.
    ///
    /// The default implementation returns `false`.
    fn is_closed(&self) -> bool {
        false
    }
}

fn as_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl Session for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        let refs = as_refs(params);
        let rows = tokio_postgres::Client::query(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        rows.iter().map(Record::from_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let refs = as_refs(params);
        tokio_postgres::Client::execute(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)
    }

    fn is_closed(&self) -> bool {
        tokio_postgres::Client::is_closed(self)
    }
}
