//! Driver and executor traits.
//!
//! A [`Driver`] opens raw connections for one backend family; a
//! [`DriverConnection`] is one open connection. [`Executor`] is the
//! statement-level surface the higher layers program against, implemented
//! by both the connection manager (pooled, per-call acquire) and a
//! transaction scope (one pinned connection).

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Placeholder dialect for bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `?` placeholders.
    #[default]
    MySql,
    /// `$1`, `$2`, ... placeholders.
    Postgres,
}

impl Dialect {
    /// Render the placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
        }
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Number of rows the statement touched.
    pub rows_affected: u64,
    /// Key generated for an auto-increment column, when the backend
    /// reports one.
    pub last_insert_id: Option<i64>,
}

/// One open connection to a backend.
#[async_trait]
pub trait DriverConnection: Send {
    /// Run a statement that returns no rows.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    /// Run a query and collect its rows.
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Open a transaction on this connection.
    async fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Close the connection. Dropping without closing must also release
    /// backend resources.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for connections to one backend family.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Placeholder dialect of this backend.
    fn dialect(&self) -> Dialect;

    /// Open a new connection.
    async fn connect(&self, config: &Config) -> Result<Box<dyn DriverConnection>>;
}

/// Statement-level execution surface.
///
/// Instance persistence takes `&impl Executor`, so the same save/delete
/// path serves autocommit calls through the manager and calls pinned to
/// a transaction.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Placeholder dialect of the underlying backend.
    fn dialect(&self) -> Dialect;

    /// Run a statement that returns no rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    /// Run a query and collect its rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query expected to produce at most one row.
    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut rows = self.query(sql, params).await?;
        if rows.len() > 1 {
            tracing::warn!(returned = rows.len(), "query_one received more than one row");
        }
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }
}
