//! Transaction scopes handed to [`transaction`] callbacks.
//!
//! A [`TransactionScope`] pins one pooled connection for the lifetime of a
//! transaction callback and exposes it only through [`Executor`]. The
//! commit and rollback verbs are driven by the connection manager around
//! the callback, never by the callback itself.
//!
//! [`transaction`]: crate::ConnectionManager::transaction

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use ultraorm_core::{Dialect, DriverConnection, ExecResult, Executor, Result, Row, Value};
use ultraorm_pool::PooledConnection;

/// A borrowed transactional context.
///
/// Every statement issued through the scope runs on the same connection,
/// inside the transaction the manager opened. Work issued through the
/// manager instead of the scope runs on other pooled connections and is
/// not part of the transaction.
pub struct TransactionScope {
    conn: Mutex<PooledConnection>,
    dialect: Dialect,
    completed: AtomicBool,
}

impl TransactionScope {
    pub(crate) fn new(conn: PooledConnection, dialect: Dialect) -> Self {
        Self {
            conn: Mutex::new(conn),
            dialect,
            completed: AtomicBool::new(false),
        }
    }

    pub(crate) async fn commit(&self) -> Result<()> {
        self.conn.lock().await.commit().await?;
        self.completed.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) async fn rollback(&self) -> Result<()> {
        self.conn.lock().await.rollback().await?;
        self.completed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Discard the pinned connection instead of recycling it.
    pub(crate) async fn poison(&self) {
        self.conn.lock().await.poison();
    }
}

#[async_trait]
impl Executor for TransactionScope {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.conn.lock().await.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.conn.lock().await.query(sql, params).await
    }
}

impl Drop for TransactionScope {
    /// A scope dropped without a committed or rolled-back transaction (for
    /// example after a panic in the callback) has a connection in an
    /// unknown state; mark it so the pool discards instead of recycling it.
    fn drop(&mut self) {
        if !self.completed.load(Ordering::SeqCst) {
            self.conn.get_mut().poison();
        }
    }
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("dialect", &self.dialect)
            .finish()
    }
}
