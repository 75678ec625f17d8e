//! Bounded connection pooling for UltraORM drivers.
//!
//! A [`Pool`] owns up to `size` connections opened by one [`Driver`].
//! Acquisition is semaphore-bounded: when every slot is borrowed, further
//! callers suspend until a slot frees, up to the configured acquire
//! timeout. A borrowed [`PooledConnection`] returns itself to the idle
//! list on drop unless it has been poisoned, in which case it is
//! discarded and its slot reopened for a fresh connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use ultraorm_core::{Config, Driver, DriverConnection, Error, ExecResult, Result, Row, Value};

struct PoolShared {
    idle: Mutex<Vec<Box<dyn DriverConnection>>>,
    closed: AtomicBool,
}

/// Semaphore-bounded pool over one driver's connections.
pub struct Pool {
    driver: Arc<dyn Driver>,
    config: Config,
    semaphore: Arc<Semaphore>,
    shared: Arc<PoolShared>,
    size: u32,
}

impl Pool {
    /// Create a pool for `driver`, sized from the configuration.
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, config: Config) -> Self {
        let size = config.effective_pool_size();
        Self {
            driver,
            config,
            semaphore: Arc::new(Semaphore::new(size as usize)),
            shared: Arc::new(PoolShared {
                idle: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
            size,
        }
    }

    /// Maximum number of concurrently borrowed connections.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of free slots right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of idle connections waiting for reuse.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.shared.idle.lock().unwrap().len()
    }

    /// Borrow a connection, waiting up to the configured acquire timeout
    /// for a free slot. Opens a new connection when no idle one exists.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let acquired = tokio::time::timeout(
            self.config.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await;
        let permit = match acquired {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(Error::connection("connection pool is closed")),
            Err(_) => {
                return Err(Error::connection(format!(
                    "timed out after {:?} waiting for a pooled connection",
                    self.config.acquire_timeout
                )));
            }
        };

        let reused = self.shared.idle.lock().unwrap().pop();
        let conn = match reused {
            Some(conn) => {
                tracing::trace!(backend = self.config.backend.as_str(), "reusing idle connection");
                conn
            }
            None => {
                tracing::debug!(backend = self.config.backend.as_str(), "opening new connection");
                self.driver.connect(&self.config).await?
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            shared: Arc::clone(&self.shared),
            _permit: permit,
            poisoned: false,
        })
    }

    /// Close the pool: refuse further acquisition and close every idle
    /// connection. Borrowed connections are discarded when returned.
    pub async fn close(&self) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.semaphore.close();
        let drained: Vec<Box<dyn DriverConnection>> =
            self.shared.idle.lock().unwrap().drain(..).collect();
        for mut conn in drained {
            conn.close().await?;
        }
        Ok(())
    }

    /// True once [`close`](Pool::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("backend", &self.config.backend)
            .field("size", &self.size)
            .field("available", &self.available())
            .field("idle", &self.idle_count())
            .finish()
    }
}

/// A connection borrowed from a [`Pool`].
///
/// Implements [`DriverConnection`], so callers use it exactly like a raw
/// connection. Dropping it returns the connection to the pool; call
/// [`poison`](PooledConnection::poison) first when the connection's state
/// is unknown (for example after a failed rollback) to discard it instead.
pub struct PooledConnection {
    conn: Option<Box<dyn DriverConnection>>,
    shared: Arc<PoolShared>,
    _permit: OwnedSemaphorePermit,
    poisoned: bool,
}

impl PooledConnection {
    fn inner(&mut self) -> Result<&mut Box<dyn DriverConnection>> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::backend("pooled connection already released"))
    }

    /// Mark the connection so it is discarded instead of reused.
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    /// True when the connection will be discarded on drop.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

#[async_trait]
impl DriverConnection for PooledConnection {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.inner()?.execute(sql, params).await
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.inner()?.query(sql, params).await
    }

    async fn begin(&mut self) -> Result<()> {
        self.inner()?.begin().await
    }

    async fn commit(&mut self) -> Result<()> {
        self.inner()?.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.inner()?.rollback().await
    }

    async fn close(&mut self) -> Result<()> {
        self.poisoned = true;
        self.inner()?.close().await
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.poisoned {
            tracing::debug!("discarding poisoned connection");
            return;
        }
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        self.shared.idle.lock().unwrap().push(conn);
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("live", &self.conn.is_some())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
