//! Driver and connection types for the embedded backend.
//!
//! One [`MemoryDriver`] owns a registry of named stores keyed by database
//! name. Every connection opened for the same database name shares one
//! store; separate driver instances never share state. Transactions are
//! store snapshots: `begin` captures one, `rollback` (or dropping the
//! connection mid-transaction) restores it, `commit` discards it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ultraorm_core::{
    Config, Dialect, Driver, DriverConnection, Error, ExecResult, Result, Row, Value,
};

use crate::engine::Store;
use crate::sql;

/// Driver for the embedded in-memory backend.
#[derive(Default)]
pub struct MemoryDriver {
    stores: Mutex<HashMap<String, Arc<Mutex<Store>>>>,
}

impl MemoryDriver {
    /// Create a driver with an empty store registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("databases", &self.stores.lock().unwrap().len())
            .finish()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn connect(&self, config: &Config) -> Result<Box<dyn DriverConnection>> {
        let store = {
            let mut stores = self.stores.lock().unwrap();
            Arc::clone(stores.entry(config.database.clone()).or_default())
        };
        tracing::debug!(database = %config.database, "memory connection opened");
        Ok(Box::new(MemoryConnection {
            store,
            snapshot: None,
            closed: false,
        }))
    }
}

/// One connection to a named in-memory database.
pub struct MemoryConnection {
    store: Arc<Mutex<Store>>,
    snapshot: Option<Store>,
    closed: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::backend("connection is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl DriverConnection for MemoryConnection {
    async fn execute(&mut self, sql_text: &str, params: &[Value]) -> Result<ExecResult> {
        self.ensure_open()?;
        let statement = sql::parse(sql_text)?;
        self.store.lock().unwrap().execute(&statement, params)
    }

    async fn query(&mut self, sql_text: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let statement = sql::parse(sql_text)?;
        self.store.lock().unwrap().query(&statement, params)
    }

    async fn begin(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.snapshot.is_some() {
            return Err(Error::backend("a transaction is already open on this connection"));
        }
        self.snapshot = Some(self.store.lock().unwrap().clone());
        tracing::trace!("memory transaction began");
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.snapshot.take().is_none() {
            return Err(Error::backend("no open transaction to commit"));
        }
        tracing::trace!("memory transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        match self.snapshot.take() {
            Some(snapshot) => {
                *self.store.lock().unwrap() = snapshot;
                tracing::trace!("memory transaction rolled back");
                Ok(())
            }
            None => Err(Error::backend("no open transaction to roll back")),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            *self.store.lock().unwrap() = snapshot;
        }
        self.closed = true;
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            if let Ok(mut store) = self.store.lock() {
                *store = snapshot;
                tracing::warn!("connection dropped with an open transaction; rolled back");
            }
        }
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("in_transaction", &self.snapshot.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATE: &str =
        "CREATE TABLE IF NOT EXISTS items (id INT PRIMARY KEY AUTO_INCREMENT NOT NULL, \
         name VARCHAR(255) NOT NULL)";
    const INSERT: &str = "INSERT INTO items (name) VALUES (?)";
    const COUNT: &str = "SELECT COUNT(*) FROM items";

    async fn open(driver: &MemoryDriver, database: &str) -> Box<dyn DriverConnection> {
        driver.connect(&Config::memory(database)).await.unwrap()
    }

    async fn count(conn: &mut Box<dyn DriverConnection>) -> i64 {
        let rows = conn.query(COUNT, &[]).await.unwrap();
        rows[0].get(0).and_then(Value::as_i64).unwrap()
    }

    #[tokio::test]
    async fn test_connections_share_a_named_store() {
        let driver = MemoryDriver::new();
        let mut first = open(&driver, "app").await;
        first.execute(CREATE, &[]).await.unwrap();
        first.execute(INSERT, &[Value::from("widget")]).await.unwrap();

        let mut second = open(&driver, "app").await;
        assert_eq!(count(&mut second).await, 1);
    }

    #[tokio::test]
    async fn test_database_names_are_isolated() {
        let driver = MemoryDriver::new();
        let mut first = open(&driver, "alpha").await;
        first.execute(CREATE, &[]).await.unwrap();

        let mut second = open(&driver, "beta").await;
        assert!(second.query(COUNT, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_driver_instances_are_isolated() {
        let first_driver = MemoryDriver::new();
        let mut first = open(&first_driver, "app").await;
        first.execute(CREATE, &[]).await.unwrap();

        let second_driver = MemoryDriver::new();
        let mut second = open(&second_driver, "app").await;
        assert!(second.query(COUNT, &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_commit_keeps_writes() {
        let driver = MemoryDriver::new();
        let mut conn = open(&driver, "app").await;
        conn.execute(CREATE, &[]).await.unwrap();

        conn.begin().await.unwrap();
        conn.execute(INSERT, &[Value::from("widget")]).await.unwrap();
        conn.commit().await.unwrap();

        assert_eq!(count(&mut conn).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let driver = MemoryDriver::new();
        let mut conn = open(&driver, "app").await;
        conn.execute(CREATE, &[]).await.unwrap();
        conn.execute(INSERT, &[Value::from("kept")]).await.unwrap();

        conn.begin().await.unwrap();
        conn.execute(INSERT, &[Value::from("discarded")]).await.unwrap();
        conn.rollback().await.unwrap();

        assert_eq!(count(&mut conn).await, 1);
    }

    #[tokio::test]
    async fn test_drop_mid_transaction_rolls_back() {
        let driver = MemoryDriver::new();
        {
            let mut conn = open(&driver, "app").await;
            conn.execute(CREATE, &[]).await.unwrap();
        }
        {
            let mut conn = open(&driver, "app").await;
            conn.begin().await.unwrap();
            conn.execute(INSERT, &[Value::from("widget")]).await.unwrap();
        }

        let mut conn = open(&driver, "app").await;
        assert_eq!(count(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn test_nested_begin_rejected() {
        let driver = MemoryDriver::new();
        let mut conn = open(&driver, "app").await;
        conn.begin().await.unwrap();
        assert!(conn.begin().await.is_err());
    }

    #[tokio::test]
    async fn test_commit_without_begin_rejected() {
        let driver = MemoryDriver::new();
        let mut conn = open(&driver, "app").await;
        assert!(conn.commit().await.is_err());
        assert!(conn.rollback().await.is_err());
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_statements() {
        let driver = MemoryDriver::new();
        let mut conn = open(&driver, "app").await;
        conn.close().await.unwrap();
        assert!(conn.execute(CREATE, &[]).await.is_err());
    }
}
