//! Connection management: pooling, registries, migration, transactions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::BoxFuture;

use ultraorm_core::{
    BackendKind, Config, Dialect, Driver, DriverConnection, EntityDefinition, Error, ExecResult,
    Executor, Result, Row, Value,
};
use ultraorm_memory::MemoryDriver;
use ultraorm_pool::Pool;

use crate::entity::Entity;
use crate::transaction::TransactionScope;

struct ManagerInner {
    config: Config,
    drivers: RwLock<HashMap<BackendKind, Arc<dyn Driver>>>,
    entities: RwLock<Vec<Arc<EntityDefinition>>>,
    pool: tokio::sync::RwLock<Option<Arc<Pool>>>,
}

/// Owns one backend configuration, its connection pool, and the registries
/// of entities and drivers.
///
/// Cloning is cheap and shares all state; independent managers never share
/// anything. The manager implements [`Executor`] by borrowing a pooled
/// connection per statement, which is the ambient autocommit path; use
/// [`transaction`](ConnectionManager::transaction) to pin one connection
/// for a transactional scope.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    /// Create a manager for `config`. The embedded memory driver comes
    /// pre-registered; server drivers plug in via
    /// [`register_driver`](ConnectionManager::register_driver).
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut drivers: HashMap<BackendKind, Arc<dyn Driver>> = HashMap::new();
        drivers.insert(BackendKind::Memory, Arc::new(MemoryDriver::new()));
        Self {
            inner: Arc::new(ManagerInner {
                config,
                drivers: RwLock::new(drivers),
                entities: RwLock::new(Vec::new()),
                pool: tokio::sync::RwLock::new(None),
            }),
        }
    }

    /// Create a manager from a connection URL.
    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self::new(Config::from_url(url)?))
    }

    /// The configuration the manager was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Register a driver for a backend kind, replacing any prior one.
    pub fn register_driver(&self, kind: BackendKind, driver: Arc<dyn Driver>) {
        tracing::debug!(backend = kind.as_str(), "driver registered");
        self.inner.drivers.write().unwrap().insert(kind, driver);
    }

    fn driver_for(&self, kind: BackendKind) -> Result<Arc<dyn Driver>> {
        self.inner
            .drivers
            .read()
            .unwrap()
            .get(&kind)
            .map(Arc::clone)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "no driver registered for backend kind `{}`",
                    kind.as_str()
                ))
            })
    }

    /// Whether [`connect`](ConnectionManager::connect) has succeeded and
    /// [`disconnect`](ConnectionManager::disconnect) has not run since.
    pub async fn is_connected(&self) -> bool {
        self.inner.pool.read().await.is_some()
    }

    /// Establish the connection pool. Idempotent: returns immediately when
    /// already connected.
    ///
    /// Validates the configuration, resolves the backend's driver
    /// (`Configuration` error when none is registered, which covers the
    /// document-store kind), builds the pool, and opens one connection to
    /// prove the backend is reachable.
    #[tracing::instrument(skip(self), fields(backend = self.inner.config.backend.as_str()))]
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.inner.pool.write().await;
        if slot.is_some() {
            return Ok(());
        }
        self.inner.config.validate()?;
        let driver = self.driver_for(self.inner.config.backend)?;
        let pool = Arc::new(Pool::new(driver, self.inner.config.clone()));
        let warm = pool.acquire().await?;
        drop(warm);
        tracing::info!(
            database = self.inner.config.database,
            pool_size = pool.size(),
            "connected"
        );
        *slot = Some(pool);
        Ok(())
    }

    /// Release the connection pool. Idempotent: a no-op when not connected.
    #[tracing::instrument(skip(self), fields(backend = self.inner.config.backend.as_str()))]
    pub async fn disconnect(&self) -> Result<()> {
        let mut slot = self.inner.pool.write().await;
        let Some(pool) = slot.take() else {
            return Ok(());
        };
        pool.close().await?;
        tracing::info!("disconnected");
        Ok(())
    }

    /// Record an entity definition and return the handle its persistence
    /// operations run through.
    ///
    /// Registering a table name twice silently replaces the prior
    /// definition in place, keeping its original registration order.
    pub fn register(&self, definition: EntityDefinition) -> Entity {
        let definition = Arc::new(definition);
        let mut entities = self.inner.entities.write().unwrap();
        if let Some(slot) = entities.iter_mut().find(|d| d.table() == definition.table()) {
            tracing::debug!(table = definition.table(), "entity registration replaced");
            *slot = Arc::clone(&definition);
        } else {
            tracing::debug!(table = definition.table(), "entity registered");
            entities.push(Arc::clone(&definition));
        }
        drop(entities);
        Entity::new(self.clone(), definition)
    }

    /// Look up a registered definition by table name.
    #[must_use]
    pub fn definition_of(&self, table: &str) -> Option<Arc<EntityDefinition>> {
        self.inner
            .entities
            .read()
            .unwrap()
            .iter()
            .find(|d| d.table() == table)
            .map(Arc::clone)
    }

    /// Registered table names in registration order.
    #[must_use]
    pub fn registered_tables(&self) -> Vec<String> {
        self.inner
            .entities
            .read()
            .unwrap()
            .iter()
            .map(|d| d.table().to_string())
            .collect()
    }

    /// Synchronize every registered entity's schema, sequentially in
    /// registration order. Later tables may carry foreign keys into earlier
    /// ones, so order matters; the first failure aborts the remainder.
    #[tracing::instrument(skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        let definitions: Vec<Arc<EntityDefinition>> =
            self.inner.entities.read().unwrap().clone();
        tracing::info!(entities = definitions.len(), "migrating registered entities");
        for definition in definitions {
            Entity::new(self.clone(), definition).sync().await?;
        }
        Ok(())
    }

    /// Run `work` inside one transaction on a dedicated pooled connection.
    ///
    /// Commits when the callback returns `Ok`, rolls back and re-raises the
    /// callback's error otherwise; a rollback failure is logged and the
    /// original error still propagates. The connection always goes back to
    /// the pool afterward, discarded rather than recycled when its
    /// transaction did not complete cleanly. All transactional work must go
    /// through the supplied scope.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let moved = manager
    ///     .transaction(|tx| {
    ///         Box::pin(async move {
    ///             debit.save(tx).await?;
    ///             credit.save(tx).await?;
    ///             Ok(())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    #[tracing::instrument(skip(self, work))]
    pub async fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a TransactionScope) -> BoxFuture<'a, Result<T>> + Send,
    {
        let pool = self.require_pool().await?;
        let mut conn = pool.acquire().await?;
        conn.begin().await?;
        let scope = TransactionScope::new(conn, self.dialect());

        match work(&scope).await {
            Ok(value) => {
                if let Err(commit_err) = scope.commit().await {
                    tracing::error!(error = %commit_err, "transaction commit failed");
                    scope.poison().await;
                    return Err(commit_err);
                }
                tracing::debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                match scope.rollback().await {
                    Ok(()) => tracing::debug!("transaction rolled back"),
                    Err(rollback_err) => {
                        tracing::warn!(
                            error = %rollback_err,
                            "rollback failed after transaction error"
                        );
                        scope.poison().await;
                    }
                }
                Err(err)
            }
        }
    }

    async fn require_pool(&self) -> Result<Arc<Pool>> {
        self.inner
            .pool
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| Error::connection("not connected; call connect() first"))
    }
}

#[async_trait]
impl Executor for ConnectionManager {
    fn dialect(&self) -> Dialect {
        self.inner
            .drivers
            .read()
            .unwrap()
            .get(&self.inner.config.backend)
            .map_or_else(Dialect::default, |driver| driver.dialect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let pool = self.require_pool().await?;
        let mut conn = pool.acquire().await?;
        conn.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let pool = self.require_pool().await?;
        let mut conn = pool.acquire().await?;
        conn.query(sql, params).await
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("backend", &self.inner.config.backend)
            .field("database", &self.inner.config.database)
            .field("entities", &self.registered_tables())
            .finish()
    }
}
