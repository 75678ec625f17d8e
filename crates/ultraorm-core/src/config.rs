//! Connection configuration.
//!
//! One [`Config`] value drives backend selection, connection parameters,
//! and pool sizing. Server backends get documented per-kind defaults; the
//! embedded memory backend needs only a database name.

use std::time::Duration;

use crate::error::{Error, Result};

/// Supported backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// MySQL family. Pool default 10, port default 3306.
    MySql,
    /// Postgres family. Pool default 20, port default 5432.
    Postgres,
    /// Embedded in-process backend. Pool default 10.
    Memory,
    /// Document store. Accepted in configuration, rejected at connect time:
    /// no driver for it is implemented.
    MongoDb,
}

impl BackendKind {
    /// Canonical lower-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendKind::MySql => "mysql",
            BackendKind::Postgres => "postgres",
            BackendKind::Memory => "memory",
            BackendKind::MongoDb => "mongodb",
        }
    }

    /// Parse a URL scheme or configuration string.
    #[must_use]
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" => Some(BackendKind::MySql),
            "postgres" | "postgresql" => Some(BackendKind::Postgres),
            "memory" => Some(BackendKind::Memory),
            "mongodb" => Some(BackendKind::MongoDb),
            _ => None,
        }
    }

    /// Documented default pool size for this family.
    #[must_use]
    pub const fn default_pool_size(&self) -> u32 {
        match self {
            BackendKind::Postgres => 20,
            BackendKind::MySql | BackendKind::Memory | BackendKind::MongoDb => 10,
        }
    }

    /// Default server port (0 for backends without one).
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            BackendKind::MySql => 3306,
            BackendKind::Postgres => 5432,
            BackendKind::Memory => 0,
            BackendKind::MongoDb => 27017,
        }
    }

    /// Default user name for server backends.
    #[must_use]
    pub const fn default_user(&self) -> &'static str {
        match self {
            BackendKind::MySql => "root",
            BackendKind::Postgres => "postgres",
            BackendKind::Memory | BackendKind::MongoDb => "",
        }
    }
}

/// Connection configuration consumed by the connection manager.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend family.
    pub backend: BackendKind,
    /// Hostname or IP address (server backends).
    pub host: String,
    /// Port number (server backends).
    pub port: u16,
    /// User name (server backends).
    pub user: String,
    /// Password (server backends).
    pub password: Option<String>,
    /// Database name.
    pub database: String,
    /// Full connection URL (required by the document store, optional
    /// elsewhere; drivers may prefer it over discrete parameters).
    pub url: Option<String>,
    /// Pool size override; the per-kind default applies when absent.
    pub pool_size: Option<u32>,
    /// How long an acquire may wait for a free connection.
    pub acquire_timeout: Duration,
}

impl Config {
    /// Create a configuration for `backend` with per-kind defaults.
    pub fn new(backend: BackendKind, database: impl Into<String>) -> Self {
        Self {
            backend,
            host: "localhost".to_string(),
            port: backend.default_port(),
            user: backend.default_user().to_string(),
            password: None,
            database: database.into(),
            url: None,
            pool_size: None,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// MySQL-family configuration.
    pub fn mysql(database: impl Into<String>) -> Self {
        Self::new(BackendKind::MySql, database)
    }

    /// Postgres-family configuration.
    pub fn postgres(database: impl Into<String>) -> Self {
        Self::new(BackendKind::Postgres, database)
    }

    /// Embedded memory-backend configuration.
    pub fn memory(database: impl Into<String>) -> Self {
        Self::new(BackendKind::Memory, database)
    }

    /// Document-store configuration. Connect will reject it: the driver is
    /// not implemented.
    pub fn mongodb(url: impl Into<String>, database: impl Into<String>) -> Self {
        let mut config = Self::new(BackendKind::MongoDb, database);
        config.url = Some(url.into());
        config
    }

    /// Set the hostname.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the user name.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connection URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the pool size.
    #[must_use]
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Set the acquire timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Pool size to use: the override when set, the per-kind default
    /// otherwise.
    #[must_use]
    pub fn effective_pool_size(&self) -> u32 {
        self.pool_size.unwrap_or_else(|| self.backend.default_pool_size())
    }

    /// Check the parameters this backend kind requires.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(Error::configuration("database name must not be empty"));
        }
        match self.backend {
            BackendKind::MySql | BackendKind::Postgres => {
                if self.host.is_empty() {
                    return Err(Error::configuration("host must not be empty"));
                }
                if self.user.is_empty() {
                    return Err(Error::configuration("user must not be empty"));
                }
                if self.port == 0 {
                    return Err(Error::configuration("port must not be zero"));
                }
                Ok(())
            }
            BackendKind::MongoDb => {
                if self.url.is_none() {
                    return Err(Error::configuration(
                        "the document-store backend requires a connection url",
                    ));
                }
                Ok(())
            }
            BackendKind::Memory => Ok(()),
        }
    }

    /// Parse a connection URL of the form
    /// `scheme://[user[:password]@]host[:port]/database` (for server
    /// backends) or `memory://database`.
    pub fn from_url(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::configuration(format!("malformed connection url `{url}`")))?;
        let backend = BackendKind::from_scheme(scheme).ok_or_else(|| {
            Error::configuration(format!("unsupported backend scheme `{scheme}`"))
        })?;

        if backend == BackendKind::Memory {
            let database = rest.trim_matches('/');
            if database.is_empty() {
                return Err(Error::configuration(
                    "memory url must name a database, e.g. memory://app_db",
                ));
            }
            return Ok(Self::memory(database));
        }

        if backend == BackendKind::MongoDb {
            let database = rest.rsplit_once('/').map_or("", |(_, db)| db);
            if database.is_empty() {
                return Err(Error::configuration(
                    "document-store url must end with /<database>",
                ));
            }
            return Ok(Self::mongodb(url, database));
        }

        let (authority, database) = rest
            .split_once('/')
            .ok_or_else(|| Error::configuration(format!("url `{url}` is missing a database")))?;
        if database.is_empty() {
            return Err(Error::configuration(format!("url `{url}` is missing a database")));
        }

        let mut config = Self::new(backend, database).url(url);

        let host_port = match authority.rsplit_once('@') {
            Some((credentials, host_port)) => {
                match credentials.split_once(':') {
                    Some((user, password)) => {
                        config.user = user.to_string();
                        config.password = Some(password.to_string());
                    }
                    None => config.user = credentials.to_string(),
                }
                host_port
            }
            None => authority,
        };

        match host_port.split_once(':') {
            Some((host, port)) => {
                config.host = host.to_string();
                config.port = port.parse().map_err(|_| {
                    Error::configuration(format!("invalid port in url `{url}`"))
                })?;
            }
            None => config.host = host_port.to_string(),
        }
        if config.host.is_empty() {
            return Err(Error::configuration(format!("url `{url}` is missing a host")));
        }

        Ok(config)
    }
}
