//! Connection and pool configuration
//!
//! A [`ConnectionConfig`] is an immutable snapshot: it is cloned into every
//! [`crate::core::Connection`] and into the pool at construction time.

use super::error::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Connection, pool and worker settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// User name
    pub user: String,
    /// Password (never logged)
    pub password: String,
    /// Database name; file path for file-based drivers
    pub database: String,
    /// Character set requested for the session
    pub charset: String,
    /// Connections opened when the pool starts
    pub pool_size: usize,
    /// Upper bound on idle connections kept by the pool
    pub max_pool_size: usize,
    /// Session establishment timeout in milliseconds
    pub connection_timeout_ms: u64,
    /// Ask the driver to re-establish dropped sessions on its own
    pub auto_reconnect: bool,
    /// Bound on how long `acquire` waits for an idle connection; `None` waits indefinitely
    pub acquire_timeout_ms: Option<u64>,
    /// Worker threads serving asynchronous calls; `None` uses the available parallelism
    pub worker_threads: Option<usize>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            charset: "utf8mb4".to_string(),
            pool_size: 10,
            max_pool_size: 50,
            connection_timeout_ms: 10_000,
            auto_reconnect: true,
            acquire_timeout_ms: None,
            worker_threads: None,
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the credentials
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the database name (or file path)
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the session character set
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the initial pool size
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the maximum number of idle connections retained
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the session establishment timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Enable or disable driver-level reconnection
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Bound how long `acquire` may block
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = Some(saturating_millis(timeout));
        self
    }

    /// Set the number of worker threads
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = Some(workers);
        self
    }

    /// Session establishment timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Acquire timeout, if bounded
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Number of worker threads to start
    pub fn worker_count(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Check the pool and worker settings for consistency
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidConfig`] when `max_pool_size` is zero,
    /// `pool_size` exceeds `max_pool_size`, or zero worker threads are requested.
    pub fn validate(&self) -> Result<()> {
        if self.max_pool_size == 0 {
            return Err(DatabaseError::invalid_config(
                "max_pool_size must be at least 1",
            ));
        }
        if self.pool_size > self.max_pool_size {
            return Err(DatabaseError::invalid_config(format!(
                "pool_size ({}) exceeds max_pool_size ({})",
                self.pool_size, self.max_pool_size
            )));
        }
        if self.worker_threads == Some(0) {
            return Err(DatabaseError::invalid_config(
                "worker_threads must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

fn saturating_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("pool_size", &self.pool_size)
            .field("max_pool_size", &self.max_pool_size)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .field("worker_threads", &self.worker_threads)
            .finish()
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}
