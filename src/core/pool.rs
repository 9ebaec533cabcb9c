//! Blocking connection pool
//!
//! Idle connections live in a FIFO set guarded by one lock and a condition
//! variable. `acquire` blocks until a connection is idle or the pool is
//! closed; `release` hands a connection back and wakes one waiter. Closing is
//! one-way: every waiter, current and future, fails with
//! [`DatabaseError::PoolClosed`].

use super::config::ConnectionConfig;
use super::connection::Connection;
use super::driver::Driver;
use super::error::{DatabaseError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

struct PoolState {
    idle: VecDeque<Arc<Connection>>,
    in_use: usize,
    waiting: usize,
    stopped: bool,
}

/// Pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections sitting in the idle set
    pub idle: usize,
    /// Connections currently checked out
    pub in_use: usize,
    /// Threads blocked in `acquire`
    pub waiting: usize,
    /// Upper bound on the idle set
    pub max_size: usize,
}

/// Thread-safe pool of [`Connection`]s
pub struct ConnectionPool {
    driver: Arc<dyn Driver>,
    config: ConnectionConfig,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    /// Create a pool and open `config.pool_size` connections up front.
    ///
    /// Connections that fail to open are left out, so the pool may start
    /// smaller than requested. Only an invalid configuration is an error.
    pub fn new(driver: Arc<dyn Driver>, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let mut idle = VecDeque::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            let conn = Connection::new(Arc::clone(&driver), config.clone());
            match conn.connect() {
                Ok(()) => idle.push_back(Arc::new(conn)),
                Err(e) => {
                    tracing::warn!(error = %e, "omitting connection that failed to open");
                }
            }
        }

        tracing::info!(
            driver = driver.name(),
            target = %config,
            requested = config.pool_size,
            opened = idle.len(),
            max_size = config.max_pool_size,
            "connection pool initialized"
        );

        Ok(Self {
            driver,
            config,
            state: Mutex::new(PoolState {
                idle,
                in_use: 0,
                waiting: 0,
                stopped: false,
            }),
            available: Condvar::new(),
        })
    }

    /// Take a connection, blocking until one is idle.
    ///
    /// The connection is pinged before it is handed out; a dead one is
    /// replaced by a freshly opened connection.
    ///
    /// # Errors
    ///
    /// - [`DatabaseError::PoolClosed`] if the pool is or becomes closed
    /// - [`DatabaseError::PoolTimeout`] if `acquire_timeout_ms` elapses first
    /// - [`DatabaseError::ConnectionUnavailable`] if a dead connection cannot be replaced
    pub fn acquire(&self) -> Result<Arc<Connection>> {
        let deadline = self.config.acquire_timeout().map(|t| Instant::now() + t);

        let conn = {
            let mut state = self.state.lock();
            loop {
                if state.stopped {
                    return Err(DatabaseError::PoolClosed);
                }
                if let Some(conn) = state.idle.pop_front() {
                    state.in_use += 1;
                    break conn;
                }

                state.waiting += 1;
                let timed_out = match deadline {
                    Some(deadline) => self.available.wait_until(&mut state, deadline).timed_out(),
                    None => {
                        self.available.wait(&mut state);
                        false
                    }
                };
                state.waiting -= 1;

                if timed_out && !state.stopped && state.idle.is_empty() {
                    return Err(DatabaseError::pool_timeout(
                        self.config.acquire_timeout_ms.unwrap_or_default(),
                    ));
                }
            }
        };

        if conn.ping() {
            return Ok(conn);
        }

        tracing::warn!(connection = conn.id(), "pooled connection failed health check, replacing");
        conn.disconnect();
        drop(conn);

        let replacement = Connection::new(Arc::clone(&self.driver), self.config.clone());
        match replacement.connect() {
            Ok(()) => Ok(Arc::new(replacement)),
            Err(e) => {
                let mut state = self.state.lock();
                state.in_use = state.in_use.saturating_sub(1);
                Err(DatabaseError::connection_unavailable(e.to_string()))
            }
        }
    }

    /// Take a connection wrapped in a guard that releases it on drop
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        Ok(PooledConnection {
            pool: self,
            conn: self.acquire()?,
        })
    }

    /// Return a connection to the pool. Never fails.
    ///
    /// An open transaction is rolled back first. If the idle set is already
    /// at `max_pool_size`, or the pool is closed, the connection is
    /// disconnected instead of kept.
    pub fn release(&self, conn: Arc<Connection>) {
        if conn.in_transaction() {
            if let Err(e) = conn.rollback() {
                tracing::warn!(
                    connection = conn.id(),
                    error = %e,
                    "rollback on release failed"
                );
            }
        }

        let mut state = self.state.lock();
        state.in_use = state.in_use.saturating_sub(1);

        if !state.stopped && state.idle.len() < self.config.max_pool_size {
            state.idle.push_back(conn);
            drop(state);
            self.available.notify_one();
            return;
        }

        let stopped = state.stopped;
        drop(state);
        tracing::debug!(
            connection = conn.id(),
            stopped,
            "closing released connection instead of pooling it"
        );
        conn.disconnect();
    }

    /// Number of idle connections
    pub fn size(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Number of idle connections; same as [`ConnectionPool::size`]
    pub fn available(&self) -> usize {
        self.size()
    }

    /// Number of connections currently checked out
    pub fn in_use(&self) -> usize {
        self.state.lock().in_use
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle: state.idle.len(),
            in_use: state.in_use,
            waiting: state.waiting,
            max_size: self.config.max_pool_size,
        }
    }

    /// Configuration connections are created from
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether [`ConnectionPool::close`] has run
    pub fn is_closed(&self) -> bool {
        self.state.lock().stopped
    }

    /// Stop the pool: wake all waiters and disconnect idle connections.
    ///
    /// Connections still checked out are disconnected when released.
    pub fn close(&self) {
        let drained: Vec<Arc<Connection>> = {
            let mut state = self.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.idle.drain(..).collect()
        };
        self.available.notify_all();

        let closed = drained.len();
        for conn in drained {
            conn.disconnect();
        }
        tracing::info!(closed, "connection pool closed");
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("driver", &self.driver.name())
            .field("target", &self.config.to_string())
            .field("stats", &self.stats())
            .finish()
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Dereferences to [`Connection`]; returned to the pool when dropped.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Arc<Connection>,
}

impl PooledConnection<'_> {
    /// The shared handle of the borrowed connection
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }
}

impl std::ops::Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        self.pool.release(Arc::clone(&self.conn));
    }
}

impl std::fmt::Debug for PooledConnection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PooledConnection").field(&*self.conn).finish()
    }
}
