//! A single database session
//!
//! Every operation on a [`Connection`] takes the same session lock, so the
//! connection may be handed between threads but is only ever driven by one
//! at a time. The pool guarantees single-borrower use.

use super::config::ConnectionConfig;
use super::decode::decode_result;
use super::driver::{BindParam, Driver, DriverError, PreparedHandle, Session, StatementId};
use super::error::{DatabaseError, Result};
use super::statement::PreparedStatement;
use super::value::{DatabaseValue, QueryResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One database session plus its transaction state
pub struct Connection {
    id: u64,
    config: ConnectionConfig,
    driver: Arc<dyn Driver>,
    session: Mutex<Option<Box<dyn Session>>>,
    in_transaction: AtomicBool,
}

impl Connection {
    /// Create an unconnected connection; call [`Connection::connect`] before use
    pub fn new(driver: Arc<dyn Driver>, config: ConnectionConfig) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            driver,
            session: Mutex::new(None),
            in_transaction: AtomicBool::new(false),
        }
    }

    /// Process-unique identifier, stable for the lifetime of this value
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Configuration this connection was created from
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Establish the session from the stored configuration.
    ///
    /// Connecting an already connected session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ConnectionFailed`] carrying the driver's message.
    pub fn connect(&self) -> Result<()> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Ok(());
        }

        match self.driver.connect(&self.config) {
            Ok(opened) => {
                *session = Some(opened);
                tracing::debug!(
                    connection = self.id,
                    driver = self.driver.name(),
                    target = %self.config,
                    "connection opened"
                );
                Ok(())
            }
            Err(e) => Err(DatabaseError::connection_failed_with_source(
                self.config.host.clone(),
                self.config.port,
                e.message.clone(),
                Box::new(e),
            )),
        }
    }

    /// Close the session. Close failures are logged, never returned.
    pub fn disconnect(&self) {
        let mut session = self.session.lock();
        if let Some(mut open) = session.take() {
            if let Err(e) = open.close() {
                tracing::warn!(connection = self.id, error = %e, "error closing connection");
            }
            tracing::debug!(connection = self.id, "connection closed");
        }
        self.in_transaction.store(false, Ordering::Release);
    }

    /// Whether a session is open and answers a ping
    pub fn is_connected(&self) -> bool {
        self.ping()
    }

    /// Liveness probe; never reconnects
    pub fn ping(&self) -> bool {
        self.session
            .lock()
            .as_mut()
            .map(|session| session.ping())
            .unwrap_or(false)
    }

    /// Tear the session down and open a fresh one.
    ///
    /// An open transaction does not survive.
    pub fn reconnect(&self) -> Result<()> {
        self.disconnect();
        self.connect()
    }

    /// Run a non-parameterized statement and buffer its entire result
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(DatabaseError::NotConnected)?;
        let raw = session
            .query(sql)
            .map_err(DatabaseError::from_statement)?;
        decode_result(raw)
    }

    /// Run a non-parameterized statement, returning the affected-row count
    pub fn execute(&self, sql: &str) -> Result<u64> {
        Ok(self.query(sql)?.affected_rows())
    }

    /// Compile `sql` into a [`PreparedStatement`] bound to this connection
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement<'_>> {
        let handle = {
            let mut guard = self.session.lock();
            let session = guard.as_mut().ok_or(DatabaseError::NotConnected)?;
            session.prepare(sql).map_err(DatabaseError::from_prepare)?
        };
        tracing::debug!(
            connection = self.id,
            statement = handle.id.0,
            params = handle.param_count,
            "statement prepared"
        );
        Ok(PreparedStatement::new(self, sql, handle))
    }

    /// Prepare `sql`, bind `params` in order and execute once
    pub fn query_with_params(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_all(params);
        stmt.execute()
    }

    /// Parameterized statement returning the affected-row count
    pub fn execute_with_params(&self, sql: &str, params: &[DatabaseValue]) -> Result<u64> {
        Ok(self.query_with_params(sql, params)?.affected_rows())
    }

    /// Open a transaction
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::TransactionError`] if one is already open.
    pub fn begin_transaction(&self) -> Result<()> {
        if self.in_transaction() {
            return Err(DatabaseError::transaction("Already in a transaction"));
        }
        self.execute(self.driver.begin_transaction_sql())?;
        self.in_transaction.store(true, Ordering::Release);
        Ok(())
    }

    /// Commit the open transaction.
    ///
    /// The transaction stays marked open if the commit fails, so a later
    /// release still rolls it back.
    pub fn commit(&self) -> Result<()> {
        if !self.in_transaction() {
            return Err(DatabaseError::transaction("No active transaction"));
        }
        self.execute("COMMIT")?;
        self.in_transaction.store(false, Ordering::Release);
        Ok(())
    }

    /// Roll back the open transaction; the flag is cleared either way
    pub fn rollback(&self) -> Result<()> {
        if !self.in_transaction() {
            return Err(DatabaseError::transaction("No active transaction"));
        }
        let result = self.execute("ROLLBACK");
        self.in_transaction.store(false, Ordering::Release);
        result.map(|_| ())
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }

    /// Escape `raw` for literal inclusion in SQL text.
    ///
    /// Prefer bound parameters.
    pub fn escape(&self, raw: &str) -> Result<String> {
        let guard = self.session.lock();
        let session = guard.as_ref().ok_or(DatabaseError::NotConnected)?;
        Ok(session.escape(raw))
    }

    /// Last error reported by the driver on this session
    pub fn last_error(&self) -> Option<DriverError> {
        self.session
            .lock()
            .as_ref()
            .and_then(|session| session.last_error())
    }

    pub(crate) fn execute_statement(
        &self,
        handle: &PreparedHandle,
        params: &[BindParam],
    ) -> Result<QueryResult> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(DatabaseError::NotConnected)?;
        let raw = session
            .execute(handle.id, params)
            .map_err(DatabaseError::from_statement)?;
        decode_result(raw)
    }

    pub(crate) fn reset_statement(&self, id: StatementId) -> Result<()> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(DatabaseError::NotConnected)?;
        session.reset(id).map_err(DatabaseError::from_statement)
    }

    pub(crate) fn close_statement(&self, id: StatementId) {
        if let Some(session) = self.session.lock().as_mut() {
            session.close_statement(id);
            tracing::debug!(connection = self.id, statement = id.0, "statement closed");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.in_transaction() {
            if let Err(e) = self.rollback() {
                tracing::warn!(connection = self.id, error = %e, "rollback on drop failed");
            }
        }
        self.disconnect();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("driver", &self.driver.name())
            .field("target", &self.config.to_string())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::SqliteDriver;

    fn memory_connection() -> Connection {
        let config = ConnectionConfig::new().with_database(":memory:");
        let conn = Connection::new(Arc::new(SqliteDriver::new()), config);
        conn.connect().unwrap();
        conn
    }

    #[test]
    fn test_not_connected() {
        let config = ConnectionConfig::new().with_database(":memory:");
        let conn = Connection::new(Arc::new(SqliteDriver::new()), config);
        assert!(!conn.is_connected());
        assert!(matches!(
            conn.query("SELECT 1"),
            Err(DatabaseError::NotConnected)
        ));
    }

    #[test]
    fn test_query_and_execute() {
        let conn = memory_connection();
        assert!(conn.ping());

        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        let result = conn.query("INSERT INTO t (name) VALUES ('a')").unwrap();
        assert_eq!(result.affected_rows(), 1);
        assert_eq!(result.last_insert_id(), 1);

        let rows = conn.query("SELECT id, name FROM t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], DatabaseValue::Long(1));
        assert_eq!(rows[0]["name"], DatabaseValue::String("a".to_string()));
    }

    #[test]
    fn test_query_error_carries_code() {
        let conn = memory_connection();
        let err = conn.query("SELECT * FROM missing").unwrap_err();
        assert!(matches!(err, DatabaseError::QueryError { .. }));
        assert!(conn.last_error().is_some());
    }

    #[test]
    fn test_transaction_flag() {
        let conn = memory_connection();
        conn.execute("CREATE TABLE t (v INTEGER)").unwrap();

        conn.begin_transaction().unwrap();
        assert!(conn.in_transaction());
        assert!(matches!(
            conn.begin_transaction(),
            Err(DatabaseError::TransactionError(_))
        ));
        conn.execute("INSERT INTO t VALUES (1)").unwrap();
        conn.rollback().unwrap();
        assert!(!conn.in_transaction());
        assert!(conn.query("SELECT v FROM t").unwrap().is_empty());

        assert!(conn.commit().is_err());
    }

    #[test]
    fn test_reconnect_drops_transaction() {
        let conn = memory_connection();
        conn.begin_transaction().unwrap();
        conn.reconnect().unwrap();
        assert!(!conn.in_transaction());
        assert!(conn.ping());
    }

    #[test]
    fn test_escape() {
        let conn = memory_connection();
        assert_eq!(conn.escape("O'Brien").unwrap(), "O''Brien");
    }
}
