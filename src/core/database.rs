//! Database facade
//!
//! [`Database`] owns a [`ConnectionPool`] and a [`WorkerPool`]. Synchronous
//! calls borrow a pooled connection for the duration of one operation; the
//! `*_async` variants run the same path on a worker thread and hand back a
//! [`QueryHandle`].

use super::config::ConnectionConfig;
use super::driver::Driver;
use super::error::{DatabaseError, Result};
use super::pool::{ConnectionPool, PoolStats};
use super::transaction::Transaction;
use super::value::{DatabaseValue, QueryResult};
use super::worker::{QueryHandle, WorkerPool};
use std::sync::Arc;

/// Pooled database access with synchronous and asynchronous entry points
///
/// # Security Warning
///
/// `query` and `execute` run raw SQL. Never splice user input into the text;
/// use `query_with_params()` / `execute_with_params()` instead:
///
/// ```no_run
/// # use rust_database_pool::prelude::*;
/// # fn lookup(db: &Database, user_input: &str) -> Result<()> {
/// // UNSAFE - vulnerable to SQL injection
/// db.query(&format!("SELECT * FROM users WHERE name = '{}'", user_input))?;
///
/// // SAFE - bound parameter
/// db.query_with_params("SELECT * FROM users WHERE name = ?", &[user_input.into()])?;
/// # Ok(())
/// # }
/// ```
pub struct Database {
    pool: Arc<ConnectionPool>,
    workers: WorkerPool,
}

impl Database {
    /// Build the pool and start the worker threads
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidConfig`] for an inconsistent
    /// configuration, or an IO error if a worker thread cannot be spawned.
    /// Connections that fail to open are not an error.
    pub fn new(driver: Arc<dyn Driver>, config: ConnectionConfig) -> Result<Self> {
        let worker_count = config.worker_count();
        let pool = Arc::new(ConnectionPool::new(driver, config)?);
        let workers = WorkerPool::new(worker_count)?;
        Ok(Self { pool, workers })
    }

    /// Database backed by the bundled SQLite driver; `config.database` is the file path
    #[cfg(feature = "sqlite")]
    pub fn sqlite(config: ConnectionConfig) -> Result<Self> {
        Self::new(Arc::new(crate::backends::SqliteDriver::new()), config)
    }

    /// The underlying pool
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Pool counters
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Run a statement and buffer its result
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let conn = self.pool.get()?;
        conn.query(sql)
    }

    /// Run a statement and return the affected-row count
    pub fn execute(&self, sql: &str) -> Result<u64> {
        let conn = self.pool.get()?;
        conn.execute(sql)
    }

    /// Prepare, bind `params` positionally and execute
    pub fn query_with_params(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        let conn = self.pool.get()?;
        conn.query_with_params(sql, params)
    }

    /// Parameterized statement returning the affected-row count
    pub fn execute_with_params(&self, sql: &str, params: &[DatabaseValue]) -> Result<u64> {
        let conn = self.pool.get()?;
        conn.execute_with_params(sql, params)
    }

    /// Queue [`Database::query`] on a worker thread
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ShutDown`] after [`Database::shutdown`].
    pub fn query_async(&self, sql: impl Into<String>) -> Result<QueryHandle<QueryResult>> {
        let sql = sql.into();
        let pool = Arc::clone(&self.pool);
        self.workers.submit(move || {
            let conn = pool.get()?;
            conn.query(&sql)
        })
    }

    /// Queue [`Database::execute`] on a worker thread
    pub fn execute_async(&self, sql: impl Into<String>) -> Result<QueryHandle<u64>> {
        let sql = sql.into();
        let pool = Arc::clone(&self.pool);
        self.workers.submit(move || {
            let conn = pool.get()?;
            conn.execute(&sql)
        })
    }

    /// Queue [`Database::query_with_params`] on a worker thread
    pub fn query_with_params_async(
        &self,
        sql: impl Into<String>,
        params: Vec<DatabaseValue>,
    ) -> Result<QueryHandle<QueryResult>> {
        let sql = sql.into();
        let pool = Arc::clone(&self.pool);
        self.workers.submit(move || {
            let conn = pool.get()?;
            conn.query_with_params(&sql, &params)
        })
    }

    /// Check out a connection and open a transaction on it
    pub fn begin_transaction(&self) -> Result<Transaction<'_>> {
        Transaction::begin(self.pool.get()?)
    }

    /// Run `f` in a transaction: commit on `Ok`, roll back on `Err`
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.begin_transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after failed transaction body failed");
                }
                Err(e)
            }
        }
    }

    /// Insert `rows` with one multi-row statement.
    ///
    /// Every cell is bound positionally in row-major order. Empty input is a
    /// no-op returning zero.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::BindMismatch`] if a row's width differs from
    /// `columns`, otherwise any statement failure.
    pub fn batch_insert<R>(&self, table: &str, columns: &[&str], rows: &[R]) -> Result<u64>
    where
        R: AsRef<[DatabaseValue]>,
    {
        if rows.is_empty() {
            return Ok(0);
        }
        if columns.is_empty() {
            return Err(DatabaseError::other("batch insert requires at least one column"));
        }

        let mut params = Vec::with_capacity(rows.len() * columns.len());
        for row in rows {
            let row = row.as_ref();
            if row.len() != columns.len() {
                return Err(DatabaseError::bind_mismatch(columns.len(), row.len()));
            }
            params.extend_from_slice(row);
        }

        let sql = batch_insert_sql(table, columns, rows.len());
        tracing::debug!(table, rows = rows.len(), params = params.len(), "batch insert");
        self.execute_with_params(&sql, &params)
    }

    /// Escape `raw` using a pooled connection
    pub fn escape(&self, raw: &str) -> Result<String> {
        let conn = self.pool.get()?;
        conn.escape(raw)
    }

    /// Drain queued asynchronous work, join the workers and close the pool
    pub fn shutdown(&self) {
        self.workers.shutdown();
        self.pool.close();
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool", &self.pool)
            .field("workers", &self.workers)
            .finish()
    }
}

/// `INSERT INTO t (a, b) VALUES (?, ?), (?, ?), ...` for `row_count` rows
pub(crate) fn batch_insert_sql(table: &str, columns: &[&str], row_count: usize) -> String {
    let group = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        vec![group.as_str(); row_count].join(", ")
    )
}


#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use super::*;

    fn database() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facade.db");
        let config = ConnectionConfig::new()
            .with_database(path.to_string_lossy())
            .with_pool_size(2)
            .with_max_pool_size(2)
            .with_worker_threads(2);
        let db = Database::sqlite(config).unwrap();
        db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INT)")
            .unwrap();
        (dir, db)
    }

    #[test]
    fn test_sync_round_trip() {
        let (_dir, db) = database();
        let affected = db
            .execute_with_params(
                "INSERT INTO users (name, age) VALUES (?, ?)",
                &["Alice".into(), 30.into()],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = db.query("SELECT name, age FROM users").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["age"], DatabaseValue::Int(30));
        assert_eq!(db.stats().in_use, 0);
    }

    #[test]
    fn test_batch_insert_empty_and_mismatch() {
        let (_dir, db) = database();
        let empty: Vec<Vec<DatabaseValue>> = Vec::new();
        assert_eq!(db.batch_insert("users", &["name", "age"], &empty).unwrap(), 0);

        let ragged = vec![vec![DatabaseValue::from("x")]];
        assert!(matches!(
            db.batch_insert("users", &["name", "age"], &ragged),
            Err(DatabaseError::BindMismatch { .. })
        ));
    }

    #[test]
    fn test_transaction_closure() {
        let (_dir, db) = database();
        let result: Result<()> = db.transaction(|tx| {
            tx.execute("INSERT INTO users (name, age) VALUES ('Bob', 40)")?;
            Err(DatabaseError::other("abort"))
        });
        assert!(result.is_err());
        assert!(db.query("SELECT * FROM users").unwrap().is_empty());

        let id = db
            .transaction(|tx| {
                tx.execute("INSERT INTO users (name, age) VALUES ('Bob', 40)")?;
                Ok(tx.connection_id())
            })
            .unwrap();
        assert!(id > 0);
        assert_eq!(db.query("SELECT * FROM users").unwrap().len(), 1);
    }

    #[test]
    fn test_escape() {
        let (_dir, db) = database();
        assert_eq!(db.escape("it's").unwrap(), "it''s");
    }
}
