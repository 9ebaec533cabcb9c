//! Transaction guard for automatic rollback on drop
//!
//! A [`Transaction`] keeps its pooled connection checked out for its whole
//! lifetime. Dropping it without `commit()` or `rollback()` rolls back, and
//! the connection always goes back to the pool afterwards.

use super::error::Result;
use super::pool::PooledConnection;
use super::statement::PreparedStatement;
use super::value::{DatabaseResult, DatabaseValue};

/// Transaction guard that rolls back on drop if not finished
///
/// # Example
///
/// ```no_run
/// # use rust_database_pool::prelude::*;
/// # fn transfer(db: &Database) -> Result<()> {
/// let tx = db.begin_transaction()?;
/// tx.execute("UPDATE accounts SET balance = balance - 100 WHERE id = 1")?;
/// tx.execute("UPDATE accounts SET balance = balance + 100 WHERE id = 2")?;
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction<'a> {
    conn: PooledConnection<'a>,
    finished: bool,
}

impl<'a> Transaction<'a> {
    /// Open a transaction on `conn`
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is already in a transaction or the
    /// begin statement fails; the connection is released either way.
    pub fn begin(conn: PooledConnection<'a>) -> Result<Self> {
        conn.begin_transaction()?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Run a statement and return its rows
    pub fn query(&self, sql: &str) -> Result<DatabaseResult> {
        Ok(self.conn.query(sql)?.into_rows())
    }

    /// Run a statement and return the affected-row count
    pub fn execute(&self, sql: &str) -> Result<u64> {
        self.conn.execute(sql)
    }

    /// Run a parameterized statement and return its rows
    pub fn query_with_params(&self, sql: &str, params: &[DatabaseValue]) -> Result<DatabaseResult> {
        Ok(self.conn.query_with_params(sql, params)?.into_rows())
    }

    /// Run a parameterized statement and return the affected-row count
    pub fn execute_with_params(&self, sql: &str, params: &[DatabaseValue]) -> Result<u64> {
        self.conn.execute_with_params(sql, params)
    }

    /// Prepare a statement on the transaction's connection
    pub fn prepare(&self, sql: &str) -> Result<PreparedStatement<'_>> {
        self.conn.prepare(sql)
    }

    /// Commit the transaction
    ///
    /// On failure the connection stays marked as in-transaction and is
    /// rolled back when it returns to the pool.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn.commit()
    }

    /// Roll back the transaction
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.rollback()
    }

    /// Identifier of the connection the transaction runs on
    pub fn connection_id(&self) -> u64 {
        self.conn.id()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished || !self.conn.in_transaction() {
            return;
        }
        tracing::warn!(
            connection = self.conn.id(),
            "transaction dropped without commit or rollback, rolling back"
        );
        if let Err(e) = self.conn.rollback() {
            tracing::warn!(connection = self.conn.id(), error = %e, "implicit rollback failed");
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("connection", &self.conn.id())
            .field("finished", &self.finished)
            .finish()
    }
}
