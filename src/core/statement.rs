//! Prepared statements with positional binding

use super::connection::Connection;
use super::driver::{BindParam, PreparedHandle};
use super::error::{DatabaseError, Result};
use super::value::{DatabaseResult, DatabaseValue, QueryResult};

/// A compiled statement owned by its [`Connection`].
///
/// Binding is positional and append-only: the n-th `bind` fills the n-th
/// placeholder. Executing with a different number of bound values than the
/// statement declares fails with [`DatabaseError::BindMismatch`]. Bound values
/// are kept across executions until [`PreparedStatement::reset`].
///
/// # Example
///
/// ```no_run
/// # use rust_database_pool::prelude::*;
/// # fn run(conn: &Connection) -> Result<()> {
/// let mut stmt = conn.prepare("INSERT INTO users (name, age) VALUES (?, ?)")?;
/// stmt.bind("Alice").bind(30);
/// let affected = stmt.execute_update()?;
/// # Ok(())
/// # }
/// ```
pub struct PreparedStatement<'c> {
    conn: &'c Connection,
    sql: String,
    handle: PreparedHandle,
    params: Vec<BindParam>,
}

impl<'c> PreparedStatement<'c> {
    pub(crate) fn new(conn: &'c Connection, sql: &str, handle: PreparedHandle) -> Self {
        Self {
            conn,
            sql: sql.to_string(),
            handle,
            params: Vec::with_capacity(handle.param_count),
        }
    }

    /// Bind the next positional parameter
    pub fn bind<T: Into<DatabaseValue>>(&mut self, value: T) -> &mut Self {
        self.params.push(BindParam::new(value.into()));
        self
    }

    /// Bind a borrowed value as the next parameter
    pub fn bind_value(&mut self, value: &DatabaseValue) -> &mut Self {
        self.params.push(BindParam::new(value.clone()));
        self
    }

    /// Bind SQL NULL as the next parameter
    pub fn bind_null(&mut self) -> &mut Self {
        self.params.push(BindParam::null());
        self
    }

    /// Bind every value of `values` in order
    pub fn bind_all<I, T>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<DatabaseValue>,
    {
        self.params
            .extend(values.into_iter().map(|v| BindParam::new(v.into())));
        self
    }

    /// SQL text this statement was compiled from
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of placeholders the statement expects
    pub fn param_count(&self) -> usize {
        self.handle.param_count
    }

    /// Number of values bound so far
    pub fn bound_count(&self) -> usize {
        self.params.len()
    }

    /// Bind descriptors in position order
    pub fn params(&self) -> &[BindParam] {
        &self.params
    }

    /// Execute with the bound values
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::BindMismatch`] when the bound count differs
    /// from [`PreparedStatement::param_count`], otherwise any driver failure.
    pub fn execute(&mut self) -> Result<QueryResult> {
        if self.params.len() != self.handle.param_count {
            return Err(DatabaseError::bind_mismatch(
                self.handle.param_count,
                self.params.len(),
            ));
        }
        self.conn.execute_statement(&self.handle, &self.params)
    }

    /// Execute and return the decoded rows
    pub fn execute_query(&mut self) -> Result<DatabaseResult> {
        Ok(self.execute()?.into_rows())
    }

    /// Execute and return the affected-row count
    pub fn execute_update(&mut self) -> Result<u64> {
        Ok(self.execute()?.affected_rows())
    }

    /// Drop the bound values and reset the native statement for rebinding
    pub fn reset(&mut self) -> Result<()> {
        self.params.clear();
        self.conn.reset_statement(self.handle.id)
    }
}

impl Drop for PreparedStatement<'_> {
    fn drop(&mut self) {
        self.conn.close_statement(self.handle.id);
    }
}

impl std::fmt::Debug for PreparedStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("sql", &self.sql)
            .field("param_count", &self.handle.param_count)
            .field("bound", &self.params.len())
            .finish()
    }
}
