//! Error types for the database system
//!
//! This module defines all error types that can occur during pool, connection,
//! statement and transaction operations.

use super::driver::{DriverError, DriverErrorKind};

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Error types for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Session establishment failed
    #[error("Connection failed to {host}:{port} - {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A dead pooled connection could not be replaced
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Operation attempted on a connection without a live session
    #[error("Not connected to database")]
    NotConnected,

    /// Acquisition attempted after or during pool shutdown
    #[error("Connection pool is closed")]
    PoolClosed,

    /// No connection became idle within the configured acquire timeout
    #[error("Connection pool acquire timed out after {timeout_ms}ms")]
    PoolTimeout { timeout_ms: u64 },

    /// The driver rejected a statement
    #[error("Query failed: {message} (code {code})")]
    QueryError { message: String, code: i32 },

    /// The statement ran but its result could not be buffered
    #[error("Failed to store result: {0}")]
    ResultError(String),

    /// Statement compilation failed
    #[error("Failed to prepare statement: {message} (code {code})")]
    PrepareError { message: String, code: i32 },

    /// Number of bound parameters differs from the statement's placeholders
    #[error("Parameter count mismatch: statement expects {expected}, {bound} bound")]
    BindMismatch { expected: usize, bound: usize },

    /// A column value could not be decoded as its declared type
    #[error("Failed to decode column '{column}': {message}")]
    DecodeError { column: String, message: String },

    /// Type conversion error
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Column not found
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration document could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Work submitted after the worker threads were shut down
    #[error("Worker pool is shut down")]
    ShutDown,

    /// An asynchronous task ended without producing a result
    #[error("Asynchronous task failed: {0}")]
    TaskFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    /// Create a connection failed error with host/port details
    pub fn connection_failed(
        host: impl Into<String>,
        port: u16,
        message: impl Into<String>,
    ) -> Self {
        DatabaseError::ConnectionFailed {
            host: host.into(),
            port,
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source error
    pub fn connection_failed_with_source(
        host: impl Into<String>,
        port: u16,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        DatabaseError::ConnectionFailed {
            host: host.into(),
            port,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a connection unavailable error
    pub fn connection_unavailable<S: Into<String>>(msg: S) -> Self {
        DatabaseError::ConnectionUnavailable(msg.into())
    }

    /// Create a pool timeout error
    pub fn pool_timeout(timeout_ms: u64) -> Self {
        DatabaseError::PoolTimeout { timeout_ms }
    }

    /// Create a new query error
    pub fn query<S: Into<String>>(msg: S, code: i32) -> Self {
        DatabaseError::QueryError {
            message: msg.into(),
            code,
        }
    }

    /// Create a new prepare error
    pub fn prepare<S: Into<String>>(msg: S, code: i32) -> Self {
        DatabaseError::PrepareError {
            message: msg.into(),
            code,
        }
    }

    /// Create a bind mismatch error
    pub fn bind_mismatch(expected: usize, bound: usize) -> Self {
        DatabaseError::BindMismatch { expected, bound }
    }

    /// Create a decode error for the named column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        DatabaseError::DecodeError {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a new type mismatch error
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        DatabaseError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a new transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        DatabaseError::TransactionError(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        DatabaseError::InvalidConfig(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Other(msg.into())
    }

    /// Map a driver failure raised while running a statement.
    ///
    /// Failures reported after a successful execute become [`DatabaseError::ResultError`].
    pub(crate) fn from_statement(err: DriverError) -> Self {
        match err.kind {
            DriverErrorKind::Result => DatabaseError::ResultError(err.message),
            _ => DatabaseError::query(err.message, err.code),
        }
    }

    /// Map a driver failure raised while compiling a statement
    pub(crate) fn from_prepare(err: DriverError) -> Self {
        DatabaseError::prepare(err.message, err.code)
    }

    /// Driver error code carried by this error, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            DatabaseError::QueryError { code, .. } | DatabaseError::PrepareError { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Whether the failure comes from connection or pool state rather than the statement itself.
    ///
    /// Retrying is left to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed { .. }
                | DatabaseError::ConnectionUnavailable(_)
                | DatabaseError::NotConnected
                | DatabaseError::PoolTimeout { .. }
        )
    }
}
