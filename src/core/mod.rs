//! Core database access types
//!
//! This module provides the driver-independent building blocks: the value
//! model, errors, configuration, the native driver boundary, connections,
//! prepared statements, the connection pool, transactions, async workers and
//! the [`Database`] facade tying them together.

pub mod config;
pub mod connection;
pub mod database;
pub mod decode;
pub mod driver;
pub mod error;
pub mod pool;
pub mod statement;
pub mod transaction;
pub mod value;
pub mod worker;

// Re-export commonly used types
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use database::Database;
pub use driver::{
    BindParam, ColumnMeta, ColumnType, Driver, DriverError, DriverErrorKind, PreparedHandle,
    Session, StatementId, WireCell, WireResult,
};
pub use error::{DatabaseError, Result};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use statement::PreparedStatement;
pub use transaction::Transaction;
pub use value::{DatabaseResult, DatabaseRow, DatabaseValue, FromValue, QueryResult, RowExt};
pub use worker::{QueryHandle, WorkerPool};
