//! # Rust Database Pool
//!
//! A client-side database access library: a blocking connection pool,
//! prepared statements with positional binding, typed result decoding,
//! scoped transactions and a worker-thread facade for asynchronous calls.
//!
//! ## Features
//!
//! - **Connection Pooling**: blocking `acquire`/`release` with health checks,
//!   dead-connection replacement and an optional acquire timeout
//! - **Type Safety**: closed value model shared by binding and decoding
//! - **Transaction Management**: guards that roll back when dropped
//! - **Async Support**: queued calls return handles that can be awaited or waited on
//! - **Driver Boundary**: the pool never names a concrete database; SQLite ships bundled
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rust_database_pool = { version = "0.1", features = ["sqlite"] }
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use rust_database_pool::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = ConnectionConfig::new()
//!         .with_database("app.db")
//!         .with_pool_size(4);
//!     let db = Database::sqlite(config)?;
//!
//!     db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!     db.execute_with_params("INSERT INTO users (name) VALUES (?)", &["Alice".into()])?;
//!
//!     for row in db.query("SELECT * FROM users")? {
//!         println!("User: {}", row.value("name")?.as_string());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Working with Transactions
//!
//! ```rust,no_run
//! use rust_database_pool::prelude::*;
//!
//! fn transfer(db: &Database) -> Result<()> {
//!     db.transaction(|tx| {
//!         tx.execute("UPDATE accounts SET balance = balance - 100 WHERE id = 1")?;
//!         tx.execute("UPDATE accounts SET balance = balance + 100 WHERE id = 2")?;
//!         Ok(())
//!     })
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_database_pool/
//! ├── src/
//! │   ├── core/              # Driver-independent types and logic
//! │   │   ├── config.rs      # Connection, pool and worker settings
//! │   │   ├── connection.rs  # One session behind a lock
//! │   │   ├── database.rs    # Facade: sync, async, transactions, batch insert
//! │   │   ├── decode.rs      # Wire cell -> value mapping
//! │   │   ├── driver.rs      # Driver / Session traits and wire types
//! │   │   ├── error.rs       # Error types
//! │   │   ├── pool.rs        # Blocking connection pool
//! │   │   ├── statement.rs   # Prepared statements
//! │   │   ├── transaction.rs # Transaction guard
//! │   │   ├── value.rs       # Value types
//! │   │   └── worker.rs      # Worker threads and query handles
//! │   ├── backends/
//! │   │   └── sqlite.rs      # SQLite driver
//! │   └── lib.rs
//! ├── demos/                 # Example programs
//! ├── tests/                 # Integration tests
//! └── benches/               # Criterion benchmarks
//! ```
//!
//! Logging goes through `tracing`; install a subscriber to see it.

/// Core database access types
pub mod core;

/// Database backend implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_database_pool::prelude::*;
///
/// let config = ConnectionConfig::new().with_database(":memory:");
/// assert!(config.validate().is_ok());
/// ```
pub mod prelude {
    pub use crate::core::{
        Connection, ConnectionConfig, ConnectionPool, Database, DatabaseError, DatabaseResult,
        DatabaseRow, DatabaseValue, Driver, PoolStats, PooledConnection, PreparedStatement,
        QueryHandle, QueryResult, Result, RowExt, Transaction,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backends::SqliteDriver;
}

// Re-export at root level for convenience
pub use core::{
    Connection, ConnectionConfig, ConnectionPool, Database, DatabaseError, DatabaseResult,
    DatabaseRow, DatabaseValue, QueryResult, Result, Transaction,
};

#[cfg(feature = "sqlite")]
pub use backends::SqliteDriver;
