//! Database backend implementations
//!
//! Concrete [`crate::core::Driver`] implementations.

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDriver, SqliteSession};
