//! Database value types
//!
//! This module defines the closed set of values that can be bound as statement
//! parameters or decoded from result columns, and the row/result containers
//! built from them.

use super::error::{DatabaseError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Database value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Null value
    Null,
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Int(v) => Some(*v != 0),
            DatabaseValue::Long(v) => Some(*v != 0),
            DatabaseValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get the value as an i32
    pub fn as_int(&self) -> Option<i32> {
        match self {
            DatabaseValue::Int(v) => Some(*v),
            DatabaseValue::Long(v) => i32::try_from(*v).ok(),
            DatabaseValue::Double(v) => Some(*v as i32),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an i64
    pub fn as_long(&self) -> Option<i64> {
        match self {
            DatabaseValue::Long(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v as i64),
            DatabaseValue::Double(v) => Some(*v as i64),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as an f64
    pub fn as_double(&self) -> Option<f64> {
        match self {
            DatabaseValue::Double(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v as f64),
            DatabaseValue::Long(v) => Some(*v as f64),
            DatabaseValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a string (zero-copy for String values)
    ///
    /// Returns a string reference without cloning for String values.
    /// For other types, use `as_string()` which performs conversion.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as a string (with conversion)
    pub fn as_string(&self) -> String {
        match self {
            DatabaseValue::Null => "null".to_string(),
            DatabaseValue::Int(v) => v.to_string(),
            DatabaseValue::Long(v) => v.to_string(),
            DatabaseValue::Double(v) => v.to_string(),
            DatabaseValue::String(s) => s.clone(),
            DatabaseValue::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }

    /// Get the value as bytes (zero-copy)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DatabaseValue::Bytes(b) => Some(b),
            DatabaseValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Parse a DATE column value (`YYYY-MM-DD`)
    pub fn as_date(&self) -> Option<NaiveDate> {
        let text = self.as_str()?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
    }

    /// Parse a DATETIME / TIMESTAMP column value (`YYYY-MM-DD HH:MM:SS[.fraction]`)
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        let text = self.as_str()?;
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
        }
    }

    /// Extract the exact variant `T`, failing with [`DatabaseError::TypeMismatch`] otherwise
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    /// Extract the exact variant `T`, or `None` when the variant differs
    pub fn get_opt<T: FromValue>(&self) -> Option<T> {
        T::from_value(self).ok()
    }
}

/// Strict extraction of a Rust type from a [`DatabaseValue`].
///
/// Only the variant that holds `Self` natively is accepted; no numeric or
/// textual conversion is attempted.
pub trait FromValue: Sized {
    /// Convert the value or report a type mismatch
    fn from_value(value: &DatabaseValue) -> Result<Self>;
}

impl FromValue for i32 {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Int(v) => Ok(*v),
            other => Err(DatabaseError::type_mismatch("int", other.type_name())),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Long(v) => Ok(*v),
            other => Err(DatabaseError::type_mismatch("long", other.type_name())),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Double(v) => Ok(*v),
            other => Err(DatabaseError::type_mismatch("double", other.type_name())),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::String(v) => Ok(v.clone()),
            other => Err(DatabaseError::type_mismatch("string", other.type_name())),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Bytes(v) => Ok(v.clone()),
            other => Err(DatabaseError::type_mismatch("bytes", other.type_name())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(v: bool) -> Self {
        DatabaseValue::Int(v as i32)
    }
}

impl From<u8> for DatabaseValue {
    fn from(v: u8) -> Self {
        DatabaseValue::Int(v as i32)
    }
}

impl From<i16> for DatabaseValue {
    fn from(v: i16) -> Self {
        DatabaseValue::Int(v as i32)
    }
}

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Int(v)
    }
}

impl From<u32> for DatabaseValue {
    fn from(v: u32) -> Self {
        DatabaseValue::Long(v as i64)
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f32> for DatabaseValue {
    fn from(v: f32) -> Self {
        DatabaseValue::Double(v as f64)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::String(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(v: Vec<u8>) -> Self {
        DatabaseValue::Bytes(v)
    }
}

impl From<&[u8]> for DatabaseValue {
    fn from(v: &[u8]) -> Self {
        DatabaseValue::Bytes(v.to_vec())
    }
}

impl From<&DatabaseValue> for DatabaseValue {
    fn from(v: &DatabaseValue) -> Self {
        v.clone()
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// A row of database results (column name -> value mapping)
pub type DatabaseRow = HashMap<String, DatabaseValue>;

/// Multiple rows returned from a query, in cursor order
pub type DatabaseResult = Vec<DatabaseRow>;

/// Keyed accessors that report missing columns and type mismatches as errors
pub trait RowExt {
    /// Borrow the value stored under `column`
    fn value(&self, column: &str) -> Result<&DatabaseValue>;

    /// Extract the value stored under `column` as exactly `T`
    fn get_as<T: FromValue>(&self, column: &str) -> Result<T> {
        self.value(column)?.get()
    }
}

impl RowExt for DatabaseRow {
    fn value(&self, column: &str) -> Result<&DatabaseValue> {
        self.get(column)
            .ok_or_else(|| DatabaseError::ColumnNotFound(column.to_string()))
    }
}

/// Outcome of a statement.
///
/// Row-producing statements yield [`QueryResult::Rows`]; everything else
/// yields [`QueryResult::Modified`] with the affected-row count and the last
/// generated identifier. Only one interpretation is ever populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    /// Rows in the order the driver returned them
    Rows(DatabaseResult),
    /// Metadata of a mutating statement
    Modified {
        affected_rows: u64,
        last_insert_id: u64,
    },
}

impl QueryResult {
    /// Result of a mutating statement
    pub fn modified(affected_rows: u64, last_insert_id: u64) -> Self {
        QueryResult::Modified {
            affected_rows,
            last_insert_id,
        }
    }

    /// The decoded rows; empty for mutating statements
    pub fn rows(&self) -> &[DatabaseRow] {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Modified { .. } => &[],
        }
    }

    /// Take ownership of the decoded rows
    pub fn into_rows(self) -> DatabaseResult {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Modified { .. } => Vec::new(),
        }
    }

    /// Rows affected by a mutating statement; zero for row sets
    pub fn affected_rows(&self) -> u64 {
        match self {
            QueryResult::Modified { affected_rows, .. } => *affected_rows,
            QueryResult::Rows(_) => 0,
        }
    }

    /// Identifier generated by a mutating statement; zero for row sets
    pub fn last_insert_id(&self) -> u64 {
        match self {
            QueryResult::Modified { last_insert_id, .. } => *last_insert_id,
            QueryResult::Rows(_) => 0,
        }
    }

    /// Whether this result carries rows
    pub fn is_row_set(&self) -> bool {
        matches!(self, QueryResult::Rows(_))
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    /// Iterate over the rows
    pub fn iter(&self) -> std::slice::Iter<'_, DatabaseRow> {
        self.rows().iter()
    }
}

impl Default for QueryResult {
    fn default() -> Self {
        QueryResult::Rows(Vec::new())
    }
}

impl std::ops::Index<usize> for QueryResult {
    type Output = DatabaseRow;

    fn index(&self, index: usize) -> &Self::Output {
        &self.rows()[index]
    }
}

impl IntoIterator for QueryResult {
    type Item = DatabaseRow;
    type IntoIter = std::vec::IntoIter<DatabaseRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_rows().into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a DatabaseRow;
    type IntoIter = std::slice::Iter<'a, DatabaseRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
