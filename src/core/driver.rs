//! Native driver boundary
//!
//! The pool, connection and statement layers talk to a database exclusively
//! through the object-safe [`Driver`] and [`Session`] traits defined here.
//! A driver hands back raw wire data ([`WireResult`]) tagged with declared
//! column types; turning that into [`DatabaseValue`]s is done by
//! [`crate::core::decode`], so every backend gets the same type mapping.

use super::config::ConnectionConfig;
use super::value::DatabaseValue;

/// Stage at which a driver call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Session establishment
    Connect,
    /// Statement compilation, binding or execution
    Statement,
    /// Buffering or fetching the result of a statement that already ran
    Result,
}

/// Error reported by a native driver: its last error message and code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
    pub code: i32,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>, code: i32) -> Self {
        Self {
            kind,
            message: message.into(),
            code,
        }
    }

    pub fn connect(message: impl Into<String>, code: i32) -> Self {
        Self::new(DriverErrorKind::Connect, message, code)
    }

    pub fn statement(message: impl Into<String>, code: i32) -> Self {
        Self::new(DriverErrorKind::Statement, message, code)
    }

    pub fn result(message: impl Into<String>, code: i32) -> Self {
        Self::new(DriverErrorKind::Result, message, code)
    }
}

/// Declared wire type of a result column or bind parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Decimal,
    Tiny,
    Short,
    Long,
    Float,
    Double,
    Null,
    Timestamp,
    LongLong,
    Int24,
    Date,
    Time,
    DateTime,
    Year,
    VarChar,
    Bit,
    Json,
    NewDecimal,
    Enum,
    Set,
    TinyBlob,
    MediumBlob,
    LongBlob,
    Blob,
    VarString,
    String,
    Geometry,
}

impl ColumnType {
    /// Wire type used when binding `value` as a parameter
    pub fn for_value(value: &DatabaseValue) -> Self {
        match value {
            DatabaseValue::Null => ColumnType::Null,
            DatabaseValue::Int(_) => ColumnType::Long,
            DatabaseValue::Long(_) => ColumnType::LongLong,
            DatabaseValue::Double(_) => ColumnType::Double,
            DatabaseValue::String(_) => ColumnType::String,
            DatabaseValue::Bytes(_) => ColumnType::Blob,
        }
    }

    /// Whether the type belongs to the integer family
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Tiny
                | ColumnType::Short
                | ColumnType::Int24
                | ColumnType::Long
                | ColumnType::LongLong
        )
    }

    /// Whether the type belongs to the floating-point family
    pub fn is_float(&self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Double)
    }

    /// Whether the type belongs to the blob family
    pub fn is_blob(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyBlob | ColumnType::MediumBlob | ColumnType::LongBlob | ColumnType::Blob
        )
    }
}

/// Metadata of one result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
    /// Column carries raw bytes rather than character data
    pub binary: bool,
    /// Integer column declared UNSIGNED
    pub unsigned: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            binary: false,
            unsigned: false,
        }
    }

    /// Mark the column as binary
    #[must_use]
    pub fn binary(mut self) -> Self {
        self.binary = true;
        self
    }

    /// Mark the column as unsigned
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }
}

/// One raw cell as delivered by the driver.
///
/// The text protocol only produces `Null` and `Text`; the binary protocol
/// delivers numeric cells already typed.
#[derive(Debug, Clone, PartialEq)]
pub enum WireCell {
    Null,
    Text(Vec<u8>),
    Int(i64),
    Double(f64),
    Bytes(Vec<u8>),
}

/// Raw outcome of one statement
#[derive(Debug, Clone, PartialEq)]
pub enum WireResult {
    /// Statement produced result columns; every row has one cell per column
    Rows {
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<WireCell>>,
    },
    /// Statement produced no result columns
    Modified {
        affected_rows: u64,
        last_insert_id: u64,
    },
}

/// Driver-assigned identifier of a prepared statement within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(pub u64);

/// A compiled statement as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedHandle {
    pub id: StatementId,
    /// Number of placeholders the statement expects
    pub param_count: usize,
}

/// Positional bind descriptor: wire type, value buffer and null indicator
#[derive(Debug, Clone, PartialEq)]
pub struct BindParam {
    column_type: ColumnType,
    value: DatabaseValue,
}

impl BindParam {
    pub fn new(value: DatabaseValue) -> Self {
        Self {
            column_type: ColumnType::for_value(&value),
            value,
        }
    }

    /// Descriptor with the null indicator set and no buffer
    pub fn null() -> Self {
        Self::new(DatabaseValue::Null)
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn value(&self) -> &DatabaseValue {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Length in bytes of the bound buffer
    pub fn buffer_length(&self) -> usize {
        match &self.value {
            DatabaseValue::Null => 0,
            DatabaseValue::Int(_) => std::mem::size_of::<i32>(),
            DatabaseValue::Long(_) => std::mem::size_of::<i64>(),
            DatabaseValue::Double(_) => std::mem::size_of::<f64>(),
            DatabaseValue::String(s) => s.len(),
            DatabaseValue::Bytes(b) => b.len(),
        }
    }
}

/// A live native session.
///
/// Sessions are used by one thread at a time; [`crate::core::Connection`]
/// serializes access behind its lock.
pub trait Session: Send {
    /// Run a non-parameterized statement over the text protocol
    fn query(&mut self, sql: &str) -> Result<WireResult, DriverError>;

    /// Compile a statement and report its placeholder count
    fn prepare(&mut self, sql: &str) -> Result<PreparedHandle, DriverError>;

    /// Bind `params` positionally and execute over the binary protocol
    fn execute(&mut self, id: StatementId, params: &[BindParam])
        -> Result<WireResult, DriverError>;

    /// Reset a statement so it can be rebound
    fn reset(&mut self, id: StatementId) -> Result<(), DriverError>;

    /// Release the native statement handle
    fn close_statement(&mut self, id: StatementId);

    /// Liveness probe; never reconnects
    fn ping(&mut self) -> bool;

    /// Escape `raw` for literal inclusion in SQL text
    fn escape(&self, raw: &str) -> String;

    /// Most recent error reported on this session
    fn last_error(&self) -> Option<DriverError>;

    /// Tear down the session
    fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Factory for native sessions
pub trait Driver: Send + Sync {
    /// Short driver name used in logs
    fn name(&self) -> &'static str;

    /// Open a session using `config`
    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, DriverError>;

    /// Statement that opens a transaction in this driver's dialect
    fn begin_transaction_sql(&self) -> &'static str {
        "START TRANSACTION"
    }
}
