//! SQLite driver
//!
//! Implements [`Driver`] and [`Session`] on top of `rusqlite`. Plain queries
//! are rendered as text cells; prepared statements return typed cells.
//! Column types come from the declared column type, or from the storage
//! classes of the values for expression columns. Blobs travel as byte cells
//! under both protocols.

use crate::core::config::ConnectionConfig;
use crate::core::driver::{
    BindParam, ColumnMeta, ColumnType, Driver, DriverError, DriverErrorKind, PreparedHandle,
    Session, StatementId, WireCell, WireResult,
};
use crate::core::decode::render_double;
use crate::core::value::DatabaseValue;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;
use std::time::Duration;

/// Factory for SQLite sessions; `config.database` is the file path
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create the driver
    pub fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Session>, DriverError> {
        let path = if config.database.is_empty() {
            ":memory:"
        } else {
            config.database.as_str()
        };

        let conn = Connection::open(path).map_err(|e| to_driver_error(&e, DriverErrorKind::Connect))?;
        conn.busy_timeout(busy_timeout(config))
            .map_err(|e| to_driver_error(&e, DriverErrorKind::Connect))?;
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(|e| to_driver_error(&e, DriverErrorKind::Connect))?;

        Ok(Box::new(SqliteSession {
            conn,
            statements: HashMap::new(),
            next_statement: 1,
            last_error: None,
        }))
    }

    fn begin_transaction_sql(&self) -> &'static str {
        "BEGIN"
    }
}

/// Which representation cells are delivered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Text,
    Binary,
}

/// One open SQLite database handle
pub struct SqliteSession {
    conn: Connection,
    statements: HashMap<u64, String>,
    next_statement: u64,
    last_error: Option<DriverError>,
}

impl SqliteSession {
    fn record<T>(&mut self, result: Result<T, DriverError>) -> Result<T, DriverError> {
        if let Err(e) = &result {
            self.last_error = Some(e.clone());
        }
        result
    }
}

impl Session for SqliteSession {
    fn query(&mut self, sql: &str) -> Result<WireResult, DriverError> {
        let result = run_statement(&self.conn, sql, &[], Protocol::Text);
        self.record(result)
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedHandle, DriverError> {
        let compiled = self
            .conn
            .prepare_cached(sql)
            .map(|stmt| stmt.parameter_count())
            .map_err(|e| to_driver_error(&e, DriverErrorKind::Statement));
        let param_count = self.record(compiled)?;

        let id = self.next_statement;
        self.next_statement += 1;
        self.statements.insert(id, sql.to_string());
        Ok(PreparedHandle {
            id: StatementId(id),
            param_count,
        })
    }

    fn execute(
        &mut self,
        id: StatementId,
        params: &[BindParam],
    ) -> Result<WireResult, DriverError> {
        let result = match self.statements.get(&id.0) {
            Some(sql) => run_statement(&self.conn, sql, params, Protocol::Binary),
            None => Err(unknown_statement(id)),
        };
        self.record(result)
    }

    fn reset(&mut self, id: StatementId) -> Result<(), DriverError> {
        // statements are reset when returned to the cache after each execution
        if self.statements.contains_key(&id.0) {
            Ok(())
        } else {
            let err = unknown_statement(id);
            self.record(Err(err))
        }
    }

    fn close_statement(&mut self, id: StatementId) {
        self.statements.remove(&id.0);
    }

    fn ping(&mut self) -> bool {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn escape(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }

    fn last_error(&self) -> Option<DriverError> {
        self.last_error.clone()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.statements.clear();
        self.conn.flush_prepared_statement_cache();
        Ok(())
    }
}

fn unknown_statement(id: StatementId) -> DriverError {
    // SQLITE_MISUSE
    DriverError::statement(format!("unknown statement handle {}", id.0), 21)
}

fn to_driver_error(err: &rusqlite::Error, kind: DriverErrorKind) -> DriverError {
    let code = match err {
        rusqlite::Error::SqliteFailure(e, _) => e.extended_code,
        _ => -1,
    };
    DriverError::new(kind, err.to_string(), code)
}

fn to_sql_value(param: &BindParam) -> Value {
    match param.value() {
        DatabaseValue::Null => Value::Null,
        DatabaseValue::Int(v) => Value::Integer(i64::from(*v)),
        DatabaseValue::Long(v) => Value::Integer(*v),
        DatabaseValue::Double(v) => Value::Real(*v),
        DatabaseValue::String(v) => Value::Text(v.clone()),
        DatabaseValue::Bytes(v) => Value::Blob(v.clone()),
    }
}

fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[BindParam],
    protocol: Protocol,
) -> Result<WireResult, DriverError> {
    let statement_error = |e: rusqlite::Error| to_driver_error(&e, DriverErrorKind::Statement);

    let mut stmt = conn.prepare_cached(sql).map_err(statement_error)?;
    let values = params.iter().map(to_sql_value);

    if stmt.column_count() == 0 {
        let affected = stmt
            .execute(params_from_iter(values))
            .map_err(statement_error)?;
        // the rowid survives later statements, so only report it for inserts
        let last_insert_id = if affected > 0 && is_insert(sql) {
            u64::try_from(conn.last_insert_rowid()).unwrap_or_default()
        } else {
            0
        };
        return Ok(WireResult::Modified {
            affected_rows: affected as u64,
            last_insert_id,
        });
    }

    let declared: Vec<(String, Option<String>)> = stmt
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
        .collect();

    let mut raw_rows: Vec<Vec<Value>> = Vec::new();
    let mut cursor = stmt.query(params_from_iter(values)).map_err(statement_error)?;
    while let Some(row) = cursor.next().map_err(statement_error)? {
        let mut cells = Vec::with_capacity(declared.len());
        for i in 0..declared.len() {
            cells.push(Value::from(row.get_ref(i).map_err(statement_error)?));
        }
        raw_rows.push(cells);
    }
    drop(cursor);

    let columns: Vec<ColumnMeta> = declared
        .into_iter()
        .enumerate()
        .map(|(i, (name, decl))| match decl {
            Some(decl) => column_for_decl(name, &decl),
            None => column_for_storage(name, raw_rows.iter().map(|r| &r[i])),
        })
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|cells| cells.into_iter().map(|v| to_wire(v, protocol)).collect())
        .collect();

    Ok(WireResult::Rows { columns, rows })
}

/// SQLite keeps the busy timeout as an `int` of milliseconds
fn busy_timeout(config: &ConnectionConfig) -> Duration {
    config
        .connect_timeout()
        .min(Duration::from_millis(i32::MAX as u64))
}

fn is_insert(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    keyword.eq_ignore_ascii_case("INSERT") || keyword.eq_ignore_ascii_case("REPLACE")
}

fn to_wire(value: Value, protocol: Protocol) -> WireCell {
    match (value, protocol) {
        (Value::Null, _) => WireCell::Null,
        (Value::Integer(v), Protocol::Binary) => WireCell::Int(v),
        (Value::Real(v), Protocol::Binary) => WireCell::Double(v),
        (Value::Integer(v), Protocol::Text) => WireCell::Text(v.to_string().into_bytes()),
        (Value::Real(v), Protocol::Text) => WireCell::Text(render_double(v).into_bytes()),
        (Value::Blob(v), _) => WireCell::Bytes(v),
        (Value::Text(v), _) => WireCell::Text(v.into_bytes()),
    }
}

/// Map a declared column type onto the wire type family
fn column_for_decl(name: String, decl: &str) -> ColumnMeta {
    let upper = decl.to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim();

    let column_type = match base {
        "INTEGER" | "BIGINT" | "INT8" | "UNSIGNED BIG INT" => ColumnType::LongLong,
        "INT" | "MEDIUMINT" => ColumnType::Long,
        "SMALLINT" => ColumnType::Short,
        "TINYINT" | "BOOLEAN" | "BOOL" => ColumnType::Tiny,
        "REAL" | "DOUBLE" | "DOUBLE PRECISION" => ColumnType::Double,
        "FLOAT" => ColumnType::Float,
        "DECIMAL" | "NUMERIC" => ColumnType::NewDecimal,
        "DATE" => ColumnType::Date,
        "DATETIME" => ColumnType::DateTime,
        "TIMESTAMP" => ColumnType::Timestamp,
        "TIME" => ColumnType::Time,
        "JSON" => ColumnType::Json,
        "BLOB" | "BINARY" | "VARBINARY" => {
            return ColumnMeta::new(name, ColumnType::Blob).binary();
        }
        other if other.contains("INT") => ColumnType::LongLong,
        other if other.contains("BLOB") => {
            return ColumnMeta::new(name, ColumnType::Blob).binary();
        }
        other if other.contains("REAL") || other.contains("FLOA") || other.contains("DOUB") => {
            ColumnType::Double
        }
        _ => ColumnType::VarString,
    };
    ColumnMeta::new(name, column_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    Integer,
    Real,
    Text,
    Blob,
}

/// Type an undeclared column by the storage classes of its non-null values.
///
/// Integers mixed with reals read as `Double`; any other mix reads as text.
fn column_for_storage<'a>(name: String, values: impl Iterator<Item = &'a Value>) -> ColumnMeta {
    let mut seen: Option<Storage> = None;
    for value in values {
        let class = match value {
            Value::Null => continue,
            Value::Integer(_) => Storage::Integer,
            Value::Real(_) => Storage::Real,
            Value::Text(_) => Storage::Text,
            Value::Blob(_) => Storage::Blob,
        };
        seen = Some(match (seen, class) {
            (None, class) => class,
            (Some(prev), class) if prev == class => class,
            (Some(Storage::Integer | Storage::Real), Storage::Integer | Storage::Real) => {
                Storage::Real
            }
            _ => Storage::Text,
        });
        if seen == Some(Storage::Text) {
            break;
        }
    }

    match seen {
        Some(Storage::Integer) => ColumnMeta::new(name, ColumnType::LongLong),
        Some(Storage::Real) => ColumnMeta::new(name, ColumnType::Double),
        Some(Storage::Blob) => ColumnMeta::new(name, ColumnType::Blob).binary(),
        Some(Storage::Text) => ColumnMeta::new(name, ColumnType::VarString),
        None => ColumnMeta::new(name, ColumnType::Null),
    }
}
