//! Row decoding shared by the text and binary protocols
//!
//! Drivers return [`WireCell`]s tagged with the declared [`ColumnMeta`]; the
//! functions here pick the [`DatabaseValue`] variant. A plain query delivers
//! textual cells that are parsed here, while a prepared statement delivers
//! numeric cells already typed. Both land on the same variant for the same
//! column type.

use super::driver::{ColumnMeta, ColumnType, WireCell, WireResult};
use super::error::{DatabaseError, Result};
use super::value::{DatabaseRow, DatabaseValue, QueryResult};

/// Decode one cell of `column`.
///
/// Numeric columns accept numeric cells of either protocol. A stored value
/// that is not numeric despite the declared type (SQLite keeps `'abc'` in an
/// `INT` column) decodes by the non-numeric rules, and a float stored in an
/// integer column decodes to `Double`, so both protocols land on the same
/// variant.
pub fn decode_cell(column: &ColumnMeta, cell: WireCell) -> Result<DatabaseValue> {
    let ty = column.column_type;
    let numeric = ty.is_integer() || ty.is_float();

    match cell {
        WireCell::Null => Ok(DatabaseValue::Null),
        WireCell::Int(v) if ty.is_integer() => Ok(integer_value(column, v)),
        WireCell::Int(v) if ty.is_float() => Ok(DatabaseValue::Double(v as f64)),
        WireCell::Double(v) if numeric => Ok(DatabaseValue::Double(v)),
        WireCell::Text(bytes) if numeric => decode_numeric_text(column, bytes),
        other => Ok(non_numeric(column, other)),
    }
}

fn integer_value(column: &ColumnMeta, raw: i64) -> DatabaseValue {
    let wide = column.column_type == ColumnType::LongLong
        || (column.column_type == ColumnType::Long && column.unsigned);
    if wide {
        return DatabaseValue::Long(raw);
    }
    // Narrow declared width, but the stored value may still exceed it
    match i32::try_from(raw) {
        Ok(v) => DatabaseValue::Int(v),
        Err(_) => DatabaseValue::Long(raw),
    }
}

fn decode_numeric_text(column: &ColumnMeta, bytes: Vec<u8>) -> Result<DatabaseValue> {
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| DatabaseError::decode(&column.name, e.to_string()))?
        .trim();

    if column.column_type.is_integer() {
        if let Ok(v) = text.parse::<i64>() {
            return Ok(integer_value(column, v));
        }
    }
    if let Ok(v) = text.parse::<f64>() {
        return Ok(DatabaseValue::Double(v));
    }
    Ok(non_numeric(column, WireCell::Text(bytes)))
}

fn non_numeric(column: &ColumnMeta, cell: WireCell) -> DatabaseValue {
    let bytes = cell_bytes(cell);
    if column.binary {
        DatabaseValue::Bytes(bytes)
    } else {
        DatabaseValue::String(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn cell_bytes(cell: WireCell) -> Vec<u8> {
    match cell {
        WireCell::Null => Vec::new(),
        WireCell::Text(bytes) | WireCell::Bytes(bytes) => bytes,
        WireCell::Int(v) => v.to_string().into_bytes(),
        WireCell::Double(v) => render_double(v).into_bytes(),
    }
}

/// Text form of a floating-point value as the text protocol carries it.
///
/// Integral values keep their fraction (`3.0`), so the text never reads back
/// as an integer.
pub fn render_double(v: f64) -> String {
    format!("{v:?}")
}

/// Decode one row; each column name maps to its decoded value
pub fn decode_row(columns: &[ColumnMeta], cells: Vec<WireCell>) -> Result<DatabaseRow> {
    let mut row = DatabaseRow::with_capacity(columns.len());
    for (column, cell) in columns.iter().zip(cells) {
        row.insert(column.name.clone(), decode_cell(column, cell)?);
    }
    Ok(row)
}

/// Decode a complete driver result, preserving row order
pub fn decode_result(result: WireResult) -> Result<QueryResult> {
    match result {
        WireResult::Modified {
            affected_rows,
            last_insert_id,
        } => Ok(QueryResult::modified(affected_rows, last_insert_id)),
        WireResult::Rows { columns, rows } => {
            let decoded = rows
                .into_iter()
                .map(|cells| decode_row(&columns, cells))
                .collect::<Result<Vec<_>>>()?;
            Ok(QueryResult::Rows(decoded))
        }
    }
}
