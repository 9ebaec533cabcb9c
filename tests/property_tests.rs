//! Property-based tests for DatabaseValue, row decoding and pool capacity using proptest

mod common;

use common::MockDriver;
use proptest::prelude::*;
use rust_database_pool::core::decode::{decode_cell, render_double};
use rust_database_pool::core::{ColumnMeta, ColumnType, Connection, ConnectionPool, WireCell};
use rust_database_pool::prelude::*;
use std::sync::Arc;

// ============================================================================
// DatabaseValue Roundtrip Tests
// ============================================================================

proptest! {
    /// Test that Int values roundtrip correctly
    #[test]
    fn test_int_roundtrip(value in any::<i32>()) {
        let db_val = DatabaseValue::from(value);
        assert_eq!(db_val.as_int(), Some(value));
        assert_eq!(db_val.get::<i32>().unwrap(), value);
        assert!(!db_val.is_null());
        assert_eq!(db_val.type_name(), "int");
    }

    /// Test that Long values roundtrip correctly
    #[test]
    fn test_long_roundtrip(value in any::<i64>()) {
        let db_val = DatabaseValue::from(value);
        assert_eq!(db_val.as_long(), Some(value));
        assert_eq!(db_val.get::<i64>().unwrap(), value);
        assert!(!db_val.is_null());
        assert_eq!(db_val.type_name(), "long");
    }

    /// Test that Double values roundtrip correctly (excluding NaN and infinities)
    #[test]
    fn test_double_roundtrip(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let db_val = DatabaseValue::from(value);
        assert_eq!(db_val.as_double(), Some(value));
        assert!(!db_val.is_null());
        assert_eq!(db_val.type_name(), "double");
    }

    /// Test that String values roundtrip correctly
    #[test]
    fn test_string_roundtrip(value in ".*") {
        let db_val = DatabaseValue::from(value.clone());
        assert_eq!(db_val.as_string(), value.clone());
        assert_eq!(db_val.as_str(), Some(value.as_str()));
        assert!(!db_val.is_null());
        assert_eq!(db_val.type_name(), "string");
    }

    /// Test that Bytes values roundtrip correctly
    #[test]
    fn test_bytes_roundtrip(value in prop::collection::vec(any::<u8>(), 0..1000)) {
        let db_val = DatabaseValue::from(value.clone());
        assert_eq!(db_val.as_bytes(), Some(value.as_slice()));
        assert!(!db_val.is_null());
        assert_eq!(db_val.type_name(), "bytes");
    }
}

// ============================================================================
// Type Conversion Tests
// ============================================================================

proptest! {
    /// Test that Int to Long conversion works
    #[test]
    fn test_int_to_long_conversion(value in any::<i32>()) {
        let db_val = DatabaseValue::from(value);
        assert_eq!(db_val.as_long(), Some(value as i64));
    }

    /// Test that Int to Double conversion works
    #[test]
    fn test_int_to_double_conversion(value in any::<i32>()) {
        let db_val = DatabaseValue::from(value);
        let as_double = db_val.as_double().unwrap();
        assert!((as_double - value as f64).abs() < 1e-10);
    }

    /// Test that strict extraction rejects other variants
    #[test]
    fn test_strict_extraction_rejects_mismatch(value in any::<i64>()) {
        let db_val = DatabaseValue::from(value);
        assert!(db_val.get::<String>().is_err());
        assert!(db_val.get::<f64>().is_err());
        assert_eq!(db_val.get::<Option<i64>>().unwrap(), Some(value));
    }

    /// Test that any value can be converted to string (no panic)
    #[test]
    fn test_to_string_never_panics(value in prop_oneof![
        any::<i32>().prop_map(DatabaseValue::from),
        any::<i64>().prop_map(DatabaseValue::from),
        any::<f64>().prop_filter("finite", |v| v.is_finite()).prop_map(DatabaseValue::from),
        ".*".prop_map(DatabaseValue::from),
    ]) {
        let _ = value.as_string();
    }
}

// ============================================================================
// Decoding Tests
// ============================================================================

proptest! {
    /// Text and binary protocol cells decode to the same value
    #[test]
    fn test_integer_protocols_agree(value in any::<i64>()) {
        let column = ColumnMeta::new("n", ColumnType::LongLong);
        let text = decode_cell(&column, WireCell::Text(value.to_string().into_bytes())).unwrap();
        let binary = decode_cell(&column, WireCell::Int(value)).unwrap();
        assert_eq!(text, binary);
        assert_eq!(text, DatabaseValue::Long(value));
    }

    /// Narrow integer columns widen only when the value does not fit
    #[test]
    fn test_narrow_integer_widening(value in any::<i64>()) {
        let column = ColumnMeta::new("n", ColumnType::Long);
        let decoded = decode_cell(&column, WireCell::Int(value)).unwrap();
        match i32::try_from(value) {
            Ok(narrow) => assert_eq!(decoded, DatabaseValue::Int(narrow)),
            Err(_) => assert_eq!(decoded, DatabaseValue::Long(value)),
        }
    }

    /// Test that Double text decodes to the same value as the binary cell
    #[test]
    fn test_double_protocols_agree(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let column = ColumnMeta::new("d", ColumnType::Double);
        let text = decode_cell(&column, WireCell::Text(value.to_string().into_bytes())).unwrap();
        let binary = decode_cell(&column, WireCell::Double(value)).unwrap();
        assert_eq!(text, binary);
    }

    /// A float stored in an integer column decodes alike under both protocols
    #[test]
    fn test_float_in_integer_column_agrees(
        value in any::<f64>().prop_filter("finite", |v| v.is_finite()),
        ty in prop_oneof![Just(ColumnType::Long), Just(ColumnType::LongLong)],
    ) {
        let column = ColumnMeta::new("q", ty);
        let text = decode_cell(&column, WireCell::Text(render_double(value).into_bytes())).unwrap();
        let binary = decode_cell(&column, WireCell::Double(value)).unwrap();
        assert_eq!(text, binary);
        assert_eq!(binary, DatabaseValue::Double(value));
    }

    /// Non-numeric text stored in a numeric column comes back as a string
    #[test]
    fn test_non_numeric_text_in_numeric_column(
        value in "[a-zA-Z_][a-zA-Z0-9_ ]{0,16}"
            .prop_filter("not a float literal", |s| s.trim().parse::<f64>().is_err()),
        ty in prop_oneof![
            Just(ColumnType::Tiny),
            Just(ColumnType::Long),
            Just(ColumnType::LongLong),
            Just(ColumnType::Double),
        ],
    ) {
        let column = ColumnMeta::new("q", ty);
        let decoded = decode_cell(&column, WireCell::Text(value.clone().into_bytes())).unwrap();
        assert_eq!(decoded, DatabaseValue::String(value));
    }

    /// Binary columns keep their bytes verbatim, embedded NULs included
    #[test]
    fn test_binary_column_preserves_bytes(value in prop::collection::vec(any::<u8>(), 0..256)) {
        let column = ColumnMeta::new("b", ColumnType::Blob).binary();
        let decoded = decode_cell(&column, WireCell::Bytes(value.clone())).unwrap();
        assert_eq!(decoded, DatabaseValue::Bytes(value));
    }

    /// Decoding garbage never panics
    #[test]
    fn test_decode_never_panics(
        bytes in prop::collection::vec(any::<u8>(), 0..64),
        ty in prop_oneof![
            Just(ColumnType::Tiny),
            Just(ColumnType::Long),
            Just(ColumnType::LongLong),
            Just(ColumnType::Double),
            Just(ColumnType::NewDecimal),
            Just(ColumnType::VarString),
        ],
    ) {
        let column = ColumnMeta::new("x", ty);
        let _ = decode_cell(&column, WireCell::Text(bytes));
    }
}

// ============================================================================
// Null Handling Tests
// ============================================================================

proptest! {
    /// Test that Option<T>::None creates Null values
    #[test]
    fn test_null_from_none(_value in 0..100u32) {
        let db_val = DatabaseValue::from(Option::<i32>::None);
        assert!(db_val.is_null());
        assert_eq!(db_val.type_name(), "null");
        assert_eq!(db_val.as_int(), None);
        assert_eq!(db_val.as_string(), "null");
    }

    /// Test that Option<T>::Some creates non-Null values
    #[test]
    fn test_some_not_null(value in any::<i32>()) {
        let db_val = DatabaseValue::from(Some(value));
        assert!(!db_val.is_null());
        assert_eq!(db_val.as_int(), Some(value));
    }

    /// A null cell decodes to Null whatever the declared type
    #[test]
    fn test_null_cell_any_type(binary in any::<bool>(), ty in prop_oneof![
        Just(ColumnType::LongLong),
        Just(ColumnType::Double),
        Just(ColumnType::Blob),
        Just(ColumnType::DateTime),
    ]) {
        let mut column = ColumnMeta::new("n", ty);
        column.binary = binary;
        assert_eq!(decode_cell(&column, WireCell::Null).unwrap(), DatabaseValue::Null);
    }
}

// ============================================================================
// DatabaseRow Tests
// ============================================================================

proptest! {
    /// Test that DatabaseRow can store and retrieve values
    #[test]
    fn test_row_operations(
        int_val in any::<i32>(),
        string_val in ".*",
        double_val in any::<f64>().prop_filter("finite", |v| v.is_finite())
    ) {
        let mut row = DatabaseRow::new();

        row.insert("int_col".to_string(), DatabaseValue::from(int_val));
        row.insert("string_col".to_string(), DatabaseValue::from(string_val.clone()));
        row.insert("double_col".to_string(), DatabaseValue::from(double_val));

        assert_eq!(row.get_as::<i32>("int_col").unwrap(), int_val);
        assert_eq!(row.get_as::<String>("string_col").unwrap(), string_val);
        assert!(row.value("double_col").unwrap().as_double().is_some());
    }

    /// Test that DatabaseRow reports missing columns
    #[test]
    fn test_row_missing_column(column_name in "[a-z]{3,10}") {
        let row = DatabaseRow::new();
        assert!(matches!(row.value(&column_name), Err(DatabaseError::ColumnNotFound(_))));
    }
}

// ============================================================================
// JSON Serialization Tests
// ============================================================================

proptest! {
    /// Test that DatabaseValue survives a JSON round trip
    #[test]
    fn test_json_roundtrip(value in prop_oneof![
        Just(DatabaseValue::Null),
        any::<i32>().prop_map(DatabaseValue::from),
        any::<i64>().prop_map(DatabaseValue::from),
        ".*".prop_map(|s: String| DatabaseValue::from(s)),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(DatabaseValue::from),
    ]) {
        let json = serde_json::to_string(&value).unwrap();
        let back: DatabaseValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}

// ============================================================================
// Pool Capacity Tests
// ============================================================================

#[derive(Debug, Clone)]
enum PoolOp {
    Acquire,
    Release,
    ReleaseForeign,
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        3 => Just(PoolOp::Acquire),
        3 => Just(PoolOp::Release),
        1 => Just(PoolOp::ReleaseForeign),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The idle set never exceeds the configured maximum
    #[test]
    fn test_pool_never_exceeds_max(
        size in 0usize..4,
        extra in 0usize..3,
        ops in prop::collection::vec(pool_op(), 0..40),
    ) {
        let max = size.max(1) + extra;
        let driver = MockDriver::new();
        let pool = ConnectionPool::new(driver.shared(), common::config(size, max)).unwrap();
        let mut held = Vec::new();

        for op in ops {
            match op {
                // only acquire when it cannot block
                PoolOp::Acquire if pool.available() > 0 => {
                    held.push(pool.acquire().unwrap());
                }
                PoolOp::Acquire => {}
                PoolOp::Release => {
                    if let Some(conn) = held.pop() {
                        pool.release(conn);
                    }
                }
                PoolOp::ReleaseForeign => {
                    let conn = Arc::new(Connection::new(driver.shared(), common::config(1, 1)));
                    conn.connect().unwrap();
                    pool.release(conn);
                }
            }
            prop_assert!(pool.size() <= max);
            prop_assert!(pool.in_use() <= held.len());
        }
    }
}
