//! Scripted in-memory driver for pool and facade tests
//!
//! Statements are not interpreted. `SELECT` returns rows (plain queries a
//! single `value` column, prepared statements echo their parameters), every
//! other statement reports one affected row per `(?` group.

#![allow(dead_code)]

use parking_lot::Mutex;
use rust_database_pool::core::{
    BindParam, ColumnMeta, ColumnType, Driver, DriverError, PreparedHandle, Session, StatementId,
    WireCell, WireResult,
};
use rust_database_pool::{ConnectionConfig, DatabaseValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct MockState {
    connects: AtomicUsize,
    closes: AtomicUsize,
    connect_failures: AtomicUsize,
    refuse_all: AtomicBool,
    sessions: Mutex<Vec<Arc<AtomicBool>>>,
    failing_sql: Mutex<Vec<String>>,
    log: Mutex<Vec<String>>,
    bound: Mutex<Vec<usize>>,
}

#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn Driver> {
        Arc::new(self.clone())
    }

    /// Sessions successfully opened so far
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Sessions closed so far
    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Make the next `n` connection attempts fail
    pub fn fail_next_connects(&self, n: usize) {
        self.state.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Refuse every connection attempt until called with `false`
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse_all.store(refuse, Ordering::SeqCst);
    }

    /// Make every open session fail its ping
    pub fn kill_all(&self) {
        for alive in self.state.sessions.lock().iter() {
            alive.store(false, Ordering::SeqCst);
        }
    }

    /// Statements starting with `prefix` fail
    pub fn fail_statements(&self, prefix: &str) {
        self.state.failing_sql.lock().push(prefix.to_string());
    }

    /// Every statement run, in order
    pub fn log(&self) -> Vec<String> {
        self.state.log.lock().clone()
    }

    /// Parameter counts of every prepared execution, in order
    pub fn bound_counts(&self) -> Vec<usize> {
        self.state.bound.lock().clone()
    }
}

impl Driver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn connect(&self, _config: &ConnectionConfig) -> Result<Box<dyn Session>, DriverError> {
        if self.state.refuse_all.load(Ordering::SeqCst) {
            return Err(DriverError::connect("connection refused", 2003));
        }
        let remaining = self.state.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state
                .connect_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(DriverError::connect("connection refused", 2003));
        }

        let alive = Arc::new(AtomicBool::new(true));
        self.state.sessions.lock().push(Arc::clone(&alive));
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            alive,
            statements: HashMap::new(),
            next_statement: 1,
            last_error: None,
        }))
    }
}

struct MockSession {
    state: Arc<MockState>,
    alive: Arc<AtomicBool>,
    statements: HashMap<u64, (String, usize)>,
    next_statement: u64,
    last_error: Option<DriverError>,
}

impl MockSession {
    fn run(&mut self, sql: &str) -> Result<(), DriverError> {
        self.state.log.lock().push(sql.to_string());
        let failing = self
            .state
            .failing_sql
            .lock()
            .iter()
            .any(|prefix| sql.starts_with(prefix.as_str()));
        if failing || !self.alive.load(Ordering::SeqCst) {
            let err = DriverError::statement(format!("statement failed: {sql}"), 1064);
            self.last_error = Some(err.clone());
            return Err(err);
        }
        Ok(())
    }
}

fn is_select(sql: &str) -> bool {
    sql.trim_start().to_ascii_uppercase().starts_with("SELECT")
}

fn modified(sql: &str) -> WireResult {
    WireResult::Modified {
        affected_rows: sql.matches("(?").count().max(1) as u64,
        last_insert_id: 0,
    }
}

fn echo_cell(value: &DatabaseValue) -> WireCell {
    match value {
        DatabaseValue::Null => WireCell::Null,
        DatabaseValue::Int(v) => WireCell::Int(i64::from(*v)),
        DatabaseValue::Long(v) => WireCell::Int(*v),
        DatabaseValue::Double(v) => WireCell::Double(*v),
        DatabaseValue::String(v) => WireCell::Text(v.clone().into_bytes()),
        DatabaseValue::Bytes(v) => WireCell::Bytes(v.clone()),
    }
}

impl Session for MockSession {
    fn query(&mut self, sql: &str) -> Result<WireResult, DriverError> {
        self.run(sql)?;
        if is_select(sql) {
            Ok(WireResult::Rows {
                columns: vec![ColumnMeta::new("value", ColumnType::LongLong)],
                rows: vec![vec![WireCell::Text(b"1".to_vec())]],
            })
        } else {
            Ok(modified(sql))
        }
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedHandle, DriverError> {
        let id = self.next_statement;
        self.next_statement += 1;
        let param_count = sql.matches('?').count();
        self.statements.insert(id, (sql.to_string(), param_count));
        Ok(PreparedHandle {
            id: StatementId(id),
            param_count,
        })
    }

    fn execute(&mut self, id: StatementId, params: &[BindParam]) -> Result<WireResult, DriverError> {
        let (sql, _) = self
            .statements
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DriverError::statement("unknown statement", 2030))?;
        self.run(&sql)?;
        self.state.bound.lock().push(params.len());

        if !is_select(&sql) {
            return Ok(modified(&sql));
        }
        let columns = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let meta = ColumnMeta::new(format!("p{i}"), p.column_type());
                if p.column_type() == ColumnType::Blob {
                    meta.binary()
                } else {
                    meta
                }
            })
            .collect();
        let row = params.iter().map(|p| echo_cell(p.value())).collect();
        Ok(WireResult::Rows {
            columns,
            rows: vec![row],
        })
    }

    fn reset(&mut self, _id: StatementId) -> Result<(), DriverError> {
        Ok(())
    }

    fn close_statement(&mut self, id: StatementId) {
        self.statements.remove(&id.0);
    }

    fn ping(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn escape(&self, raw: &str) -> String {
        raw.replace('\'', "\\'")
    }

    fn last_error(&self) -> Option<DriverError> {
        self.last_error.clone()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Configuration for a mock pool of `size` connections, keeping at most `max` idle
pub fn config(size: usize, max: usize) -> ConnectionConfig {
    ConnectionConfig::new()
        .with_database("mock")
        .with_pool_size(size)
        .with_max_pool_size(max)
        .with_worker_threads(2)
}
