//! Test infrastructure for the repository primitives.
//!
//! [`MockDatabase`] is a scripted [`Executor`]: each test queues the exact
//! statements it expects, with their arguments and canned results, and the
//! mock fails the test on the first statement that does not match.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;

use std::collections::VecDeque;
use std::sync::{Mutex, Once};

use async_trait::async_trait;

use tenant_persistence::query::{Row, SqlValue};
use tenant_persistence::{DriverError, Executor};

/// What an expected statement returns.
#[derive(Debug, Clone)]
pub enum MockResult {
    /// Rows for a query.
    Rows(Vec<Row>),
    /// Affected row count for an execute.
    Affected(u64),
    /// A driver failure.
    Error(DriverError),
}

/// One expected statement.
#[derive(Debug, Clone)]
pub struct Expectation {
    pub sql: String,
    pub args: Vec<SqlValue>,
    pub result: MockResult,
}

/// A scripted database handle.
#[derive(Debug, Default)]
pub struct MockDatabase {
    expectations: Mutex<VecDeque<Expectation>>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        init_tracing();
        Self::default()
    }

    /// Expects a query returning `rows`.
    pub fn expect_query(&self, sql: &str, args: Vec<SqlValue>, rows: Vec<Row>) -> &Self {
        self.push(sql, args, MockResult::Rows(rows))
    }

    /// Expects a statement affecting `affected` rows.
    pub fn expect_exec(&self, sql: &str, args: Vec<SqlValue>, affected: u64) -> &Self {
        self.push(sql, args, MockResult::Affected(affected))
    }

    /// Expects a statement failing with `err`.
    pub fn expect_error(&self, sql: &str, args: Vec<SqlValue>, err: DriverError) -> &Self {
        self.push(sql, args, MockResult::Error(err))
    }

    /// Fails the test unless every expected statement ran.
    pub fn assert_done(&self) {
        let remaining = self.expectations.lock().unwrap();
        assert!(
            remaining.is_empty(),
            "{} expected statements never ran, next: {}",
            remaining.len(),
            remaining.front().map(|e| e.sql.as_str()).unwrap_or_default()
        );
    }

    /// The statements run so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn push(&self, sql: &str, args: Vec<SqlValue>, result: MockResult) -> &Self {
        self.expectations.lock().unwrap().push_back(Expectation {
            sql: sql.to_string(),
            args,
            result,
        });
        self
    }

    fn next(&self, sql: &str, args: &[SqlValue]) -> MockResult {
        self.executed.lock().unwrap().push(sql.to_string());
        let expectation = self
            .expectations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected statement: {}", sql));
        assert_eq!(sql, expectation.sql, "statement text");
        assert_eq!(args, expectation.args.as_slice(), "arguments of {}", sql);
        expectation.result
    }
}

#[async_trait]
impl Executor for MockDatabase {
    async fn query(&self, statement: &str, args: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        match self.next(statement, args) {
            MockResult::Rows(rows) => Ok(rows),
            MockResult::Error(err) => Err(err),
            MockResult::Affected(_) => panic!("expected execute, got query: {}", statement),
        }
    }

    async fn execute(&self, statement: &str, args: &[SqlValue]) -> Result<u64, DriverError> {
        match self.next(statement, args) {
            MockResult::Affected(n) => Ok(n),
            MockResult::Error(err) => Err(err),
            MockResult::Rows(_) => panic!("expected query, got execute: {}", statement),
        }
    }
}

static TRACING: Once = Once::new();

/// Routes the crate's `tracing` output to the test writer, filtered by
/// `RUST_LOG` (e.g. `RUST_LOG=tenant_persistence=debug`).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Shorthand for a text argument.
pub fn text(s: &str) -> SqlValue {
    SqlValue::text(s)
}

/// A single-column row, as returned by `SELECT 1` probes.
pub fn one_row() -> Row {
    Row::from_pairs([("?column?", SqlValue::Integer(1))])
}

/// A `COUNT(*)` result row.
pub fn count_row(count: i64) -> Row {
    Row::from_pairs([("count", SqlValue::Integer(count))])
}
