//! The active database handle.
//!
//! Repository primitives never open connections. They are handed an
//! [`Executor`] (a pooled connection, a transaction, or a test double) and run
//! every round trip of an operation on it, one after another.

use std::fmt;

use async_trait::async_trait;

use crate::query::{Row, SqlValue};

/// How a driver failure should be classified before looking at its SQLSTATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// A single-row fetch found no row.
    NoRows,
    /// The statement was cancelled (timeout or caller cancellation).
    Cancelled,
    /// Anything else; classified by SQLSTATE code.
    Other,
}

/// The only error an [`Executor`] may return.
#[derive(Debug, Clone)]
pub struct DriverError {
    /// Five-character SQLSTATE, when the server reported one.
    pub code: Option<String>,
    /// Raw driver message. Logged, never shown to callers.
    pub message: String,
    /// Violated constraint name, if any.
    pub constraint: Option<String>,
    /// Offending column, if any.
    pub column: Option<String>,
    /// Coarse classification.
    pub kind: DriverErrorKind,
}

impl DriverError {
    /// A "no rows in result set" error.
    pub fn no_rows() -> Self {
        Self {
            code: None,
            message: "no rows in result set".to_string(),
            constraint: None,
            column: None,
            kind: DriverErrorKind::NoRows,
        }
    }

    /// A cancelled statement.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            constraint: None,
            column: None,
            kind: DriverErrorKind::Cancelled,
        }
    }

    /// A server error with a SQLSTATE code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            constraint: None,
            column: None,
            kind: DriverErrorKind::Other,
        }
    }

    /// Any other failure (I/O, protocol, conversion).
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            constraint: None,
            column: None,
            kind: DriverErrorKind::Other,
        }
    }

    /// Attaches the violated constraint name.
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Attaches the offending column name.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (SQLSTATE {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// A parameterized statement runner.
///
/// Statements use `$N` placeholders and receive their arguments as a flat,
/// ordered slice. Implementations must not retry.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs a statement that returns rows.
    async fn query(&self, statement: &str, args: &[SqlValue]) -> Result<Vec<Row>, DriverError>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, statement: &str, args: &[SqlValue]) -> Result<u64, DriverError>;

    /// Runs a statement that must return exactly one row.
    ///
    /// An empty result is reported as [`DriverErrorKind::NoRows`].
    async fn query_one(&self, statement: &str, args: &[SqlValue]) -> Result<Row, DriverError> {
        self.query(statement, args)
            .await?
            .into_iter()
            .next()
            .ok_or_else(DriverError::no_rows)
    }
}
