//! Bound argument values and result rows.
//!
//! Statements produced by the builders carry their arguments as a flat,
//! ordered list of [`SqlValue`]s. Executors hand results back as [`Row`]s,
//! which records decode through [`FromSqlValue`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{RepoError, RepoResult};

/// A SQL argument or result value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Text (also used for UUIDs and enum-like columns).
    Text(String),
    /// Integer of any width.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Timestamp with time zone.
    Timestamp(DateTime<Utc>),
    /// JSON / JSONB document.
    Json(Value),
}

impl SqlValue {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        SqlValue::Text(s.into())
    }

    /// Wraps an optional value, mapping `None` to [`SqlValue::Null`].
    pub fn nullable<T: Into<SqlValue>>(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }

    /// Creates a text value from an optional string, treating empty strings as NULL.
    pub fn from_opt_str(value: Option<&str>) -> Self {
        match value {
            Some(s) if !s.is_empty() => SqlValue::Text(s.to_string()),
            _ => SqlValue::Null,
        }
    }

    /// Returns `true` for [`SqlValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Returns the SQL type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Text(_) => "text",
            SqlValue::Integer(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Bool(_) => "bool",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Json(_) => "json",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            SqlValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<&String> for SqlValue {
    fn from(s: &String) -> Self {
        SqlValue::Text(s.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<i32> for SqlValue {
    fn from(n: i32) -> Self {
        SqlValue::Integer(i64::from(n))
    }
}

impl From<u32> for SqlValue {
    fn from(n: u32) -> Self {
        SqlValue::Integer(i64::from(n))
    }
}

impl From<usize> for SqlValue {
    fn from(n: usize) -> Self {
        SqlValue::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for SqlValue {
    fn from(n: f64) -> Self {
        SqlValue::Float(n)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(t: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(t)
    }
}

impl From<Value> for SqlValue {
    fn from(v: Value) -> Self {
        SqlValue::Json(v)
    }
}

impl From<uuid::Uuid> for SqlValue {
    fn from(id: uuid::Uuid) -> Self {
        SqlValue::Text(id.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        SqlValue::nullable(value)
    }
}

/// Conversion from a result value into a Rust type.
pub trait FromSqlValue: Sized {
    /// Converts the value, or describes why it cannot be converted.
    fn from_sql_value(value: &SqlValue) -> Result<Self, String>;
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            other => Err(format!("expected text, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Integer(n) => Ok(*n),
            other => Err(format!("expected integer, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        let n = i64::from_sql_value(value)?;
        i32::try_from(n).map_err(|_| format!("integer {} out of range for i32", n))
    }
}

impl FromSqlValue for usize {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        let n = i64::from_sql_value(value)?;
        usize::try_from(n).map_err(|_| format!("integer {} out of range for usize", n))
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Float(n) => Ok(*n),
            SqlValue::Integer(n) => Ok(*n as f64),
            other => Err(format!("expected float, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bool(b) => Ok(*b),
            other => Err(format!("expected bool, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Timestamp(t) => Ok(*t),
            other => Err(format!("expected timestamp, found {}", other.type_name())),
        }
    }
}

impl FromSqlValue for Value {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Json(v) => Ok(v.clone()),
            SqlValue::Text(s) => serde_json::from_str(s).map_err(|e| e.to_string()),
            other => Err(format!("expected json, found {}", other.type_name())),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

/// A single result row with named, ordered columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a row. Column names and values are matched by position.
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Creates a row from `(column, value)` pairs.
    pub fn from_pairs<I, C, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<SqlValue>,
    {
        let (columns, values): (Vec<String>, Vec<SqlValue>) = pairs
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the raw values.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value of a column.
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Decodes a column into `T`.
    ///
    /// Missing columns and type mismatches are internal errors: the column
    /// list of every statement is fixed by the repository that issued it.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> RepoResult<T> {
        let value = self
            .value(column)
            .ok_or_else(|| RepoError::internal(format!("column {} not found in result", column)))?;
        T::from_sql_value(value)
            .map_err(|e| RepoError::internal(format!("while decoding column {}: {}", column, e)))
    }

    /// Decodes a column by position.
    pub fn get_at<T: FromSqlValue>(&self, idx: usize) -> RepoResult<T> {
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| RepoError::internal(format!("column index {} out of range", idx)))?;
        T::from_sql_value(value)
            .map_err(|e| RepoError::internal(format!("while decoding column {}: {}", idx, e)))
    }
}
