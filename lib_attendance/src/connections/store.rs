//! # Relational Store
//!
//! Opaque parameterized SELECT/INSERT/UPDATE against one of the named logical
//! databases. Statements use `$n` placeholders; values travel as `SqlValue`.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Hours the destination databases' clock runs behind UTC.
pub const UPLOAD_CLOCK_OFFSET_HOURS: i64 = 6;

/// Logical databases the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Database {
    /// Parameters, audit log and the dining-room monitor logs.
    Control = 1,
    /// Attendance punches (`iclock_transaction`) and employees.
    Attendance = 2,
}

impl Database {
    /// Numeric id used by the audit log and configuration.
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Database::Control => "control",
            Database::Attendance => "attendance",
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single bound parameter or decoded column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

/// One decoded row, columns in SELECT order.
pub type SqlRow = Vec<SqlValue>;

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Timestamp columns, or text holding `%Y-%m-%d %H:%M:%S[.f]`.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(ts) => Some(*ts),
            SqlValue::Text(s) => {
                NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f").ok()
            }
            _ => None,
        }
    }

    /// Renders scalar values as text, `None` for NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::Float(v) => Some(v.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            SqlValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Custom error types for database operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no pool configured for the {0} database")]
    UnknownDatabase(Database),

    #[error("failed to get a connection to the {db} database: {message}")]
    Pool { db: Database, message: String },

    #[error("query on the {db} database failed: {message}")]
    Query { db: Database, message: String },

    #[error("cannot decode column {column}: {message}")]
    Decode { column: String, message: String },
}

/// Parameterized access to the logical databases.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// First row of the result set, if any.
    async fn select_one(
        &self,
        db: Database,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<SqlRow>, StoreError>;

    async fn select_many(
        &self,
        db: Database,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<SqlRow>, StoreError>;

    /// Returns the number of inserted rows.
    async fn insert(&self, db: Database, sql: &str, params: &[SqlValue])
        -> Result<u64, StoreError>;

    /// Returns the number of updated rows.
    async fn update(&self, db: Database, sql: &str, params: &[SqlValue])
        -> Result<u64, StoreError>;
}

/// Clock the destination databases run on: UTC minus six hours, naive.
pub fn upload_clock(now: DateTime<Utc>) -> NaiveDateTime {
    (now - Duration::hours(UPLOAD_CLOCK_OFFSET_HOURS)).naive_utc()
}
