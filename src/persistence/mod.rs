//! The persistence boundary.
//!
//! Everything the server stores goes through [`Persistence`]: a statement
//! with positional `?N` parameters in, rows as JSON objects out. The local
//! implementation runs statements against SQLite; the remote one forwards
//! them to the clinic's database service over HTTP.

mod remote;
mod schema;
mod sqlite;
pub mod versioned_schema;

pub use remote::RemotePersistence;
pub use sqlite::SqlitePersistence;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(value as i64)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Text(crate::normalize::format_date(&value))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database service responded with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("database service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database connection lock poisoned")]
    LockPoisoned,

    #[error("malformed {what} row: {reason}")]
    Decode { what: &'static str, reason: String },
}

impl StorageError {
    /// Status reported by the remote database service, when that is where the
    /// failure came from.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            StorageError::Upstream { status, .. } => Some(*status),
            StorageError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Runs a single statement.
    async fn execute(&self, statement: &Statement) -> Result<QueryResult, StorageError>;

    /// Runs every statement or none of them.
    async fn execute_in_transaction(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<QueryResult>, StorageError>;

    /// Short name used in logs and the server stats.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_values_become_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(3i64)), SqlValue::Integer(3));
        assert_eq!(SqlValue::from(true), SqlValue::Integer(1));
        assert_eq!(
            SqlValue::from(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            SqlValue::Text("2024-01-05".to_string())
        );
    }

    #[test]
    fn statement_wire_format() {
        let statement = Statement::new(
            "SELECT * FROM person WHERE pcode = ?1 AND pname = ?2",
            vec![SqlValue::Integer(1), SqlValue::Null],
        );
        let value = serde_json::to_value(&statement).unwrap();
        assert_eq!(
            value,
            json!({"sql": "SELECT * FROM person WHERE pcode = ?1 AND pname = ?2", "params": [1, null]})
        );
        let back: Statement = serde_json::from_value(value).unwrap();
        assert_eq!(back, statement);
    }

    #[test]
    fn query_result_uses_row_count_key() {
        let result: QueryResult =
            serde_json::from_value(json!({"rows": [{"pcode": 1}], "rowCount": 1})).unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0]["pcode"], json!(1));
    }
}
