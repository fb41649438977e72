use super::schema::CLINIC_VERSIONED_SCHEMAS;
use super::versioned_schema::open_versioned;
use super::{Persistence, QueryResult, Row, SqlValue, Statement, StorageError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(SqliteValue::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(SqliteValue::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(SqliteValue::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Local SQLite store, serialized through a single connection.
pub struct SqlitePersistence {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePersistence {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open clinic database")?;
        if is_new_db {
            info!("Creating new clinic database at {:?}", path);
        }
        open_versioned(&mut conn, CLINIC_VERSIONED_SCHEMAS, is_new_db)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        open_versioned(&mut conn, CLINIC_VERSIONED_SCHEMAS, true)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn run(conn: &Connection, statement: &Statement) -> rusqlite::Result<QueryResult> {
        let mut stmt = conn.prepare(&statement.sql)?;
        let params = params_from_iter(statement.params.iter());

        if stmt.column_count() == 0 {
            let row_count = stmt.execute(params)?;
            return Ok(QueryResult {
                rows: Vec::new(),
                row_count,
            });
        }

        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        let mut rows = Vec::new();
        let mut cursor = stmt.query(params)?;
        while let Some(row) = cursor.next()? {
            let mut out = Row::new();
            for (index, name) in names.iter().enumerate() {
                out.insert(name.clone(), to_json(row.get_ref(index)?));
            }
            rows.push(out);
        }
        Ok(QueryResult {
            row_count: rows.len(),
            rows,
        })
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[async_trait]
impl Persistence for SqlitePersistence {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult, StorageError> {
        let conn = self.lock()?;
        Ok(Self::run(&conn, statement)?)
    }

    async fn execute_in_transaction(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<QueryResult>, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            results.push(Self::run(&tx, statement)?);
        }
        tx.commit()?;
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
