//! SQLite store handle
//!
//! Single owner of the target connection for the duration of a conversion.
//! Every phase writes through this handle.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, Transaction};

use super::{DatabaseError, DatabaseResult, QueryResult, QueryRow};
use crate::validation::quote_identifier;

/// SQLite target store
///
/// Supports both a database file and an in-memory database.
pub struct SqliteStore {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    connection: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::configure(&connection)?;

        Ok(Self {
            db_path: Some(path),
            connection,
        })
    }

    /// Create an in-memory store
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory SQLite: {}", e))
        })?;
        Self::configure(&connection)?;

        Ok(Self {
            db_path: None,
            connection,
        })
    }

    /// Foreign keys stay unenforced so tables can be loaded in any order
    fn configure(connection: &Connection) -> DatabaseResult<()> {
        connection
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Failed to configure: {}", e)))
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    /// Execute a SQL statement that doesn't return rows
    pub fn execute(&self, sql: &str) -> DatabaseResult<usize> {
        self.connection
            .execute(sql, [])
            .map_err(|e| DatabaseError::QueryFailed(format!("Execute failed: {}", e)))
    }

    /// Execute multiple SQL statements
    pub fn execute_batch(&self, sql: &str) -> DatabaseResult<()> {
        self.connection
            .execute_batch(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Batch execute failed: {}", e)))
    }

    /// Begin a transaction; dropping it without `commit` rolls back
    pub fn transaction(&mut self) -> DatabaseResult<Transaction<'_>> {
        self.connection
            .transaction()
            .map_err(|e| DatabaseError::TransactionFailed(format!("Begin failed: {}", e)))
    }

    /// Run a query and collect every row as JSON
    pub fn query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        let started = Instant::now();
        let mut stmt = self
            .connection
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;
        let mut result_rows = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch failed: {}", e)))?
        {
            result_rows.push(Self::row_to_json(row, &columns));
        }

        let mut result = QueryResult::new(columns, result_rows);
        result.elapsed = started.elapsed();
        Ok(result)
    }

    /// Names of user tables, in creation order
    pub fn table_names(&self) -> DatabaseResult<Vec<String>> {
        self.object_names("table")
    }

    /// Names of views, in creation order
    pub fn view_names(&self) -> DatabaseResult<Vec<String>> {
        self.object_names("view")
    }

    fn object_names(&self, kind: &str) -> DatabaseResult<Vec<String>> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
            )
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;
        let names = stmt
            .query_map([kind], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| DatabaseError::QueryFailed(format!("Listing {}s failed: {}", kind, e)))?;
        Ok(names)
    }

    /// Number of rows in a table or view
    pub fn row_count(&self, name: &str) -> DatabaseResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(name));
        self.connection
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(|e| DatabaseError::QueryFailed(format!("Count failed: {}", e)))
    }

    /// Convert a SQLite row to a JSON object keyed by column name
    fn row_to_json(row: &rusqlite::Row<'_>, columns: &[String]) -> QueryRow {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value = match row.get_ref(i) {
                Ok(value_ref) => Self::value_ref_to_json(value_ref),
                Err(_) => serde_json::Value::Null,
            };
            map.insert(col_name.clone(), value);
        }

        serde_json::Value::Object(map)
    }

    fn value_ref_to_json(value: ValueRef<'_>) -> serde_json::Value {
        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
            ValueRef::Real(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
            ValueRef::Blob(bytes) => {
                // hex, as SQLite's own hex() renders it
                let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                serde_json::Value::String(hex)
            }
        }
    }
}
