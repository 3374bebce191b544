//! DuckDB implementation of the database port

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::types::ValueRef;
use duckdb::Connection;
use serde_json::{json, Value};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::domain::result::{Error, Result};
use crate::ports::{Database, ResultSet};

/// Validate SQL syntax without executing it.
///
/// Used by dry runs to catch malformed statements before a migration's
/// transaction is opened.
pub fn validate_sql_syntax(sql: &str) -> Result<()> {
    let dialect = DuckDbDialect {};
    Parser::parse_sql(&dialect, sql).map_err(|e| {
        // Clean up the error message - remove redundant prefix
        let msg = e.to_string();
        let cleaned = msg.trim_start_matches("sql parser error: ");
        Error::parse(cleaned.to_string())
    })?;
    Ok(())
}

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB database handle
///
/// Owns a single connection. Transactions opened with
/// [`Database::begin_transaction`] apply to every call until commit/rollback.
pub struct DuckDbDatabase {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbDatabase {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when another process still holds the file.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        // Exponential backoff: 50ms, 100ms, 200ms, 400ms
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        log::warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(Error::storage(err_msg));
                }
            }
        }

        Err(Error::storage(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("Failed to open database after {} retries", MAX_RETRIES)),
        ))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    /// Attempt to open a database connection (called by open() with retry logic)
    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Disable extension autoloading; nothing here needs network access
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }

    fn column_value(row: &duckdb::Row, idx: usize) -> Value {
        match row.get_ref(idx) {
            Ok(ValueRef::Null) => Value::Null,
            Ok(ValueRef::Boolean(b)) => Value::Bool(b),
            Ok(ValueRef::TinyInt(i)) => json!(i),
            Ok(ValueRef::SmallInt(i)) => json!(i),
            Ok(ValueRef::Int(i)) => json!(i),
            Ok(ValueRef::BigInt(i)) => json!(i),
            Ok(ValueRef::HugeInt(i)) => json!(i.to_string()),
            Ok(ValueRef::UTinyInt(i)) => json!(i),
            Ok(ValueRef::USmallInt(i)) => json!(i),
            Ok(ValueRef::UInt(i)) => json!(i),
            Ok(ValueRef::UBigInt(i)) => json!(i),
            Ok(ValueRef::Float(f)) => json!(f),
            Ok(ValueRef::Double(f)) => json!(f),
            Ok(ValueRef::Decimal(d)) => Value::String(d.to_string()),
            Ok(ValueRef::Text(bytes)) => Value::String(String::from_utf8_lossy(bytes).to_string()),
            Ok(ValueRef::Blob(bytes)) => Value::String(format!("<blob {} bytes>", bytes.len())),
            _ => Value::Null,
        }
    }
}

impl Database for DuckDbDatabase {
    fn escape_blob(&self, value: &[u8]) -> String {
        let mut out = String::with_capacity(value.len() * 4 + 10);
        out.push('\'');
        for byte in value {
            out.push_str(&format!("\\x{:02X}", byte));
        }
        out.push_str("'::BLOB");
        out
    }

    fn store_query(&self, sql: &str) -> Result<Option<ResultSet>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut result_rows = stmt.query([])?;

        let mut rows: Vec<Vec<Value>> = Vec::new();
        let mut column_count = 0;

        while let Some(row) = result_rows.next()? {
            if rows.is_empty() {
                column_count = row.as_ref().column_count();
            }
            let values = (0..column_count)
                .map(|i| Self::column_value(row, i))
                .collect();
            rows.push(values);
        }

        // Drop result_rows to release borrow on stmt
        drop(result_rows);

        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        Ok(ResultSet::from_rows(columns, rows))
    }

    fn execute(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn begin_transaction(&self) -> Result<()> {
        self.execute("BEGIN TRANSACTION")
    }

    fn commit(&self) -> Result<()> {
        self.execute("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.execute("ROLLBACK")
    }
}
