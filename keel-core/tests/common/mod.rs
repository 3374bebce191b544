//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use keel_core::adapters::duckdb::DuckDbDatabase;
use keel_core::ports::{Database, ResultSet};
use keel_core::services::VersionStore;
use keel_core::Result;

/// Real DuckDB wrapped with switchable faults
///
/// Every call is delegated to an in-memory DuckDB unless a fault matches.
pub struct FaultyDatabase {
    inner: DuckDbDatabase,
    fail_statements: Mutex<Vec<String>>,
    fail_commit: AtomicBool,
    executed: Mutex<Vec<String>>,
}

impl FaultyDatabase {
    pub fn new() -> Self {
        Self {
            inner: DuckDbDatabase::open_in_memory().expect("in-memory database"),
            fail_statements: Mutex::new(Vec::new()),
            fail_commit: AtomicBool::new(false),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Fail any `execute` whose SQL contains `needle`
    pub fn fail_on(&self, needle: &str) {
        self.fail_statements.lock().unwrap().push(needle.to_string());
    }

    pub fn clear_faults(&self) {
        self.fail_statements.lock().unwrap().clear();
        self.fail_commit.store(false, Ordering::SeqCst);
    }

    pub fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// SQL passed to `execute`, in call order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Database for FaultyDatabase {
    fn escape_blob(&self, value: &[u8]) -> String {
        self.inner.escape_blob(value)
    }

    fn store_query(&self, sql: &str) -> Result<Option<ResultSet>> {
        self.inner.store_query(sql)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.executed.lock().unwrap().push(sql.to_string());
        if self
            .fail_statements
            .lock()
            .unwrap()
            .iter()
            .any(|needle| sql.contains(needle.as_str()))
        {
            return Err(keel_core::Error::database(format!("injected failure: {}", sql)));
        }
        self.inner.execute(sql)
    }

    fn begin_transaction(&self) -> Result<()> {
        self.inner.begin_transaction()
    }

    fn commit(&self) -> Result<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(keel_core::Error::database("injected commit failure"));
        }
        self.inner.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.inner.rollback()
    }
}

pub fn memory_db() -> Arc<dyn Database> {
    Arc::new(DuckDbDatabase::open_in_memory().expect("in-memory database"))
}

pub fn versions(db: &Arc<dyn Database>) -> VersionStore {
    VersionStore::new(Arc::clone(db), "main")
}

/// Write `(name, content)` pairs into `dir`
pub fn write_files(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

/// Row count of a table
pub fn count(db: &dyn Database, table: &str) -> i64 {
    db.store_query(&format!("SELECT COUNT(*) AS n FROM {}", table))
        .unwrap()
        .and_then(|rs| rs.get_i64("n"))
        .unwrap_or(0)
}
