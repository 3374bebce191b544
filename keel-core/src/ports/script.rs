//! Scripted migration port
//!
//! A scripted migration is a unit of imperative logic identified by an integer
//! version. The engine never looks inside a unit: it asks a [`ScriptSource`]
//! for the unit of the current version, hands it a fresh [`ScriptEnv`], and
//! reads back whether the unit considers itself applied.

use std::collections::HashMap;

use anyhow::Result;

use super::database::{Database, ResultSet};

/// One loaded migration unit
pub trait ScriptUnit {
    /// Entry procedure, called with no arguments besides the bindings.
    ///
    /// `Ok(true)` marks the unit applied, `Ok(false)` declines completion and
    /// `Err` is a runtime fault inside the unit.
    fn run(&self, env: &mut ScriptEnv<'_>) -> Result<bool>;
}

/// Resolves migration units by version
pub trait ScriptSource {
    /// Load the unit for `version`.
    ///
    /// `Ok(None)` means no unit exists for that version (migrations are up to
    /// date). `Err` means a unit exists but could not be loaded.
    fn load_unit(&self, version: i64) -> Result<Option<Box<dyn ScriptUnit + '_>>>;
}

/// Turns script source text into runnable units
///
/// This is the seam for an embedded-language interpreter.
pub trait ScriptRuntime {
    fn compile(&self, name: &str, source: &str) -> Result<Box<dyn ScriptUnit>>;
}

/// Handle to a result set held by a [`ScriptEnv`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultId(u32);

/// Host bindings available to a running unit
///
/// Every invocation gets its own environment. Result sets stored through it
/// are released when the environment is dropped, so nothing carries over from
/// one unit to the next.
pub struct ScriptEnv<'a> {
    db: &'a dyn Database,
    results: HashMap<ResultId, ResultSet>,
    next_id: u32,
}

impl<'a> ScriptEnv<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            results: HashMap::new(),
            next_id: 1,
        }
    }

    /// Direct access to the database port
    pub fn database(&self) -> &'a dyn Database {
        self.db
    }

    pub fn escape_string(&self, value: &str) -> String {
        self.db.escape_string(value)
    }

    pub fn escape_blob(&self, value: &[u8]) -> String {
        self.db.escape_blob(value)
    }

    /// Run a statement, returning whether it succeeded
    pub fn execute(&mut self, sql: &str) -> bool {
        match self.db.execute(sql) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Script query failed: {} ({})", e, sql);
                false
            }
        }
    }

    /// Run a query and keep its rows, returning a handle to them
    ///
    /// `None` when the query fails or returns no rows.
    pub fn store_query(&mut self, sql: &str) -> Option<ResultId> {
        match self.db.store_query(sql) {
            Ok(Some(rs)) => {
                let id = ResultId(self.next_id);
                self.next_id += 1;
                self.results.insert(id, rs);
                Some(id)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Script query failed: {} ({})", e, sql);
                None
            }
        }
    }

    /// Move a stored result to its next row
    pub fn result_next(&mut self, id: ResultId) -> bool {
        self.results.get_mut(&id).is_some_and(|rs| rs.next())
    }

    pub fn result_string(&self, id: ResultId, column: &str) -> Option<String> {
        self.results.get(&id)?.get_string(column)
    }

    pub fn result_number(&self, id: ResultId, column: &str) -> Option<i64> {
        self.results.get(&id)?.get_i64(column)
    }

    /// Release a stored result early
    pub fn free_result(&mut self, id: ResultId) -> bool {
        self.results.remove(&id).is_some()
    }

    /// Number of result sets currently held
    pub fn open_results(&self) -> usize {
        self.results.len()
    }
}
