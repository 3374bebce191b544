//! Config store - persisted key/integer values in the bookkeeping table

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::BOOKKEEPING_TABLE;
use crate::ports::Database;

use super::maintenance::quote_identifier;

/// One row of the bookkeeping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: i64,
}

/// Key/value access to the bookkeeping table
///
/// Each call is its own statement; when the caller has a transaction open on
/// the same database, reads and writes happen inside it. Database failures
/// surface as [`Error::StorageUnavailable`] and are not retried.
#[derive(Clone)]
pub struct ConfigStore {
    db: Arc<dyn Database>,
    table: String,
}

impl ConfigStore {
    /// Store backed by the bookkeeping table of `schema`
    pub fn new(db: Arc<dyn Database>, schema: &str) -> Self {
        Self {
            db,
            table: format!("{}.{}", quote_identifier(schema), BOOKKEEPING_TABLE),
        }
    }

    /// Schema-qualified name of the bookkeeping table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Read the value stored under `key`, `None` if the key is absent
    pub fn get(&self, key: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT value FROM {} WHERE config = {}",
            self.table,
            self.db.escape_string(key)
        );

        let Some(rs) = self.db.store_query(&sql).map_err(Error::into_storage)? else {
            return Ok(None);
        };

        rs.get_i64("value").map(Some).ok_or_else(|| {
            Error::parse(format!(
                "config '{}' holds a non-integer value: {:?}",
                key,
                rs.get_string("value")
            ))
        })
    }

    /// Store `value` under `key`, inserting or updating as needed
    pub fn set(&self, key: &str, value: i64) -> Result<()> {
        let escaped_key = self.db.escape_string(key);
        let sql = if self.contains(key)? {
            format!(
                "UPDATE {} SET value = '{}' WHERE config = {}",
                self.table, value, escaped_key
            )
        } else {
            format!(
                "INSERT INTO {} (config, value) VALUES ({}, '{}')",
                self.table, escaped_key, value
            )
        };

        self.db.execute(&sql).map_err(Error::into_storage)
    }

    /// Check whether a row exists for `key`
    pub fn contains(&self, key: &str) -> Result<bool> {
        let sql = format!(
            "SELECT config FROM {} WHERE config = {}",
            self.table,
            self.db.escape_string(key)
        );
        Ok(self
            .db
            .store_query(&sql)
            .map_err(Error::into_storage)?
            .is_some())
    }

    /// All integer entries, ordered by key
    ///
    /// Rows whose value is not an integer are left out.
    pub fn entries(&self) -> Result<Vec<ConfigEntry>> {
        let sql = format!(
            "SELECT config, value FROM {} ORDER BY config",
            self.table
        );
        let Some(mut rs) = self.db.store_query(&sql).map_err(Error::into_storage)? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        loop {
            if let (Some(key), Some(value)) = (rs.get_string("config"), rs.get_i64("value")) {
                entries.push(ConfigEntry { key, value });
            }
            if !rs.next() {
                break;
            }
        }
        Ok(entries)
    }
}
