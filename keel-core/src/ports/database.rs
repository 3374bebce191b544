//! Database port - query execution, escaping and transactions

use serde_json::Value;

use crate::domain::result::Result;

/// Database abstraction used by every migration component
///
/// One handle is created by the caller and injected into each service. All
/// calls block until the database answers.
pub trait Database: Send + Sync {
    /// Quote a string as an SQL literal
    fn escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Quote raw bytes as an SQL blob literal
    fn escape_blob(&self, value: &[u8]) -> String;

    /// Run a query and materialize its rows
    ///
    /// Returns `Ok(None)` when the query succeeds but yields no rows.
    fn store_query(&self, sql: &str) -> Result<Option<ResultSet>>;

    /// Run a statement whose result is not needed
    fn execute(&self, sql: &str) -> Result<()>;

    fn begin_transaction(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}

/// Materialized query result with a row cursor
///
/// The cursor starts on the first row. [`ResultSet::next`] moves it forward
/// and reports whether another row is available.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    position: usize,
}

impl ResultSet {
    /// Build a result set, or `None` if there are no rows
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        Some(Self {
            columns,
            rows,
            position: 0,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Advance to the next row
    pub fn next(&mut self) -> bool {
        if self.position + 1 < self.rows.len() {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Raw value of a column on the current row
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(self.position)?.get(idx)
    }

    /// Column value on the current row as text
    pub fn get_string(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Column value on the current row as an integer
    ///
    /// Text columns holding a decimal integer are parsed.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }
}
