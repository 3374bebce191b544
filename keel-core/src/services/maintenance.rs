//! Maintenance service - schema introspection and table compaction

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{OptimizeReport, TableOptimization};
use crate::ports::Database;

/// Schema introspection and housekeeping for one database schema
#[derive(Clone)]
pub struct MaintenanceService {
    db: Arc<dyn Database>,
    schema: String,
}

impl MaintenanceService {
    pub fn new(db: Arc<dyn Database>, schema: impl Into<String>) -> Self {
        Self {
            db,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Check if a table exists in the configured schema
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = current_database() AND table_schema = {} AND table_name = {} LIMIT 1",
            self.db.escape_string(&self.schema),
            self.db.escape_string(table_name)
        );
        Ok(self
            .db
            .store_query(&sql)
            .map_err(Error::into_storage)?
            .is_some())
    }

    /// Check if the configured schema holds any table at all
    pub fn database_is_setup(&self) -> Result<bool> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = current_database() AND table_schema = {} LIMIT 1",
            self.db.escape_string(&self.schema)
        );
        Ok(self
            .db
            .store_query(&sql)
            .map_err(Error::into_storage)?
            .is_some())
    }

    /// Tables with reclaimable space
    ///
    /// DuckDB reports free blocks per database file, not per table, so every
    /// base table of the schema is a candidate once the file has free blocks.
    pub fn reclaimable_tables(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = current_database() AND table_schema = {} \
               AND table_type = 'BASE TABLE' \
               AND (SELECT COALESCE(SUM(free_blocks), 0) FROM pragma_database_size() \
                    WHERE database_name = current_database()) > 0 \
             ORDER BY table_name",
            self.db.escape_string(&self.schema)
        );

        let Some(mut rs) = self.db.store_query(&sql).map_err(Error::into_storage)? else {
            return Ok(Vec::new());
        };

        let mut tables = Vec::new();
        loop {
            if let Some(name) = rs.get_string("table_name") {
                tables.push(name);
            }
            if !rs.next() {
                break;
            }
        }
        Ok(tables)
    }

    /// Compact every table with reclaimable space
    ///
    /// A failing table is recorded and the pass moves on to the next one.
    pub fn optimize(&self) -> Result<OptimizeReport> {
        let mut report = OptimizeReport::default();

        for table in self.reclaimable_tables()? {
            log::info!("> Optimizing table {}...", table);
            let sql = format!("VACUUM ANALYZE {}", quote_identifier(&table));
            match self.db.execute(&sql) {
                Ok(()) => {
                    log::info!("> Optimizing table {} [success]", table);
                    report.tables.push(TableOptimization {
                        table,
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    log::warn!("> Optimizing table {} [failed]: {}", table, e);
                    report.tables.push(TableOptimization {
                        table,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Quote an SQL identifier with double quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
