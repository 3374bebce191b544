//! Version store - the two schema version counters
//!
//! Both counters live in the bookkeeping table as config entries. An absent
//! table means a fresh database (both counters read as 0). A present table
//! with a missing key is [`StoredVersion::Unknown`], which callers must treat
//! as a hard stop.

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{StoredVersion, VersionCounter, BOOKKEEPING_TABLE};
use crate::ports::Database;

use super::config_store::ConfigStore;
use super::maintenance::{quote_identifier, MaintenanceService};

#[derive(Clone)]
pub struct VersionStore {
    db: Arc<dyn Database>,
    config: ConfigStore,
    maintenance: MaintenanceService,
}

impl VersionStore {
    pub fn new(db: Arc<dyn Database>, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        Self {
            config: ConfigStore::new(Arc::clone(&db), &schema),
            maintenance: MaintenanceService::new(Arc::clone(&db), schema),
            db,
        }
    }

    /// True if the bookkeeping table is present
    pub fn schema_exists(&self) -> Result<bool> {
        self.maintenance.table_exists(BOOKKEEPING_TABLE)
    }

    /// True if the schema holds any table at all
    pub fn database_is_setup(&self) -> Result<bool> {
        self.maintenance.database_is_setup()
    }

    /// Read a counter without side effects
    pub fn get(&self, counter: VersionCounter) -> Result<StoredVersion> {
        if !self.schema_exists()? {
            return Ok(StoredVersion::At(0));
        }

        Ok(match self.config.get(counter.key())? {
            Some(version) => StoredVersion::At(version),
            None => StoredVersion::Unknown,
        })
    }

    /// Version reached by scripted migrations
    pub fn logical_version(&self) -> Result<StoredVersion> {
        self.get(VersionCounter::Logical)
    }

    /// Version reached by SQL file migrations
    ///
    /// Creates and seeds the bookkeeping table when it does not exist yet.
    pub fn sql_version(&self) -> Result<StoredVersion> {
        if !self.schema_exists()? {
            self.bootstrap()?;
            return Ok(StoredVersion::At(0));
        }
        self.get(VersionCounter::Sql)
    }

    /// Persist a new value for `counter`
    ///
    /// Counters never move backwards. A missing bookkeeping table is created
    /// in its own transaction, so the first write must not happen inside an
    /// open one.
    pub fn advance(&self, counter: VersionCounter, version: i64) -> Result<()> {
        if !self.schema_exists()? {
            self.bootstrap()?;
        }

        if let Some(current) = self.config.get(counter.key())? {
            if version < current {
                return Err(Error::validation(format!(
                    "refusing to move {} version back from {} to {}",
                    counter, current, version
                )));
            }
        }

        self.config.set(counter.key(), version)
    }

    /// Create the bookkeeping table and seed both counters at 0
    ///
    /// Creation and seeding commit together; on failure nothing is left behind.
    fn bootstrap(&self) -> Result<()> {
        log::info!("> Creating {} table", self.config.table());

        self.db
            .begin_transaction()
            .map_err(|e| Error::Bootstrap(format!("failed to begin transaction: {}", e)))?;

        if let Err(e) = self.create_and_seed() {
            if let Err(rollback) = self.db.rollback() {
                log::warn!("Rollback of {} bootstrap failed: {}", BOOKKEEPING_TABLE, rollback);
            }
            return Err(e);
        }

        self.db
            .commit()
            .map_err(|e| Error::Bootstrap(format!("failed to commit {}: {}", BOOKKEEPING_TABLE, e)))
    }

    fn create_and_seed(&self) -> Result<()> {
        let table = self.config.table();
        self.db
            .execute(&format!(
                "CREATE SCHEMA IF NOT EXISTS {}",
                quote_identifier(self.maintenance.schema())
            ))
            .and_then(|()| {
                self.db.execute(&format!(
                    "CREATE TABLE {} (config VARCHAR(50) NOT NULL, value VARCHAR(256) NOT NULL DEFAULT '', UNIQUE(config))",
                    table
                ))
            })
            .map_err(|e| Error::Bootstrap(format!("failed to create {}: {}", table, e)))?;

        for counter in [VersionCounter::Logical, VersionCounter::Sql] {
            self.config
                .set(counter.key(), 0)
                .map_err(|e| Error::Bootstrap(format!("failed to seed {}: {}", counter.key(), e)))?;
        }
        Ok(())
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }
}
