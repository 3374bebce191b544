//! Keel Core - versioned schema migrations for an embedded database
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Version counters, migration files, SQL text parsing, run reports
//! - **ports**: Trait definitions for external dependencies (Database, MigrationFiles, ScriptSource)
//! - **services**: Migration orchestration
//! - **adapters**: Concrete implementations (DuckDB, migration directories, script registries)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbDatabase;
use adapters::files::DirectoryMigrationFiles;
use config::Config;
use ports::{Database, MigrationFiles, ScriptSource};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{
    FileMigrationReport, MigrationSummary, OptimizeReport, ScriptedMigrationReport, StopReason,
    StoredVersion, VersionCounter,
};

/// Main context for Keel operations
///
/// Holds the configuration, the database handle and every service built on
/// top of it. All services share the same handle.
pub struct KeelContext {
    pub config: Config,
    pub db: Arc<dyn Database>,
    pub versions: VersionStore,
    pub config_store: ConfigStore,
    pub maintenance: MaintenanceService,
    pub file_migrations: FileMigrationService,
}

impl KeelContext {
    /// Open the configured DuckDB database of a project directory
    pub fn new(project_dir: &Path) -> Result<Self> {
        Self::open(Config::load(project_dir)?)
    }

    /// Open the database named by an already loaded configuration
    pub fn open(config: Config) -> Result<Self> {
        let db: Arc<dyn Database> = Arc::new(DuckDbDatabase::open(&config.database)?);
        let files = Box::new(DirectoryMigrationFiles::new(config.sql_migrations_dir.clone()));
        Ok(Self::with_database(config, db, files))
    }

    /// Build a context around an already opened database
    pub fn with_database(
        config: Config,
        db: Arc<dyn Database>,
        files: Box<dyn MigrationFiles>,
    ) -> Self {
        let versions = VersionStore::new(Arc::clone(&db), config.schema.clone());
        let config_store = versions.config().clone();
        let maintenance = MaintenanceService::new(Arc::clone(&db), config.schema.clone());
        let file_migrations = FileMigrationService::new(
            Arc::clone(&db),
            versions.clone(),
            files,
            config.file_migration_options(),
        );

        Self {
            config,
            db,
            versions,
            config_store,
            maintenance,
            file_migrations,
        }
    }

    /// Scripted migration service running the units of `source`
    pub fn scripted_migrations(&self, source: Box<dyn ScriptSource>) -> ScriptedMigrationService {
        ScriptedMigrationService::new(Arc::clone(&self.db), self.versions.clone(), source)
    }

    /// Apply pending SQL files, then the scripted units of `scripts`
    ///
    /// Scripted units are not attempted when the file run halted on a failure.
    pub fn migrate(&self, scripts: Option<Box<dyn ScriptSource>>) -> Result<MigrationSummary> {
        let files = self.file_migrations.run()?;
        let scripts = match scripts {
            Some(source) if !files.halted => Some(self.scripted_migrations(source).run()?),
            _ => None,
        };
        Ok(MigrationSummary { files, scripts })
    }
}
