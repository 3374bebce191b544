//! File migration service - applies versioned SQL files
//!
//! Files are listed from a [`MigrationFiles`] source, filtered by extension
//! and attempted in lexicographic filename order. Each file whose declared
//! version is above the current SQL version runs inside its own transaction:
//! statements first, then trigger bodies, then the SQL version is advanced to
//! the file's version and the transaction is committed. Any failure rolls the
//! whole file back and leaves the version untouched.

use std::sync::Arc;

use crate::adapters::duckdb::validate_sql_syntax;
use crate::domain::migration_file::{has_extension, parse_file_version};
use crate::domain::result::{Error, Result};
use crate::domain::sql_text::parse_migration;
use crate::domain::{
    EventObserver, FileCheck, FileMigrationReport, FileOutcome, FileStatus, MigrationEvent,
    MigrationFile, ParsedMigration, PendingFile, StoredVersion, VersionCounter,
};
use crate::ports::{Database, MigrationFiles};

use super::version::VersionStore;

/// Options for a file migration run
#[derive(Debug, Clone)]
pub struct FileMigrationOptions {
    /// Extension a file must carry to be considered, including the dot
    pub extension: String,
    /// Halt after the first failed file instead of moving on to the next one
    pub stop_on_failure: bool,
}

impl Default for FileMigrationOptions {
    fn default() -> Self {
        Self {
            extension: ".sql".to_string(),
            stop_on_failure: false,
        }
    }
}

/// Service applying SQL migration files
pub struct FileMigrationService {
    db: Arc<dyn Database>,
    versions: VersionStore,
    files: Box<dyn MigrationFiles>,
    options: FileMigrationOptions,
    observer: Option<EventObserver>,
}

impl FileMigrationService {
    pub fn new(
        db: Arc<dyn Database>,
        versions: VersionStore,
        files: Box<dyn MigrationFiles>,
        options: FileMigrationOptions,
    ) -> Self {
        Self {
            db,
            versions,
            files,
            options,
            observer: None,
        }
    }

    /// Receive a progress event for every step of a run
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&MigrationEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn options(&self) -> &FileMigrationOptions {
        &self.options
    }

    /// Apply every pending migration file
    ///
    /// Creates the bookkeeping table on a fresh database. Per-file failures
    /// are reported in the returned report; only an unreadable SQL version or
    /// an unlistable file source is returned as an error.
    pub fn run(&self) -> Result<FileMigrationReport> {
        let starting_version = match self.versions.sql_version()? {
            StoredVersion::At(v) => v,
            StoredVersion::Unknown => return Err(Error::UnknownVersion(VersionCounter::Sql)),
        };

        let mut version = starting_version;
        let mut outcomes = Vec::new();
        let mut halted = false;

        for name in self.sorted_files()? {
            let file_version = match parse_file_version(&name) {
                Ok(v) => v,
                Err(e) => {
                    let reason = e.to_string();
                    self.emit(MigrationEvent::FileSkipped {
                        file: name.clone(),
                        reason: reason.clone(),
                    });
                    outcomes.push(FileOutcome {
                        file: name,
                        version: None,
                        status: FileStatus::Skipped { reason },
                        warnings: Vec::new(),
                    });
                    continue;
                }
            };

            if file_version <= version {
                log::debug!("{} already applied (SQL version {})", name, version);
                outcomes.push(FileOutcome {
                    file: name,
                    version: Some(file_version),
                    status: FileStatus::AlreadyApplied,
                    warnings: Vec::new(),
                });
                continue;
            }

            let outcome = self.apply_file(&name, file_version);
            if matches!(outcome.status, FileStatus::Applied { .. }) {
                version = file_version;
            }

            let failed = outcome.is_failure();
            outcomes.push(outcome);
            if failed && self.options.stop_on_failure {
                halted = true;
                break;
            }
        }

        Ok(FileMigrationReport {
            starting_version,
            final_version: version,
            outcomes,
            halted,
        })
    }

    /// Files a run would attempt, in order, assuming each one succeeds
    ///
    /// Does not create the bookkeeping table.
    pub fn pending(&self) -> Result<Vec<PendingFile>> {
        let mut version = match self.versions.get(VersionCounter::Sql)? {
            StoredVersion::At(v) => v,
            StoredVersion::Unknown => return Err(Error::UnknownVersion(VersionCounter::Sql)),
        };

        let mut pending = Vec::new();
        for name in self.sorted_files()? {
            if let Ok(file_version) = parse_file_version(&name) {
                if file_version > version {
                    version = file_version;
                    pending.push(PendingFile {
                        name,
                        version: file_version,
                    });
                }
            }
        }
        Ok(pending)
    }

    /// Parse every pending file and validate its statements without executing them
    ///
    /// Trigger bodies are counted but not validated. A file that cannot be
    /// read is reported as an error of that file.
    pub fn check(&self) -> Result<Vec<FileCheck>> {
        let mut checks = Vec::new();
        for file in self.pending()? {
            let raw = match self.files.read(&file.name) {
                Ok(raw) => raw,
                Err(e) => {
                    checks.push(FileCheck {
                        file: file.name,
                        version: file.version,
                        statements: 0,
                        triggers: 0,
                        warnings: Vec::new(),
                        errors: vec![format!("failed to read file: {}", e)],
                    });
                    continue;
                }
            };
            let parsed = parse_migration(
                &MigrationFile {
                    version: file.version,
                    name: file.name.clone(),
                    raw,
                }
                .normalize(),
            );

            let errors = parsed
                .statements
                .iter()
                .filter_map(|stmt| {
                    validate_sql_syntax(stmt)
                        .err()
                        .map(|e| format!("{}: {}", stmt, e))
                })
                .collect();

            checks.push(FileCheck {
                file: file.name,
                version: file.version,
                statements: parsed.statements.len(),
                triggers: parsed.triggers.len(),
                warnings: parsed.warnings,
                errors,
            });
        }
        Ok(checks)
    }

    /// Listed file names carrying the migration extension, sorted by name
    fn sorted_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .files
            .list()?
            .into_iter()
            .filter(|name| has_extension(name, &self.options.extension))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Apply one file inside its own transaction
    fn apply_file(&self, name: &str, version: i64) -> FileOutcome {
        self.emit(MigrationEvent::FileStarted {
            file: name.to_string(),
            version,
        });

        let raw = match self.files.read(name) {
            Ok(raw) => raw,
            Err(e) => {
                return self.failed(name, version, format!("failed to read file: {}", e), false, Vec::new())
            }
        };

        let file = MigrationFile {
            version,
            name: name.to_string(),
            raw,
        };
        let parsed = parse_migration(&file.normalize());
        for warning in &parsed.warnings {
            self.emit(MigrationEvent::FileWarning {
                file: name.to_string(),
                warning: warning.clone(),
            });
        }

        if let Err(e) = self.db.begin_transaction() {
            return self.failed(
                name,
                version,
                format!("failed to begin transaction: {}", e),
                false,
                parsed.warnings,
            );
        }

        let error = match self.execute_unit(&parsed, version) {
            Ok(()) => match self.db.commit() {
                Ok(()) => {
                    self.emit(MigrationEvent::FileApplied {
                        file: name.to_string(),
                        version,
                    });
                    return FileOutcome {
                        file: name.to_string(),
                        version: Some(version),
                        status: FileStatus::Applied {
                            statements: parsed.statements.len(),
                            triggers: parsed.triggers.len(),
                        },
                        warnings: parsed.warnings,
                    };
                }
                Err(e) => format!("commit failed: {}", e),
            },
            Err(e) => e.to_string(),
        };

        let rolled_back = match self.db.rollback() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Rollback of {} failed: {}", name, e);
                false
            }
        };
        self.failed(name, version, error, rolled_back, parsed.warnings)
    }

    /// Statements, then triggers, then the version bump - stopping at the first failure
    fn execute_unit(&self, parsed: &ParsedMigration, version: i64) -> Result<()> {
        for statement in parsed.statements.iter().chain(parsed.triggers.iter()) {
            self.db
                .execute(&format!("{};", statement))
                .map_err(|e| Error::StatementFailure(format!("{} ({})", e, statement)))?;
        }
        self.versions.advance(VersionCounter::Sql, version)
    }

    fn failed(
        &self,
        name: &str,
        version: i64,
        error: String,
        rolled_back: bool,
        warnings: Vec<String>,
    ) -> FileOutcome {
        self.emit(MigrationEvent::FileFailed {
            file: name.to_string(),
            version,
            error: error.clone(),
            rolled_back,
        });
        FileOutcome {
            file: name.to_string(),
            version: Some(version),
            status: FileStatus::Failed { error, rolled_back },
            warnings,
        }
    }

    fn emit(&self, event: MigrationEvent) {
        match &event {
            MigrationEvent::FileFailed { .. }
            | MigrationEvent::FileSkipped { .. }
            | MigrationEvent::FileWarning { .. } => log::warn!("{}", event),
            _ => log::info!("{}", event),
        }
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}
