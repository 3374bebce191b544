//! Integration tests for SQL file migrations
//!
//! Files live in a temp directory, statements run against real DuckDB.
//!
//! Run with: cargo test --test file_migration_test -- --nocapture

mod common;

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use keel_core::adapters::files::{DirectoryMigrationFiles, EmbeddedMigrationFiles};
use keel_core::domain::{FileStatus, MigrationEvent, StoredVersion, VersionCounter};
use keel_core::ports::{Database, MigrationFiles};
use keel_core::services::{
    FileMigrationOptions, FileMigrationService, MaintenanceService, VersionStore,
};
use keel_core::{Error, Result};

use common::{count, memory_db, versions, write_files, FaultyDatabase};

fn service(db: &Arc<dyn Database>, dir: &TempDir) -> FileMigrationService {
    FileMigrationService::new(
        Arc::clone(db),
        versions(db),
        Box::new(DirectoryMigrationFiles::new(dir.path())),
        FileMigrationOptions::default(),
    )
}

fn sql_version(db: &Arc<dyn Database>) -> StoredVersion {
    versions(db).get(VersionCounter::Sql).unwrap()
}

// ============================================================================
// Ordering and idempotence
// ============================================================================

#[test]
fn test_fresh_database_applies_all_files() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("1.sql", "CREATE TABLE players (id INTEGER, name VARCHAR(30));"),
            ("2.sql", "INSERT INTO players VALUES (1, 'Alice');\nINSERT INTO players VALUES (2, 'Bob');"),
        ],
    );
    let db = memory_db();

    let report = service(&db, &dir).run().unwrap();

    assert_eq!(report.starting_version, 0);
    assert_eq!(report.final_version, 2);
    assert_eq!(report.applied().count(), 2);
    assert!(!report.has_failures());
    assert_eq!(count(db.as_ref(), "players"), 2);
    assert_eq!(sql_version(&db), StoredVersion::At(2));
    // Logical counter is seeded alongside, untouched by file migrations
    assert_eq!(versions(&db).logical_version().unwrap(), StoredVersion::At(0));
}

#[test]
fn test_second_run_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("1.sql", "CREATE TABLE players (id INTEGER);"),
            ("2.sql", "INSERT INTO players VALUES (1);"),
        ],
    );
    let db = memory_db();
    let migrations = service(&db, &dir);

    migrations.run().unwrap();
    let second = migrations.run().unwrap();

    assert_eq!(second.applied().count(), 0);
    assert!(second
        .outcomes
        .iter()
        .all(|o| o.status == FileStatus::AlreadyApplied));
    assert_eq!(count(db.as_ref(), "players"), 1);
    assert_eq!(second.final_version, 2);
}

#[test]
fn test_files_run_in_lexicographic_order() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("9.sql", "CREATE TABLE nine (id INTEGER);"),
            ("10.sql", "CREATE TABLE ten (id INTEGER);"),
        ],
    );
    let db = memory_db();

    let report = service(&db, &dir).run().unwrap();

    // "10.sql" sorts before "9.sql"; once at 10, version 9 counts as applied
    assert_eq!(report.outcomes[0].file, "10.sql");
    assert!(matches!(report.outcomes[0].status, FileStatus::Applied { .. }));
    assert_eq!(report.outcomes[1].file, "9.sql");
    assert_eq!(report.outcomes[1].status, FileStatus::AlreadyApplied);
    assert_eq!(report.final_version, 10);
    let maintenance = MaintenanceService::new(Arc::clone(&db), "main");
    assert!(maintenance.table_exists("ten").unwrap());
    assert!(!maintenance.table_exists("nine").unwrap());
}

#[test]
fn test_only_newer_files_run_after_upgrade() {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), &[("1.sql", "CREATE TABLE players (id INTEGER);")]);
    let db = memory_db();
    service(&db, &dir).run().unwrap();

    write_files(dir.path(), &[("2.sql", "ALTER TABLE players ADD COLUMN level INTEGER DEFAULT 1;")]);
    let report = service(&db, &dir).run().unwrap();

    assert_eq!(report.starting_version, 1);
    assert_eq!(report.applied().map(|o| o.file.as_str()).collect::<Vec<_>>(), vec!["2.sql"]);
    assert_eq!(sql_version(&db), StoredVersion::At(2));
}

#[test]
fn test_non_matching_and_unversioned_files() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("1.sql", "CREATE TABLE players (id INTEGER);"),
            ("notes.txt", "not a migration"),
            ("readme.sql", "SELECT 1;"),
        ],
    );
    std::fs::create_dir(dir.path().join("5.sql")).unwrap();
    let db = memory_db();

    let report = service(&db, &dir).run().unwrap();

    let files: Vec<&str> = report.outcomes.iter().map(|o| o.file.as_str()).collect();
    assert_eq!(files, vec!["1.sql", "readme.sql"]);
    assert!(matches!(report.outcomes[1].status, FileStatus::Skipped { .. }));
    assert_eq!(report.outcomes[1].version, None);
    assert_eq!(report.final_version, 1);
}

#[test]
fn test_prefixed_filenames() {
    let db = memory_db();
    let migrations = FileMigrationService::new(
        Arc::clone(&db),
        versions(&db),
        Box::new(EmbeddedMigrationFiles::new(&[
            ("v1_players.sql", "CREATE TABLE players (id INTEGER);"),
            ("v2-guilds.sql", "CREATE TABLE guilds (id INTEGER);"),
        ])),
        FileMigrationOptions::default(),
    );

    let report = migrations.run().unwrap();
    assert_eq!(report.final_version, 2);
    assert_eq!(report.applied().count(), 2);
}

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn test_failing_statement_rolls_back_whole_file() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[(
            "1.sql",
            "CREATE TABLE players (id INTEGER); INSERT INTO missing_table VALUES (1);",
        )],
    );
    let db = memory_db();

    let report = service(&db, &dir).run().unwrap();

    assert!(report.has_failures());
    assert!(matches!(
        report.outcomes[0].status,
        FileStatus::Failed { rolled_back: true, .. }
    ));
    assert_eq!(report.final_version, 0);
    assert_eq!(sql_version(&db), StoredVersion::At(0));

    let maintenance = MaintenanceService::new(Arc::clone(&db), "main");
    assert!(!maintenance.table_exists("players").unwrap());
}

#[test]
fn test_commit_failure_leaves_version_untouched() {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), &[("1.sql", "CREATE TABLE players (id INTEGER);")]);
    let faulty = Arc::new(FaultyDatabase::new());
    let db: Arc<dyn Database> = faulty.clone();
    // Bootstrap outside the failing window
    versions(&db).sql_version().unwrap();
    faulty.fail_commit(true);

    let report = service(&db, &dir).run().unwrap();

    assert!(matches!(
        &report.outcomes[0].status,
        FileStatus::Failed { error, rolled_back: true } if error.contains("commit")
    ));

    faulty.fail_commit(false);
    assert_eq!(sql_version(&db), StoredVersion::At(0));
}

#[test]
fn test_failure_continues_with_next_file_by_default() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("1.sql", "CREATE TABLE players (id INTEGER);"),
            ("2.sql", "INSERT INTO nowhere VALUES (1);"),
            ("3.sql", "CREATE TABLE guilds (id INTEGER);"),
        ],
    );
    let db = memory_db();

    let report = service(&db, &dir).run().unwrap();

    assert_eq!(report.failed().count(), 1);
    assert!(!report.halted);
    assert_eq!(report.final_version, 3);
}

#[test]
fn test_stop_on_failure_halts_run() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("1.sql", "CREATE TABLE players (id INTEGER);"),
            ("2.sql", "INSERT INTO nowhere VALUES (1);"),
            ("3.sql", "CREATE TABLE guilds (id INTEGER);"),
        ],
    );
    let db = memory_db();
    let migrations = FileMigrationService::new(
        Arc::clone(&db),
        versions(&db),
        Box::new(DirectoryMigrationFiles::new(dir.path())),
        FileMigrationOptions {
            stop_on_failure: true,
            ..FileMigrationOptions::default()
        },
    );

    let report = migrations.run().unwrap();

    assert!(report.halted);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.final_version, 1);
    assert_eq!(sql_version(&db), StoredVersion::At(1));
}

// ============================================================================
// Triggers and text normalization
// ============================================================================

#[test]
fn test_trigger_block_runs_verbatim_after_statements() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[(
            "1.sql",
            "CREATE TABLE audit (n INTEGER);\r\n\
             DELIMITER |\r\n\
             INSERT INTO audit VALUES (1); INSERT INTO audit VALUES (2) |\r\n\
             DELIMITER ;\r\n\
             CREATE TABLE players (id INTEGER);\r\n",
        )],
    );
    let faulty = Arc::new(FaultyDatabase::new());
    let db: Arc<dyn Database> = faulty.clone();

    let report = service(&db, &dir).run().unwrap();

    assert_eq!(
        report.outcomes[0].status,
        FileStatus::Applied {
            statements: 2,
            triggers: 1
        }
    );
    assert_eq!(count(db.as_ref(), "audit"), 2);

    let executed = faulty.executed();
    let body = executed
        .iter()
        .position(|sql| sql.starts_with("INSERT INTO audit VALUES (1); INSERT INTO audit"))
        .expect("trigger body executed as one unit");
    let players = executed
        .iter()
        .position(|sql| sql.starts_with("CREATE TABLE players"))
        .unwrap();
    assert!(players < body);
}

#[test]
fn test_unterminated_trigger_block_warns() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[("1.sql", "CREATE TABLE players (id INTEGER); DELIMITER | SELECT 1;")],
    );
    let db = memory_db();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let migrations = service(&db, &dir).with_observer(move |e| sink.lock().unwrap().push(e.clone()));

    let report = migrations.run().unwrap();

    assert_eq!(report.outcomes[0].warnings.len(), 1);
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, MigrationEvent::FileWarning { .. })));
}

#[test]
fn test_empty_file_still_advances_version() {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), &[("1.sql", "  \n\t ;; \n")]);
    let db = memory_db();

    let report = service(&db, &dir).run().unwrap();

    assert_eq!(
        report.outcomes[0].status,
        FileStatus::Applied {
            statements: 0,
            triggers: 0
        }
    );
    assert_eq!(sql_version(&db), StoredVersion::At(1));
}

// ============================================================================
// Version guard and bookkeeping
// ============================================================================

#[test]
fn test_unknown_sql_version_refuses_to_run() {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), &[("1.sql", "CREATE TABLE players (id INTEGER);")]);
    let db = memory_db();
    versions(&db).sql_version().unwrap();
    db.execute("DELETE FROM server_config WHERE config = 'db_sql_version'")
        .unwrap();

    let result = service(&db, &dir).run();

    assert!(matches!(result, Err(Error::UnknownVersion(VersionCounter::Sql))));
    let maintenance = MaintenanceService::new(Arc::clone(&db), "main");
    assert!(!maintenance.table_exists("players").unwrap());
}

#[test]
fn test_version_advance_failure_fails_the_file() {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), &[("1.sql", "CREATE TABLE players (id INTEGER);")]);
    let faulty = Arc::new(FaultyDatabase::new());
    let db: Arc<dyn Database> = faulty.clone();
    versions(&db).sql_version().unwrap();
    faulty.fail_on("UPDATE \"main\".server_config");

    let report = service(&db, &dir).run().unwrap();

    assert!(report.has_failures());
    let maintenance = MaintenanceService::new(Arc::clone(&db), "main");
    assert!(!maintenance.table_exists("players").unwrap());
}

#[test]
fn test_missing_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let db = memory_db();
    let migrations = FileMigrationService::new(
        Arc::clone(&db),
        versions(&db),
        Box::new(DirectoryMigrationFiles::new(dir.path().join("absent"))),
        FileMigrationOptions::default(),
    );
    assert!(matches!(migrations.run(), Err(Error::Io(_))));
}

// ============================================================================
// Bookkeeping table
// ============================================================================

#[test]
fn test_non_default_schema_runs_twice() {
    let db = memory_db();
    db.execute("CREATE SCHEMA game").unwrap();
    let migrations = || {
        FileMigrationService::new(
            Arc::clone(&db),
            VersionStore::new(Arc::clone(&db), "game"),
            Box::new(EmbeddedMigrationFiles::new(&[
                ("1.sql", "CREATE TABLE game.players (id INTEGER);"),
            ])),
            FileMigrationOptions::default(),
        )
    };

    let first = migrations().run().unwrap();
    assert!(!first.has_failures());
    assert_eq!(first.final_version, 1);

    let second = migrations().run().unwrap();
    assert_eq!(second.starting_version, 1);
    assert_eq!(second.final_version, 1);
    assert_eq!(second.outcomes[0].status, FileStatus::AlreadyApplied);

    let game = MaintenanceService::new(Arc::clone(&db), "game");
    assert!(game.table_exists("server_config").unwrap());
    assert!(game.table_exists("players").unwrap());
    assert!(!versions(&db).schema_exists().unwrap());
}

#[test]
fn test_bootstrap_creates_missing_schema() {
    let db = memory_db();
    let versions = VersionStore::new(Arc::clone(&db), "game");

    assert_eq!(versions.sql_version().unwrap(), StoredVersion::At(0));
    assert!(versions.schema_exists().unwrap());
}

#[test]
fn test_bootstrap_create_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), &[("1.sql", "CREATE TABLE players (id INTEGER);")]);
    let faulty = Arc::new(FaultyDatabase::new());
    let db: Arc<dyn Database> = faulty.clone();
    faulty.fail_on("CREATE TABLE \"main\".server_config");

    let result = service(&db, &dir).run();

    assert!(matches!(result, Err(Error::Bootstrap(_))));
    assert!(!versions(&db).schema_exists().unwrap());
    assert!(!MaintenanceService::new(Arc::clone(&db), "main")
        .table_exists("players")
        .unwrap());
}

#[test]
fn test_bootstrap_seed_failure_leaves_no_table() {
    let faulty = Arc::new(FaultyDatabase::new());
    let db: Arc<dyn Database> = faulty.clone();
    faulty.fail_on("VALUES ('db_sql_version'");

    assert!(matches!(versions(&db).sql_version(), Err(Error::Bootstrap(_))));
    assert!(!versions(&db).schema_exists().unwrap());

    // Nothing half-seeded: the next attempt bootstraps cleanly
    faulty.clear_faults();
    assert_eq!(versions(&db).sql_version().unwrap(), StoredVersion::At(0));
    assert_eq!(
        versions(&db).logical_version().unwrap(),
        StoredVersion::At(0)
    );
}

// ============================================================================
// Pending and check
// ============================================================================

#[test]
fn test_pending_lists_files_without_bootstrapping() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("1.sql", "CREATE TABLE players (id INTEGER);"),
            ("2.sql", "CREATE TABLE guilds (id INTEGER);"),
        ],
    );
    let db = memory_db();
    let migrations = service(&db, &dir);

    let pending = migrations.pending().unwrap();

    assert_eq!(
        pending.iter().map(|p| p.version).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert!(!versions(&db).schema_exists().unwrap());
}

#[test]
fn test_check_reports_syntax_errors_without_executing() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            ("1.sql", "CREATE TABLE players (id INTEGER);"),
            ("2.sql", "CREATE TABLE guilds (id INTEGER; INSERT INTO guilds VALUES (1);"),
        ],
    );
    let db = memory_db();

    let checks = service(&db, &dir).check().unwrap();

    assert_eq!(checks.len(), 2);
    assert!(checks[0].is_clean());
    assert_eq!(checks[1].statements, 2);
    assert_eq!(checks[1].errors.len(), 1);
    let maintenance = MaintenanceService::new(Arc::clone(&db), "main");
    assert!(!maintenance.table_exists("players").unwrap());
}

/// Lists two files but cannot read the first
struct UnreadableFirstFile;

impl MigrationFiles for UnreadableFirstFile {
    fn list(&self) -> Result<Vec<String>> {
        Ok(vec!["1.sql".to_string(), "2.sql".to_string()])
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        match name {
            "1.sql" => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            ))),
            _ => Ok(b"CREATE TABLE guilds (id INTEGER);".to_vec()),
        }
    }
}

#[test]
fn test_check_reports_unreadable_file_and_continues() {
    let db = memory_db();
    let migrations = FileMigrationService::new(
        Arc::clone(&db),
        versions(&db),
        Box::new(UnreadableFirstFile),
        FileMigrationOptions::default(),
    );

    let checks = migrations.check().unwrap();

    assert_eq!(checks.len(), 2);
    assert_eq!(checks[0].file, "1.sql");
    assert_eq!(checks[0].errors.len(), 1);
    assert!(checks[0].errors[0].starts_with("failed to read file"));
    assert!(checks[1].is_clean());
    assert_eq!(checks[1].statements, 1);
}

#[test]
fn test_observer_sees_progress() {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), &[("1.sql", "CREATE TABLE players (id INTEGER);")]);
    let db = memory_db();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    service(&db, &dir)
        .with_observer(move |e| sink.lock().unwrap().push(e.to_string()))
        .run()
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events[0], "> Migrating to database version 1 (1.sql)...");
    assert_eq!(events[1], "> Database SQL version is now 1");
}
