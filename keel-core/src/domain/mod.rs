//! Core domain types
//!
//! Version counters, migration files, SQL text parsing and run reports.
//! Pure data structures and parsing - no I/O.

pub mod migration_file;
pub mod report;
pub mod result;
pub mod sql_text;
pub mod version;

pub use migration_file::{MigrationFile, NormalizedSql, PendingFile};
pub use report::{
    EventObserver, FileCheck, FileMigrationReport, FileOutcome, FileStatus, MigrationEvent,
    MigrationSummary, OptimizeReport, ScriptedMigrationReport, StopReason, TableOptimization,
};
pub use sql_text::ParsedMigration;
pub use version::{StoredVersion, VersionCounter, BOOKKEEPING_TABLE};
