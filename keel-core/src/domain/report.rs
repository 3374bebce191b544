//! Run reports and progress events

use std::fmt;

use serde::Serialize;

/// What happened to one migration file during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FileStatus {
    /// Committed; the SQL version now equals the file's version
    Applied { statements: usize, triggers: usize },
    /// Declared version is not above the current SQL version
    AlreadyApplied,
    /// Filename carries no usable version number
    Skipped { reason: String },
    /// Rolled back; the SQL version was not advanced
    Failed { error: String, rolled_back: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file: String,
    pub version: Option<i64>,
    #[serde(flatten)]
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// Result of a file-based migration run
#[derive(Debug, Clone, Serialize)]
pub struct FileMigrationReport {
    pub starting_version: i64,
    /// SQL version reached at the end of the run
    pub final_version: i64,
    pub outcomes: Vec<FileOutcome>,
    /// True when the run halted early because of `stop_on_failure`
    pub halted: bool,
}

impl FileMigrationReport {
    pub fn applied(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, FileStatus::Applied { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// Why the scripted runner stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StopReason {
    /// No unit exists for the next version
    UpToDate,
    /// The unit for `version` could not be loaded
    ScriptError { version: i64, message: String },
    /// The unit for `version` faulted while running
    ExecutionError { version: i64, message: String },
    /// The unit for `version` returned false
    DeclinedCompletion { version: i64 },
}

impl StopReason {
    pub fn is_success(&self) -> bool {
        matches!(self, StopReason::UpToDate)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::UpToDate => write!(f, "up to date"),
            StopReason::ScriptError { version, message } => {
                write!(f, "failed to load migration {}: {}", version, message)
            }
            StopReason::ExecutionError { version, message } => {
                write!(f, "migration {} failed: {}", version, message)
            }
            StopReason::DeclinedCompletion { version } => {
                write!(f, "migration {} declined completion", version)
            }
        }
    }
}

/// Result of a scripted migration run
#[derive(Debug, Clone, Serialize)]
pub struct ScriptedMigrationReport {
    pub starting_version: i64,
    pub final_version: i64,
    /// Versions whose units ran and returned true, in order
    pub applied: Vec<i64>,
    pub stop: StopReason,
}

/// Combined result of a full migrate pass
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub files: FileMigrationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<ScriptedMigrationReport>,
}

impl MigrationSummary {
    /// True if any file failed or the scripted run stopped short
    pub fn has_failures(&self) -> bool {
        self.files.has_failures()
            || self
                .scripts
                .as_ref()
                .is_some_and(|s| !s.stop.is_success())
    }
}

/// Progress events emitted while migrations run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    FileStarted { file: String, version: i64 },
    FileApplied { file: String, version: i64 },
    FileFailed { file: String, version: i64, error: String, rolled_back: bool },
    FileSkipped { file: String, reason: String },
    FileWarning { file: String, warning: String },
    ScriptApplied { version: i64 },
    ScriptStopped { reason: StopReason },
}

impl fmt::Display for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationEvent::FileStarted { file, version } => {
                write!(f, "> Migrating to database version {} ({})...", version, file)
            }
            MigrationEvent::FileApplied { version, .. } => {
                write!(f, "> Database SQL version is now {}", version)
            }
            MigrationEvent::FileFailed {
                file,
                error,
                rolled_back,
                ..
            } => {
                if *rolled_back {
                    write!(f, "> {} failed, rolled back: {}", file, error)
                } else {
                    write!(f, "> {} failed: {}", file, error)
                }
            }
            MigrationEvent::FileSkipped { file, reason } => {
                write!(f, "> Skipping {}: {}", file, reason)
            }
            MigrationEvent::FileWarning { file, warning } => {
                write!(f, "> Warning in {}: {}", file, warning)
            }
            MigrationEvent::ScriptApplied { version } => {
                write!(f, "> Database has been updated to version {}.", version)
            }
            MigrationEvent::ScriptStopped { reason } => {
                write!(f, "> Scripted migrations stopped: {}", reason)
            }
        }
    }
}

/// Per-table result of an optimize pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOptimization {
    pub table: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizeReport {
    pub tables: Vec<TableOptimization>,
}

impl OptimizeReport {
    pub fn failures(&self) -> usize {
        self.tables.iter().filter(|t| !t.success).count()
    }
}

/// Callback receiving progress events
pub type EventObserver = Box<dyn Fn(&MigrationEvent) + Send + Sync>;

/// Dry-run diagnostics for one pending migration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCheck {
    pub file: String,
    pub version: i64,
    pub statements: usize,
    pub triggers: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Syntax errors, one per failing statement
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl FileCheck {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}
