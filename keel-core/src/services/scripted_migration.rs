//! Scripted migration service - runs version-numbered migration units
//!
//! Units are assumed to depend on each other in sequence, so the first unit
//! that cannot be loaded, faults, or declines completion stops the run.

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{
    EventObserver, MigrationEvent, ScriptedMigrationReport, StopReason, StoredVersion,
    VersionCounter,
};
use crate::ports::{Database, ScriptEnv, ScriptSource};

use super::version::VersionStore;

/// State of a scripted run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// About to load the unit for `version`
    Running { version: i64 },
    Stopped(StopReason),
}

/// Service running scripted migration units
pub struct ScriptedMigrationService {
    db: Arc<dyn Database>,
    versions: VersionStore,
    source: Box<dyn ScriptSource>,
    observer: Option<EventObserver>,
}

impl ScriptedMigrationService {
    pub fn new(db: Arc<dyn Database>, versions: VersionStore, source: Box<dyn ScriptSource>) -> Self {
        Self {
            db,
            versions,
            source,
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

    /// Run units from the current logical version until one is missing or fails
    ///
    /// An unknown logical version halts before any unit is loaded.
    pub fn run(&self) -> Result<ScriptedMigrationReport> {
        let starting_version = match self.versions.logical_version()? {
            StoredVersion::At(v) => v,
            StoredVersion::Unknown => {
                return Err(Error::UnknownVersion(VersionCounter::Logical))
            }
        };

        let mut applied = Vec::new();
        let mut state = RunState::Running {
            version: starting_version,
        };

        let stop = loop {
            state = match state {
                RunState::Running { version } => {
                    let next = self.step(version)?;
                    if let RunState::Running { .. } = next {
                        applied.push(version);
                    }
                    next
                }
                RunState::Stopped(reason) => break reason,
            };
        };

        self.emit(MigrationEvent::ScriptStopped {
            reason: stop.clone(),
        });

        Ok(ScriptedMigrationReport {
            starting_version,
            final_version: starting_version + applied.len() as i64,
            applied,
            stop,
        })
    }

    /// Load and run the unit for `version`
    ///
    /// The bindings handed to the unit are dropped before this returns.
    fn step(&self, version: i64) -> Result<RunState> {
        let unit = match self.source.load_unit(version) {
            Ok(Some(unit)) => unit,
            Ok(None) => return Ok(RunState::Stopped(StopReason::UpToDate)),
            Err(e) => {
                return Ok(RunState::Stopped(StopReason::ScriptError {
                    version,
                    message: format!("{:#}", e),
                }))
            }
        };

        let outcome = {
            let mut env = ScriptEnv::new(self.db.as_ref());
            unit.run(&mut env)
        };

        match outcome {
            Err(e) => Ok(RunState::Stopped(StopReason::ExecutionError {
                version,
                message: format!("{:#}", e),
            })),
            Ok(false) => Ok(RunState::Stopped(StopReason::DeclinedCompletion { version })),
            Ok(true) => {
                let next = version + 1;
                self.versions
                    .advance(VersionCounter::Logical, next)
                    .map_err(Error::into_storage)?;
                self.emit(MigrationEvent::ScriptApplied { version: next });
                Ok(RunState::Running { version: next })
            }
        }
    }

    fn emit(&self, event: MigrationEvent) {
        match &event {
            MigrationEvent::ScriptStopped { reason } if !reason.is_success() => {
                log::warn!("{}", event)
            }
            _ => log::info!("{}", event),
        }
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}
