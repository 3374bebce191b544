//! Scripted migration sources
//!
//! - [`ScriptRegistry`]: units written in Rust and registered per version
//! - [`DirectoryScriptSource`]: one file per version (`<dir>/<version>.<ext>`)
//!   compiled by a pluggable [`ScriptRuntime`]

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::ports::{ScriptEnv, ScriptRuntime, ScriptSource, ScriptUnit};

type UnitFn = dyn Fn(&mut ScriptEnv<'_>) -> Result<bool> + Send + Sync;

/// Code-first migration units keyed by version
///
/// ```ignore
/// let registry = ScriptRegistry::new()
///     .with(0, |env| Ok(env.execute("ALTER TABLE players ADD COLUMN stamina INTEGER DEFAULT 0")))
///     .with(1, |env| Ok(env.execute("UPDATE players SET stamina = 2520")));
/// ```
#[derive(Default)]
pub struct ScriptRegistry {
    units: BTreeMap<i64, Box<UnitFn>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the unit for `version`, replacing any previous one
    pub fn register<F>(&mut self, version: i64, unit: F)
    where
        F: Fn(&mut ScriptEnv<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        self.units.insert(version, Box::new(unit));
    }

    /// Builder form of [`ScriptRegistry::register`]
    pub fn with<F>(mut self, version: i64, unit: F) -> Self
    where
        F: Fn(&mut ScriptEnv<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        self.register(version, unit);
        self
    }

    pub fn versions(&self) -> Vec<i64> {
        self.units.keys().copied().collect()
    }
}

struct RegisteredUnit<'a>(&'a UnitFn);

impl ScriptUnit for RegisteredUnit<'_> {
    fn run(&self, env: &mut ScriptEnv<'_>) -> Result<bool> {
        (self.0)(env)
    }
}

impl ScriptSource for ScriptRegistry {
    fn load_unit(&self, version: i64) -> Result<Option<Box<dyn ScriptUnit + '_>>> {
        Ok(self
            .units
            .get(&version)
            .map(|unit| Box::new(RegisteredUnit(unit.as_ref())) as Box<dyn ScriptUnit + '_>))
    }
}

/// Script files named after their version, compiled on load
pub struct DirectoryScriptSource<R> {
    dir: PathBuf,
    extension: String,
    runtime: R,
}

impl<R: ScriptRuntime> DirectoryScriptSource<R> {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, runtime: R) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
            runtime,
        }
    }

    /// Path of the unit for `version`
    pub fn unit_path(&self, version: i64) -> PathBuf {
        self.dir.join(format!("{}.{}", version, self.extension))
    }
}

impl<R: ScriptRuntime> ScriptSource for DirectoryScriptSource<R> {
    fn load_unit(&self, version: i64) -> Result<Option<Box<dyn ScriptUnit + '_>>> {
        let path = self.unit_path(version);
        if !path.is_file() {
            return Ok(None);
        }

        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path.display().to_string();
        let unit = self
            .runtime
            .compile(&name, &source)
            .with_context(|| format!("Failed to load {}", name))?;
        Ok(Some(unit))
    }
}
