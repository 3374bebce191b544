//! Configuration management
//!
//! Settings live in `keel.json` inside the project directory. Every field is
//! optional:
//! ```json
//! {
//!   "database": "keel.duckdb",
//!   "schema": "main",
//!   "sqlMigrationsDir": "db/migrations",
//!   "sqlExtension": ".sql",
//!   "stopOnFailure": false
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::services::FileMigrationOptions;

pub const SETTINGS_FILE: &str = "keel.json";

/// Raw keel.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sql_migrations_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sql_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop_on_failure: Option<bool>,
    /// Keys this version does not manage, preserved on save
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Keel configuration, with paths resolved against the project directory
#[derive(Debug, Clone)]
pub struct Config {
    pub database: PathBuf,
    pub schema: String,
    pub sql_migrations_dir: PathBuf,
    pub sql_extension: String,
    pub stop_on_failure: bool,
}

impl Config {
    /// Defaults for a project directory
    pub fn defaults(project_dir: &Path) -> Self {
        Self {
            database: project_dir.join("keel.duckdb"),
            schema: "main".to_string(),
            sql_migrations_dir: project_dir.join("db").join("migrations"),
            sql_extension: ".sql".to_string(),
            stop_on_failure: false,
        }
    }

    /// Load config from a project directory
    ///
    /// Environment variables override the file:
    /// `KEEL_DATABASE`, `KEEL_SCHEMA`, `KEEL_SQL_MIGRATIONS_DIR`, `KEEL_STOP_ON_FAILURE`.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let raw = read_settings(project_dir)?;
        let defaults = Self::defaults(project_dir);

        let database = env_or("KEEL_DATABASE", raw.database)
            .map(|p| project_dir.join(p))
            .unwrap_or(defaults.database);
        let schema = env_or("KEEL_SCHEMA", raw.schema).unwrap_or(defaults.schema);
        let sql_migrations_dir = env_or("KEEL_SQL_MIGRATIONS_DIR", raw.sql_migrations_dir)
            .map(|p| project_dir.join(p))
            .unwrap_or(defaults.sql_migrations_dir);
        let sql_extension = raw.sql_extension.unwrap_or(defaults.sql_extension);

        let stop_on_failure = match std::env::var("KEEL_STOP_ON_FAILURE").ok().as_deref() {
            Some(value) => parse_flag(value).ok_or_else(|| {
                Error::Config(format!("KEEL_STOP_ON_FAILURE must be a boolean, got '{}'", value))
            })?,
            None => raw.stop_on_failure.unwrap_or(defaults.stop_on_failure),
        };

        if schema.trim().is_empty() {
            return Err(Error::Config("schema must not be empty".to_string()));
        }
        if !sql_extension.starts_with('.') || sql_extension.len() < 2 {
            return Err(Error::Config(format!(
                "sqlExtension must look like '.sql', got '{}'",
                sql_extension
            )));
        }

        Ok(Self {
            database,
            schema,
            sql_migrations_dir,
            sql_extension,
            stop_on_failure,
        })
    }

    /// Save the managed settings, preserving keys this version does not manage
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let mut settings = read_settings(project_dir)?;

        settings.database = Some(relative_to(&self.database, project_dir));
        settings.schema = Some(self.schema.clone());
        settings.sql_migrations_dir = Some(relative_to(&self.sql_migrations_dir, project_dir));
        settings.sql_extension = Some(self.sql_extension.clone());
        settings.stop_on_failure = Some(self.stop_on_failure);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(project_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Options for the file migration service
    pub fn file_migration_options(&self) -> FileMigrationOptions {
        FileMigrationOptions {
            extension: self.sql_extension.clone(),
            stop_on_failure: self.stop_on_failure,
        }
    }
}

fn read_settings(project_dir: &Path) -> Result<SettingsFile> {
    let settings_path = project_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("invalid {}: {}", settings_path.display(), e)))
}

fn env_or(name: &str, fallback: Option<String>) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .or(fallback)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "TRUE" | "YES" => Some(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}
