//! CLI command implementations

pub mod check;
pub mod config;
pub mod migrate;
pub mod optimize;
pub mod pending;
pub mod status;
pub mod table_exists;

use std::path::PathBuf;

use anyhow::{Context, Result};
use keel_core::config::Config;
use keel_core::KeelContext;

/// Project directory from `--dir`/`KEEL_DIR`, or the current directory
pub fn get_project_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

/// Open the project's database and build the context
pub fn get_context(dir: Option<PathBuf>) -> Result<KeelContext> {
    get_context_with(dir, |_| {})
}

/// Like [`get_context`], letting command-line flags adjust the loaded config
pub fn get_context_with(dir: Option<PathBuf>, adjust: impl FnOnce(&mut Config)) -> Result<KeelContext> {
    let project_dir = get_project_dir(dir)?;
    let mut config = Config::load(&project_dir)
        .with_context(|| format!("Failed to load configuration from {}", project_dir.display()))?;
    adjust(&mut config);
    KeelContext::open(config).with_context(|| {
        format!(
            "Failed to initialize keel context in {}",
            project_dir.display()
        )
    })
}
