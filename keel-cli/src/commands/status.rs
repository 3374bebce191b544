//! Status command - show schema versions

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use keel_core::{KeelContext, StoredVersion, VersionCounter};
use serde::Serialize;

use super::get_context;
use crate::output;

#[derive(Serialize)]
struct StatusOutput {
    database: String,
    schema: String,
    bookkeeping_table: bool,
    logical_version: StoredVersion,
    sql_version: StoredVersion,
    pending_files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_error: Option<String>,
}

/// Number of pending files, or why they could not be listed
fn pending_summary(ctx: &KeelContext) -> (Option<usize>, Option<String>) {
    match ctx.file_migrations.pending() {
        Ok(pending) => (Some(pending.len()), None),
        Err(e) => (None, Some(e.to_string())),
    }
}

pub fn run(dir: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let ctx = get_context(dir)?;

    let (pending_files, pending_error) = pending_summary(&ctx);

    let status = StatusOutput {
        database: ctx.config.database.display().to_string(),
        schema: ctx.config.schema.clone(),
        bookkeeping_table: ctx.versions.schema_exists()?,
        logical_version: ctx.versions.get(VersionCounter::Logical)?,
        sql_version: ctx.versions.get(VersionCounter::Sql)?,
        pending_files,
        pending_error,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(if status.pending_error.is_some() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    println!("{}", "Schema Status".bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Database", status.database.as_str()]);
    table.add_row(vec!["Schema", status.schema.as_str()]);
    table.add_row(vec![
        "Bookkeeping table",
        if status.bookkeeping_table { "present" } else { "absent" },
    ]);
    table.add_row(vec!["Logical version".to_string(), status.logical_version.to_string()]);
    table.add_row(vec!["SQL version".to_string(), status.sql_version.to_string()]);
    table.add_row(vec![
        "Pending files".to_string(),
        status
            .pending_files
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    ]);
    println!("{}", table);

    if status.logical_version == StoredVersion::Unknown || status.sql_version == StoredVersion::Unknown {
        output::warning("A version counter is missing from the bookkeeping table; migrations will refuse to run.");
        return Ok(ExitCode::FAILURE);
    }

    if let Some(error) = &status.pending_error {
        output::error(&format!("Could not list migration files: {}", error));
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
