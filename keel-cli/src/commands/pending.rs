//! Pending command - list migration files a run would apply

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(dir: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let ctx = get_context(dir)?;
    let pending = ctx.file_migrations.pending()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(ExitCode::SUCCESS);
    }

    if pending.is_empty() {
        output::success("Database is up to date.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = output::create_table();
    table.set_header(vec!["Version", "File"]);
    for file in &pending {
        table.add_row(vec![file.version.to_string(), file.name.clone()]);
    }
    println!("{}", table);
    output::info(&format!("{} pending migration file(s)", pending.len()));

    Ok(ExitCode::SUCCESS)
}
