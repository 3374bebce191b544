//! Check command - validate pending migration files without executing them

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};

use super::get_context;
use crate::output;

pub fn run(dir: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let ctx = get_context(dir)?;
    let checks = ctx.file_migrations.check()?;
    let error_count: usize = checks.iter().map(|c| c.errors.len()).sum();

    if json {
        println!("{}", serde_json::to_string_pretty(&checks)?);
        return Ok(if error_count > 0 {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    if checks.is_empty() {
        output::success("No pending migration files.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Migration Check".bold());
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["File", "Statements", "Triggers", "Status"]);
    for check in &checks {
        let status = if !check.errors.is_empty() {
            Cell::new("ERROR").fg(Color::Red)
        } else if !check.warnings.is_empty() {
            Cell::new("WARN").fg(Color::Yellow)
        } else {
            Cell::new("OK").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(&check.file),
            Cell::new(check.statements),
            Cell::new(check.triggers),
            status,
        ]);
    }
    println!("{}", table);

    for check in &checks {
        for warning in &check.warnings {
            output::warning(&format!("{}: {}", check.file, warning));
        }
        for error in &check.errors {
            output::error(&format!("{}: {}", check.file, error));
        }
    }

    if error_count > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
