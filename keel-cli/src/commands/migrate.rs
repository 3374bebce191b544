//! Migrate command - apply pending SQL migration files

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};
use keel_core::domain::{FileStatus, MigrationEvent};

use super::get_context_with;
use crate::output;

fn print_event(event: &MigrationEvent) {
    let line = event.to_string();
    match event {
        MigrationEvent::FileFailed { .. } => output::error(&line),
        MigrationEvent::FileSkipped { .. } | MigrationEvent::FileWarning { .. } => {
            output::warning(&line)
        }
        MigrationEvent::FileApplied { .. } => output::success(&line),
        _ => output::info(&line),
    }
}

pub fn run(dir: Option<PathBuf>, stop_on_failure: bool, json: bool) -> Result<ExitCode> {
    let ctx = get_context_with(dir, |config| {
        if stop_on_failure {
            config.stop_on_failure = true;
        }
    })?;

    let migrations = if json {
        ctx.file_migrations
    } else {
        ctx.file_migrations.with_observer(print_event)
    };

    let report = migrations.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.has_failures() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    if report.outcomes.is_empty() {
        output::info("No migration files found.");
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    let mut table = output::create_table();
    table.set_header(vec!["File", "Version", "Result"]);
    for outcome in &report.outcomes {
        let result = match &outcome.status {
            FileStatus::Applied {
                statements,
                triggers,
            } => Cell::new(format!("applied ({} statements, {} triggers)", statements, triggers))
                .fg(Color::Green),
            FileStatus::AlreadyApplied => Cell::new("already applied"),
            FileStatus::Skipped { reason } => Cell::new(format!("skipped: {}", reason)).fg(Color::Yellow),
            FileStatus::Failed { error, .. } => Cell::new(format!("failed: {}", error)).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(&outcome.file),
            Cell::new(outcome.version.map(|v| v.to_string()).unwrap_or_default()),
            result,
        ]);
    }
    println!("{}", table);
    println!();

    println!(
        "SQL version: {} -> {}",
        report.starting_version,
        report.final_version.to_string().bold()
    );

    if report.halted {
        output::warning("Stopped after the first failure (stop on failure is enabled).");
    }

    if report.has_failures() {
        output::error(&format!("{} migration file(s) failed", report.failed().count()));
        return Ok(ExitCode::FAILURE);
    }

    output::success(&format!("{} migration file(s) applied", report.applied().count()));
    Ok(ExitCode::SUCCESS)
}
