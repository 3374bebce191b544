//! Optimize command - compact tables with reclaimable space

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(dir: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let ctx = get_context(dir)?;
    let report = ctx.maintenance.optimize()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.tables.is_empty() {
        output::info("Nothing to optimize.");
    } else {
        for table in &report.tables {
            match &table.error {
                None => output::success(&format!("> Optimizing table {} [success]", table.table)),
                Some(e) => output::error(&format!("> Optimizing table {} [failed]: {}", table.table, e)),
            }
        }
    }

    if report.failures() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
