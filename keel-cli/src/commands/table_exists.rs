//! Table-exists command - exit status tells whether a table exists

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use super::get_context;

pub fn run(dir: Option<PathBuf>, name: &str) -> Result<ExitCode> {
    let ctx = get_context(dir)?;
    if ctx.maintenance.table_exists(name)? {
        println!("{}.{} exists", ctx.config.schema, name);
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}.{} does not exist", ctx.config.schema, name);
        Ok(ExitCode::FAILURE)
    }
}
