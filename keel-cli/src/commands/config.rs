//! Config command - read or write bookkeeping entries

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print one entry, or every entry when no key is given
    Get {
        key: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store an integer entry
    Set { key: String, value: i64 },
}

pub fn run(dir: Option<PathBuf>, command: ConfigCommands) -> Result<ExitCode> {
    let ctx = get_context(dir)?;

    match command {
        ConfigCommands::Get { key: Some(key), json } => {
            if !ctx.versions.schema_exists()? {
                output::warning("Bookkeeping table does not exist yet.");
                return Ok(ExitCode::FAILURE);
            }
            let value = ctx.config_store.get(&key)?;
            if json {
                println!("{}", serde_json::json!({ "key": key, "value": value }));
                return Ok(ExitCode::SUCCESS);
            }
            match value {
                Some(value) => {
                    println!("{}", value);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    output::warning(&format!("No entry for '{}'", key));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        ConfigCommands::Get { key: None, json } => {
            let entries = if ctx.versions.schema_exists()? {
                ctx.config_store.entries()?
            } else {
                Vec::new()
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(ExitCode::SUCCESS);
            }
            let mut table = output::create_table();
            table.set_header(vec!["Key", "Value"]);
            for entry in &entries {
                table.add_row(vec![entry.key.clone(), entry.value.to_string()]);
            }
            println!("{}", table);
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommands::Set { key, value } => {
            if !ctx.versions.schema_exists()? {
                // First write creates and seeds the table
                ctx.versions.sql_version()?;
            }
            ctx.config_store.set(&key, value)?;
            output::success(&format!("{} = {}", key, value));
            Ok(ExitCode::SUCCESS)
        }
    }
}
