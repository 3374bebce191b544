//! Keel CLI - versioned schema migrations from your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{check, config, migrate, optimize, pending, status, table_exists};

/// Keel - versioned schema migrations for DuckDB
#[derive(Parser)]
#[command(name = "keel", version, about, long_about = None)]
struct Cli {
    /// Project directory holding keel.json
    #[arg(long, global = true, env = "KEEL_DIR")]
    dir: Option<PathBuf>,

    /// Print library log lines to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show both schema versions and the bookkeeping table state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply pending SQL migration files
    Migrate {
        /// Halt after the first failed file
        #[arg(long)]
        stop_on_failure: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List migration files a run would apply
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate pending migration files without executing them
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compact tables with reclaimable space
    Optimize {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a table exists in the configured schema
    TableExists {
        /// Table name
        name: String,
    },

    /// Read or write bookkeeping entries
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    output::init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let dir = cli.dir;
    match cli.command {
        Commands::Status { json } => status::run(dir, json),
        Commands::Migrate {
            stop_on_failure,
            json,
        } => migrate::run(dir, stop_on_failure, json),
        Commands::Pending { json } => pending::run(dir, json),
        Commands::Check { json } => check::run(dir, json),
        Commands::Optimize { json } => optimize::run(dir, json),
        Commands::TableExists { name } => table_exists::run(dir, &name),
        Commands::Config { command } => config::run(dir, command),
    }
}
