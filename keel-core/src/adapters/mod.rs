//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Database port
//! - Local filesystem and compiled-in files for MigrationFiles
//! - Rust closures and version-named script files for ScriptSource

pub mod duckdb;
pub mod files;
pub mod scripts;
