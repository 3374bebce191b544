//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators: the database, the
//! source of SQL migration files, and the scripted migration runtime. The
//! services depend only on these traits, not on concrete implementations.

mod database;
mod files;
mod script;

pub use database::{Database, ResultSet};
pub use files::MigrationFiles;
pub use script::{ResultId, ScriptEnv, ScriptRuntime, ScriptSource, ScriptUnit};
