//! Service layer - migration orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! receives the database handle it works on; none of them share state
//! beyond that handle.

mod config_store;
pub mod file_migration;
mod maintenance;
pub mod scripted_migration;
mod version;

pub use config_store::{ConfigEntry, ConfigStore};
pub use file_migration::{FileMigrationOptions, FileMigrationService};
pub use maintenance::{quote_identifier, MaintenanceService};
pub use scripted_migration::{RunState, ScriptedMigrationService};
pub use version::VersionStore;
