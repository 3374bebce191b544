//! Migration file source port

use crate::domain::result::Result;

/// Where SQL migration files come from
///
/// Implementations list every file name they hold; filtering by extension
/// and ordering are done by the migration service.
pub trait MigrationFiles: Send + Sync {
    /// File names (not paths) available in the source
    fn list(&self) -> Result<Vec<String>>;

    /// Full raw content of one file
    fn read(&self, name: &str) -> Result<Vec<u8>>;
}
