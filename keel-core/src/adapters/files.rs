//! Migration file sources: a directory on disk, or files compiled into the binary

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::result::{Error, Result};
use crate::ports::MigrationFiles;

/// Migration files read from a directory
///
/// Only regular files directly inside the directory are listed.
pub struct DirectoryMigrationFiles {
    dir: PathBuf,
}

impl DirectoryMigrationFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MigrationFiles for DirectoryMigrationFiles {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => log::warn!("Ignoring migration file with non UTF-8 name: {:?}", raw),
            }
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.dir.join(name))?)
    }
}

/// Migration files embedded at compile time
///
/// Format: (filename, sql_content)
///
/// ```ignore
/// const MIGRATIONS: &[(&str, &str)] = &[
///     ("001_initial_schema.sql", include_str!("migrations/001_initial_schema.sql")),
/// ];
/// let files = EmbeddedMigrationFiles::new(MIGRATIONS);
/// ```
pub struct EmbeddedMigrationFiles {
    files: &'static [(&'static str, &'static str)],
}

impl EmbeddedMigrationFiles {
    pub fn new(files: &'static [(&'static str, &'static str)]) -> Self {
        Self { files }
    }
}

impl MigrationFiles for EmbeddedMigrationFiles {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.files.iter().map(|(name, _)| name.to_string()).collect())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, sql)| sql.as_bytes().to_vec())
            .ok_or_else(|| Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no embedded migration named '{}'", name),
            )))
    }
}
