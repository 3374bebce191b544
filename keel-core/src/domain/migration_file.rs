//! Migration file model and filename/content parsing
//!
//! A migration file declares its version in its filename (`7.sql`,
//! `v7_add_index.sql`, `007-add-index.sql`). Its raw bytes go through a
//! structured parse: [`NormalizedSql::from_bytes`] strips transport artifacts,
//! then [`crate::domain::sql_text::parse_migration`] extracts trigger blocks and
//! splits the remaining statements.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::result::{Error, Result};

fn version_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"^[vV]?([0-9]+)").expect("static regex is valid"))
}

/// Parse the declared version number out of a migration filename
pub fn parse_file_version(file_name: &str) -> Result<i64> {
    let digits = version_token()
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::parse(format!("no version number in filename '{}'", file_name)))?;

    digits
        .parse::<i64>()
        .map_err(|e| Error::parse(format!("invalid version '{}' in '{}': {}", digits, file_name, e)))
}

/// Check whether a filename carries the migration extension
pub fn has_extension(file_name: &str, extension: &str) -> bool {
    file_name.len() > extension.len() && file_name.ends_with(extension)
}

/// A migration file as read from its source
#[derive(Debug, Clone)]
pub struct MigrationFile {
    pub version: i64,
    pub name: String,
    pub raw: Vec<u8>,
}

impl MigrationFile {
    pub fn new(name: impl Into<String>, raw: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let version = parse_file_version(&name)?;
        Ok(Self { version, name, raw })
    }

    /// Consume the file into normalized SQL text
    pub fn normalize(self) -> NormalizedSql {
        NormalizedSql::from_bytes(&self.raw)
    }
}

/// A pending migration file, as listed before anything is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingFile {
    pub name: String,
    pub version: i64,
}

/// SQL text with transport artifacts removed
///
/// Line breaks and tabs become spaces, backslash escapes are dropped, and
/// anything outside printable ASCII is removed. The result is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSql(String);

impl NormalizedSql {
    pub fn from_bytes(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '\n' | '\r' | '\t' => out.push(' '),
                '\\' => {}
                c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
                _ => {}
            }
        }
        Self(out.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_version() {
        assert_eq!(parse_file_version("7.sql").unwrap(), 7);
    }

    #[test]
    fn test_parse_prefixed_version() {
        assert_eq!(parse_file_version("v12_add_index.sql").unwrap(), 12);
        assert_eq!(parse_file_version("V3.sql").unwrap(), 3);
    }

    #[test]
    fn test_parse_zero_padded_version() {
        assert_eq!(parse_file_version("007-players.sql").unwrap(), 7);
    }

    #[test]
    fn test_parse_rejects_missing_digits() {
        assert!(matches!(parse_file_version("init.sql"), Err(Error::Parse(_))));
        assert!(matches!(parse_file_version("v.sql"), Err(Error::Parse(_))));
        assert!(matches!(parse_file_version("_1.sql"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(matches!(
            parse_file_version("99999999999999999999999.sql"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("1.sql", ".sql"));
        assert!(!has_extension(".sql", ".sql"));
        assert!(!has_extension("1.sql.bak", ".sql"));
        assert!(!has_extension("1.lua", ".sql"));
    }

    #[test]
    fn test_normalize_line_breaks_and_tabs() {
        let sql = NormalizedSql::from_bytes(b"CREATE TABLE t (\r\n\tid INT\n);\n");
        assert_eq!(sql.as_str(), "CREATE TABLE t (   id INT );");
    }

    #[test]
    fn test_normalize_drops_backslashes_and_non_ascii() {
        let sql = NormalizedSql::from_bytes("INSERT INTO t VALUES ('caf\u{e9}\\n');".as_bytes());
        assert_eq!(sql.as_str(), "INSERT INTO t VALUES ('cafn');");
    }

    #[test]
    fn test_normalize_strips_nul_and_trims() {
        let sql = NormalizedSql::from_bytes(b"  \0SELECT 1;\0  ");
        assert_eq!(sql.as_str(), "SELECT 1;");
    }

    #[test]
    fn test_migration_file_new_rejects_bad_name() {
        assert!(MigrationFile::new("notes.sql", Vec::new()).is_err());
    }
}
