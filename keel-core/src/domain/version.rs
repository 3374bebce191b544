//! Schema version counters

use std::fmt;

use serde::Serialize;

/// Name of the bookkeeping table that stores both counters
pub const BOOKKEEPING_TABLE: &str = "server_config";

/// The two independent version counters kept in the bookkeeping table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionCounter {
    /// Advanced one step at a time by scripted migrations
    Logical,
    /// Jumps to the declared version of each applied SQL file
    Sql,
}

impl VersionCounter {
    /// Config key the counter is persisted under
    pub fn key(&self) -> &'static str {
        match self {
            VersionCounter::Logical => "db_version",
            VersionCounter::Sql => "db_sql_version",
        }
    }
}

impl fmt::Display for VersionCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionCounter::Logical => write!(f, "logical"),
            VersionCounter::Sql => write!(f, "SQL"),
        }
    }
}

/// A counter as read from storage
///
/// `Unknown` means the bookkeeping table exists but the key is missing.
/// It is never the same thing as version 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "version")]
pub enum StoredVersion {
    At(i64),
    Unknown,
}

impl StoredVersion {
    /// The known version, if any
    pub fn known(&self) -> Option<i64> {
        match self {
            StoredVersion::At(v) => Some(*v),
            StoredVersion::Unknown => None,
        }
    }
}

impl fmt::Display for StoredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredVersion::At(v) => write!(f, "{}", v),
            StoredVersion::Unknown => write!(f, "unknown"),
        }
    }
}
