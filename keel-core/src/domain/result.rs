//! Result and error types for the core library

use thiserror::Error;

use super::version::VersionCounter;

/// Core library error type
///
/// Per-unit migration failures (a bad statement, a script that declines) are
/// reported inside the run reports. The variants here are what escapes a call.
#[derive(Error, Debug)]
pub enum Error {
    /// The database could not be reached or queried
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Raw driver error, not yet classified by the calling service
    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Statement failed: {0}")]
    StatementFailure(String),

    #[error("Script error in migration {version}: {message}")]
    Script { version: i64, message: String },

    #[error("Execution error in migration {version}: {message}")]
    Execution { version: i64, message: String },

    #[error("Migration {version} declined completion")]
    DeclinedCompletion { version: i64 },

    /// Bookkeeping table exists but the counter key is missing
    #[error("Unknown {0} version: bookkeeping table exists but the counter is missing")]
    UnknownVersion(VersionCounter),

    /// The bookkeeping table could not be created
    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a storage unavailable error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Re-classify any error coming out of the database port as unavailable storage.
    ///
    /// Errors that already carry a more specific meaning pass through unchanged.
    pub fn into_storage(self) -> Self {
        match self {
            Self::Database(msg) => Self::StorageUnavailable(msg),
            other => other,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
