//! Error types for directory storage.

use std::path::PathBuf;

use metis_rbac::LookupError;
use thiserror::Error;

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors raised by directory storage.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },

    /// A record with the same id (or identity name) already exists.
    #[error("{kind} {id} already exists")]
    Conflict { kind: &'static str, id: String },

    /// A record refers to an identity or container that does not exist.
    #[error("{kind} {id} does not exist")]
    MissingReference { kind: &'static str, id: String },

    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("invalid seed data: {0}")]
    InvalidSeed(String),

    #[error("directory lock poisoned")]
    LockPoisoned,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file: {0}")]
    SeedFormat(#[from] toml::de::Error),
}

impl DirectoryError {
    pub(crate) fn conflict(kind: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn missing(kind: &'static str, id: impl ToString) -> Self {
        Self::MissingReference {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<DirectoryError> for LookupError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::LockPoisoned | DirectoryError::Io { .. } => {
                LookupError::Unavailable(err.to_string())
            }
            other => LookupError::Query(other.to_string()),
        }
    }
}
