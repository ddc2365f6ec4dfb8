//! Error types for migration discovery and execution

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// A migration file name that does not follow `{version}_{title}.{up|down}.{extension}`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("{0} does not follow the format {{version}}_{{title}}.{{up|down}}.{{extension}}")]
    SegmentCount(String),

    #[error("{0} is not a valid file name")]
    MissingSeparator(String),

    #[error("{value} is not a valid migration number: {source}")]
    InvalidNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{0} is not a valid type. Needs to be 'up' or 'down'")]
    InvalidDirection(String),
}

/// Errors that stop a migration run
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Migrations directory or script could not be read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Either database could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// A migration script was rejected by the target database
    #[error("Failed to execute migration {migration}: {message}")]
    Execution { migration: String, message: String },

    /// The tracking table could not be read or written
    #[error("Migration state error: {0}")]
    State(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Invalid migration title '{0}'")]
    InvalidTitle(String),

    #[error("Migration file {} already exists", .0.display())]
    AlreadyExists(PathBuf),
}

impl MigrationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable label for structured error events
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationError::Io { .. } => "io",
            MigrationError::Connection(_) => "connection",
            MigrationError::Execution { .. } => "execution",
            MigrationError::State(_) => "state",
            MigrationError::Format(_) => "format",
            MigrationError::InvalidTitle(_) => "invalid_title",
            MigrationError::AlreadyExists(_) => "already_exists",
        }
    }
}
