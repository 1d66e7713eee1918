//! Store errors

use rusqlite::ErrorCode;
use std::fmt;
use thiserror::Error;

/// Errors returned by [`crate::Store`] operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The arguments were rejected before any storage access
    #[error("{0}")]
    Precondition(Precondition),

    /// A single-row lookup matched nothing
    #[error("{0} not found")]
    NotFound(Entity),

    /// The cancellation token fired before or during execution
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Sqlite(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Argument checks that short-circuit a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    NoIds,
    NoLabels,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoIds => f.write_str("no IDs provided"),
            Self::NoLabels => f.write_str("no labels provided"),
        }
    }
}

/// What a lookup was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    MasterKey,
    Secret,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MasterKey => f.write_str("master key"),
            Self::Secret => f.write_str("secret"),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            // Raised when the progress handler aborts a statement.
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted => {
                Self::Cancelled
            }
            other => Self::Sqlite(other),
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
