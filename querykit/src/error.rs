//! Error types for the registry and connection layer.

use std::fmt;

use thiserror::Error;

/// Result type for registry and connection operations.
pub type DbResult<T> = Result<T, DbError>;

/// An integer that cannot be read as a boolean because it is neither `0`
/// nor `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBoolean(pub i64);

impl fmt::Display for InvalidBoolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "integer {} is not a boolean (expected 0 or 1)", self.0)
    }
}

impl std::error::Error for InvalidBoolean {}

/// Errors raised while declaring, opening or using a database.
///
/// Apart from [`DbError::InvalidBoolean`], every variant means the operation
/// chain cannot continue: the statement or decoder is undefined, or the
/// driver rejected the work. Nothing is retried.
#[derive(Debug, Error)]
pub enum DbError {
    /// No statement blueprint was declared under this name.
    #[error("no prepared statement configured with the name \"{0}\"")]
    UnknownStatement(String),

    /// The statement was declared but not compiled for this connection.
    #[error("prepared statement \"{0}\" was not prepared on this connection")]
    StatementNotPrepared(String),

    /// No decoder was declared under this name.
    #[error("no decoder configured with the name \"{0}\"")]
    UnknownDecoder(String),

    /// A decoder exists under this name but decodes into another type.
    #[error("decoder \"{name}\" does not decode into {expected}")]
    DecoderTypeMismatch {
        /// Name the decoder was looked up by.
        name: String,
        /// Rust type the caller asked for.
        expected: &'static str,
    },

    /// Value validation failure; the only recoverable variant.
    #[error(transparent)]
    InvalidBoolean(#[from] InvalidBoolean),

    /// The connection was already closed.
    #[error("connection is closed")]
    Closed,

    /// `commit` or `rollback` was called while auto-commit is on.
    #[error("connection is in auto-commit mode")]
    AutoCommitEnabled,

    /// Invalid configuration or manifest contents.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading a manifest from disk failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A manifest could not be parsed.
    #[error("manifest error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors coming from `SQLite` itself.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    /// Returns `true` if the caller may handle this error and carry on.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidBoolean(_))
    }

    /// Extended `SQLite` result code, when the error came from the engine.
    #[must_use]
    pub const fn sqlite_code(&self) -> Option<i32> {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                Some(err.extended_code)
            }
            _ => None,
        }
    }
}
