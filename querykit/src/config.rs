//! Registry configuration and JSON manifests.
//!
//! A [`Manifest`] lets the schema and statement set live next to the
//! application's other configuration:
//!
//! ```json
//! {
//!     "config": { "database": "app.db", "auto_commit": true },
//!     "tables": [
//!         { "name": "t", "columns": ["id integer primary key", "name text"] }
//!     ],
//!     "statements": [
//!         { "name": "insert", "sql": "insert into t(name) values(?)", "return_generated_key": true },
//!         { "name": "count", "sql": "select count(*) from t" }
//!     ]
//! }
//! ```
//!
//! Decoders are code and are always declared on the builder.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blueprint::{StatementBlueprint, TableBlueprint};
use crate::error::{DbError, DbResult};

/// Address spelled out for the in-memory target.
pub const MEMORY_ADDRESS: &str = ":memory:";

const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 16;

/// Where the database lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    /// A private in-memory database shared by every connection of one
    /// registry.
    #[default]
    Memory,
    /// A database file, created if missing.
    File(PathBuf),
}

impl Target {
    /// Creates a file target.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        if value.is_empty() || value == MEMORY_ADDRESS {
            Self::Memory
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

impl From<Target> for String {
    fn from(value: Target) -> Self {
        match value {
            Target::Memory => MEMORY_ADDRESS.to_string(),
            Target::File(path) => path.to_string_lossy().into_owned(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str(MEMORY_ADDRESS),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Connection settings applied to every session a registry opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    /// Database location.
    #[serde(rename = "database")]
    pub target: Target,
    /// Auto-commit mode new connections start in.
    pub auto_commit: bool,
    /// How long a session waits on a locked database before failing.
    pub busy_timeout_ms: Option<u64>,
    /// Minimum prepared-statement cache size per connection.
    pub statement_cache_capacity: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            target: Target::Memory,
            auto_commit: true,
            busy_timeout_ms: None,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
        }
    }
}

impl DbConfig {
    /// Configuration for a database file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::file(path),
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> DbResult<()> {
        if self.statement_cache_capacity == 0 {
            return Err(DbError::Config(
                "statement_cache_capacity must be at least 1".to_string(),
            ));
        }
        if let Target::File(path) = &self.target {
            if path.as_os_str().is_empty() {
                return Err(DbError::Config("database path is empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Declarative registry contents: settings, tables and statements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Connection settings.
    #[serde(default)]
    pub config: DbConfig,
    /// Tables created at finalize time, in order.
    #[serde(default)]
    pub tables: Vec<TableBlueprint>,
    /// Statements available to connections.
    #[serde(default)]
    pub statements: Vec<StatementBlueprint>,
}

impl Manifest {
    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Json`] if the text is not a valid manifest.
    pub fn from_json_str(json: &str) -> DbResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the file cannot be read, or
    /// [`DbError::Json`] if it is not a valid manifest.
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
