//! Common test utilities shared across integration tests.

use std::path::{Path, PathBuf};

use querykit::{DbConfig, Registry, RegistryBuilder};
use tempfile::TempDir;

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A scratch directory holding one database file.
pub struct TempDatabase {
    dir: TempDir,
}

impl TempDatabase {
    /// Creates a fresh scratch directory.
    pub fn new() -> Self {
        init_tracing();
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Path of the database file inside the scratch directory.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("querykit.db")
    }

    /// The scratch directory itself.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// A registry builder pointed at this database file.
    pub fn builder(&self) -> RegistryBuilder {
        RegistryBuilder::new(DbConfig::file(self.path()))
    }
}

/// The two-column table from the crate docs with an insert that reports
/// keys and a row count.
pub fn scenario(builder: RegistryBuilder) -> Registry {
    builder
        .table("t", ["id integer primary key", "name text"])
        .prepared_statement("insert", "insert into t(name) values(?)", true)
        .statement("count", "select count(*) from t")
        .statement("names", "select name from t order by id")
        .build()
        .expect("build registry")
}
