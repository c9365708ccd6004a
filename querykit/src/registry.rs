//! Declaring tables, statements and decoders, and opening connections.

use std::collections::HashMap;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::blueprint::{StatementBlueprint, TableBlueprint};
use crate::config::{DbConfig, Manifest, Target};
use crate::connection::Connection;
use crate::decoder::{DecoderSet, RowDecoder};
use crate::error::{DbError, DbResult};

static MEMORY_DATABASE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Accumulates declarations until [`RegistryBuilder::build`] freezes them.
///
/// Declaring a statement or decoder under a name that is already taken
/// replaces the earlier declaration.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    config: DbConfig,
    tables: Vec<TableBlueprint>,
    statements: HashMap<String, StatementBlueprint>,
    decoders: DecoderSet,
}

impl RegistryBuilder {
    /// Starts a builder with the given settings.
    #[must_use]
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Starts a builder seeded with a manifest's settings, tables and
    /// statements.
    #[must_use]
    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut builder = Self::new(manifest.config);
        builder.tables = manifest.tables;
        for statement in manifest.statements {
            builder.insert_statement(statement);
        }
        builder
    }

    /// Sets the auto-commit mode new connections start in.
    #[must_use]
    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.config.auto_commit = auto_commit;
        self
    }

    /// Declares a table created with `if not exists`.
    #[must_use]
    pub fn table<I, S>(self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_with(name, true, columns)
    }

    /// Declares a table, choosing whether creation is idempotent.
    #[must_use]
    pub fn table_with<I, S>(
        mut self,
        name: impl Into<String>,
        if_not_exists: bool,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables
            .push(TableBlueprint::new(name, if_not_exists, columns));
        self
    }

    /// Declares a statement that does not report generated keys.
    #[must_use]
    pub fn statement(self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.prepared_statement(name, sql, false)
    }

    /// Declares a statement, choosing whether `execute` reports the
    /// generated key of an inserted row.
    #[must_use]
    pub fn prepared_statement(
        mut self,
        name: impl Into<String>,
        sql: impl Into<String>,
        return_generated_key: bool,
    ) -> Self {
        self.insert_statement(StatementBlueprint::new(name, sql, return_generated_key));
        self
    }

    /// Declares a named decoder that connections can look up at query time.
    #[must_use]
    pub fn decoder<T, D>(mut self, name: impl Into<String>, decoder: D) -> Self
    where
        T: 'static,
        D: RowDecoder<T> + 'static,
    {
        let name = name.into();
        if self.decoders.insert(name.clone(), decoder) {
            tracing::warn!(decoder = %name, "decoder redeclared, replacing earlier declaration");
        }
        self
    }

    fn insert_statement(&mut self, statement: StatementBlueprint) {
        let name = statement.name.clone();
        if self.statements.insert(name.clone(), statement).is_some() {
            tracing::warn!(statement = %name, "statement redeclared, replacing earlier declaration");
        }
    }

    /// Freezes the declarations and creates the declared tables, in
    /// declaration order, over a transient session.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] for invalid settings and
    /// [`DbError::Sqlite`] if the database cannot be opened or a table
    /// cannot be created.
    pub fn build(self) -> DbResult<Registry> {
        self.config.validate()?;
        let address = match &self.config.target {
            Target::Memory => memory_address(),
            Target::File(path) => path.to_string_lossy().into_owned(),
        };
        let anchor = match self.config.target {
            Target::Memory => Some(Mutex::new(rusqlite::Connection::open(&address)?)),
            Target::File(_) => None,
        };

        let inner = RegistryInner {
            address,
            config: self.config,
            statements: self.statements,
            decoders: Arc::new(self.decoders),
            _anchor: anchor,
        };

        if !self.tables.is_empty() {
            let session = inner.open_session()?;
            for table in &self.tables {
                let sql = table.create_sql();
                tracing::debug!(table = %table.name, %sql, "creating table");
                session.execute_batch(&sql)?;
            }
            session.close().map_err(|(_, err)| err)?;
        }

        tracing::info!(
            target_db = %inner.config.target,
            tables = self.tables.len(),
            statements = inner.statements.len(),
            decoders = inner.decoders.len(),
            "registry finalized"
        );
        Ok(Registry {
            inner: Arc::new(inner),
        })
    }
}

fn memory_address() -> String {
    let seq = MEMORY_DATABASE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("file:querykit-{}-{seq}?mode=memory&cache=shared", process::id())
}

#[derive(Debug)]
struct RegistryInner {
    address: String,
    config: DbConfig,
    statements: HashMap<String, StatementBlueprint>,
    decoders: Arc<DecoderSet>,
    // Keeps a shared-cache in-memory database alive between connections.
    // Never locked; the mutex only makes the registry `Sync`.
    _anchor: Option<Mutex<rusqlite::Connection>>,
}

impl RegistryInner {
    fn open_session(&self) -> DbResult<rusqlite::Connection> {
        let session = rusqlite::Connection::open(&self.address)?;
        if let Some(ms) = self.config.busy_timeout_ms {
            session.busy_timeout(Duration::from_millis(ms))?;
        }
        Ok(session)
    }
}

/// Frozen declarations that connections are opened from.
///
/// Cheap to clone and safe to share across threads; every connection gets
/// its own session and its own compiled statements.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Starts a builder for a private in-memory database.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new(DbConfig::default())
    }

    /// Starts a builder for the database at `target`.
    #[must_use]
    pub fn builder_for(target: Target) -> RegistryBuilder {
        RegistryBuilder::new(DbConfig {
            target,
            ..DbConfig::default()
        })
    }

    /// Where this registry's database lives.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.inner.config.target
    }

    /// Auto-commit mode new connections start in.
    #[must_use]
    pub fn auto_commit(&self) -> bool {
        self.inner.config.auto_commit
    }

    /// Looks up a declared statement.
    #[must_use]
    pub fn statement(&self, name: &str) -> Option<&StatementBlueprint> {
        self.inner.statements.get(name)
    }

    /// Names of all declared statements, sorted.
    #[must_use]
    pub fn statement_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.statements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The shared decoder set.
    #[must_use]
    pub fn decoders(&self) -> &DecoderSet {
        &self.inner.decoders
    }

    /// Opens a connection with every declared statement compiled.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the session cannot be opened or a
    /// statement does not compile.
    pub fn connect(&self) -> DbResult<Connection> {
        let names = self.statement_names();
        self.connect_with(&names)
    }

    /// Opens a connection with only the named statements compiled.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownStatement`] if a name was never declared,
    /// and [`DbError::Sqlite`] if the session cannot be opened or a
    /// statement does not compile.
    pub fn connect_with<S: AsRef<str>>(&self, names: &[S]) -> DbResult<Connection> {
        let mut prepared = HashMap::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let blueprint = self
                .inner
                .statements
                .get(name)
                .ok_or_else(|| DbError::UnknownStatement(name.to_string()))?;
            prepared.insert(name.to_string(), blueprint.clone());
        }

        let session = self.inner.open_session()?;
        session.set_prepared_statement_cache_capacity(
            prepared.len().max(self.inner.config.statement_cache_capacity),
        );
        for blueprint in prepared.values() {
            tracing::debug!(statement = %blueprint.name, "compiling statement");
            session.prepare_cached(&blueprint.sql)?;
        }

        let connection = Connection::new(
            session,
            prepared,
            Arc::clone(&self.inner.decoders),
            self.inner.config.auto_commit,
        )?;
        tracing::info!(
            target_db = %self.inner.config.target,
            statements = names.len(),
            "connection opened"
        );
        Ok(connection)
    }
}
