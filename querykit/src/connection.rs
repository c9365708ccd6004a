//! A live session with its compiled named statements.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::hooks::Action;
use rusqlite::{params_from_iter, CachedStatement};

use crate::blueprint::StatementBlueprint;
use crate::decoder::{DecoderSet, RowDecoder};
use crate::error::{DbError, DbResult};
use crate::transaction::Transaction;
use crate::value::Value;

/// A database session bound to the statements compiled for it at open time.
///
/// Obtained from [`Registry::connect`](crate::Registry::connect) or
/// [`Registry::connect_with`](crate::Registry::connect_with). The compiled
/// statements live in the session's statement cache and are fetched back by
/// name. Closed by [`close`](Self::close) or when dropped.
///
/// Not `Sync`: one connection serves one caller at a time.
pub struct Connection {
    session: Option<rusqlite::Connection>,
    statements: HashMap<String, StatementBlueprint>,
    decoders: Arc<DecoderSet>,
    auto_commit: bool,
}

impl Connection {
    pub(crate) fn new(
        session: rusqlite::Connection,
        statements: HashMap<String, StatementBlueprint>,
        decoders: Arc<DecoderSet>,
        auto_commit: bool,
    ) -> DbResult<Self> {
        let mut connection = Self {
            session: Some(session),
            statements,
            decoders,
            auto_commit: true,
        };
        connection.set_auto_commit(auto_commit)?;
        Ok(connection)
    }

    /// Binds `values` by position to the named statement and executes it as
    /// an update.
    ///
    /// Returns the generated row key as text when the statement was declared
    /// with `return_generated_key` and inserted at least one row, `None`
    /// otherwise. Statements that only update or delete never report a key,
    /// even with the flag set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::StatementNotPrepared`] if the statement was not
    /// compiled for this connection, [`DbError::Closed`] after
    /// [`close`](Self::close), and [`DbError::Sqlite`] for binding errors
    /// (including a parameter count mismatch), constraint violations and
    /// execution failures.
    pub fn execute(&self, name: &str, values: &[Value]) -> DbResult<Option<String>> {
        let (mut statement, blueprint) = self.statement(name)?;
        if !blueprint.return_generated_key {
            statement.execute(params_from_iter(values))?;
            return Ok(None);
        }
        let session = self.session()?;
        let inserted = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&inserted);
        session.update_hook(Some(
            move |action: Action, _db: &str, _table: &str, _rowid: i64| {
                if action == Action::SQLITE_INSERT {
                    seen.store(true, Ordering::Relaxed);
                }
            },
        ));
        let changed = statement.execute(params_from_iter(values));
        session.update_hook(None::<fn(Action, &str, &str, i64)>);
        if changed? == 0 || !inserted.load(Ordering::Relaxed) {
            return Ok(None);
        }
        Ok(Some(session.last_insert_rowid().to_string()))
    }

    /// Runs the named query and decodes its first row, if any.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), plus decoder failures.
    pub fn query_one<T>(
        &self,
        name: &str,
        decoder: &dyn RowDecoder<T>,
        values: &[Value],
    ) -> DbResult<Option<T>> {
        let (mut statement, _) = self.statement(name)?;
        let mut rows = statement.query(params_from_iter(values))?;
        let decoded = match rows.next()? {
            Some(row) => Some(decoder.decode(row)?),
            None => None,
        };
        Ok(decoded)
    }

    /// Like [`query_one`](Self::query_one), with the decoder looked up by
    /// name in the registry's decoder set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnknownDecoder`] or
    /// [`DbError::DecoderTypeMismatch`] if the decoder cannot be resolved,
    /// otherwise the same errors as [`query_one`](Self::query_one).
    pub fn query_one_named<T: 'static>(
        &self,
        name: &str,
        decoder: &str,
        values: &[Value],
    ) -> DbResult<Option<T>> {
        let decoder = self.decoders.get::<T>(decoder)?;
        self.query_one(name, decoder.as_ref(), values)
    }

    /// Runs the named query and decodes every row, in cursor order.
    ///
    /// # Errors
    ///
    /// Same as [`query_one`](Self::query_one).
    pub fn query_many<T>(
        &self,
        name: &str,
        decoder: &dyn RowDecoder<T>,
        values: &[Value],
    ) -> DbResult<Vec<T>> {
        let (mut statement, _) = self.statement(name)?;
        let mut rows = statement.query(params_from_iter(values))?;
        let mut decoded = Vec::new();
        while let Some(row) = rows.next()? {
            decoded.push(decoder.decode(row)?);
        }
        Ok(decoded)
    }

    /// Like [`query_many`](Self::query_many), with the decoder looked up by
    /// name in the registry's decoder set.
    ///
    /// # Errors
    ///
    /// Same as [`query_one_named`](Self::query_one_named).
    pub fn query_many_named<T: 'static>(
        &self,
        name: &str,
        decoder: &str,
        values: &[Value],
    ) -> DbResult<Vec<T>> {
        let decoder = self.decoders.get::<T>(decoder)?;
        self.query_many(name, decoder.as_ref(), values)
    }

    /// Runs the named query and reports whether the first column of the
    /// first row is `1`.
    ///
    /// Anything else yields `false`: no row at all, `0`, `NULL` or another
    /// integer. "No row" and "0" cannot be told apart here.
    ///
    /// # Errors
    ///
    /// Same as [`query_one`](Self::query_one).
    pub fn query_boolean(&self, name: &str, values: &[Value]) -> DbResult<bool> {
        let (mut statement, _) = self.statement(name)?;
        let mut rows = statement.query(params_from_iter(values))?;
        let flag = match rows.next()? {
            Some(row) => row.get::<_, Option<i64>>(0)? == Some(1),
            None => false,
        };
        Ok(flag)
    }

    /// Whether each statement commits on its own.
    #[must_use]
    pub const fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Switches auto-commit mode.
    ///
    /// Turning it off opens a transaction that stays open until
    /// [`commit`](Self::commit) or [`rollback`](Self::rollback). Turning it
    /// back on commits whatever is pending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Closed`] after [`close`](Self::close) and
    /// [`DbError::Sqlite`] if the transaction cannot be opened or committed.
    pub fn set_auto_commit(&mut self, auto_commit: bool) -> DbResult<()> {
        if self.auto_commit == auto_commit {
            return Ok(());
        }
        let session = self.session()?;
        if auto_commit {
            if !session.is_autocommit() {
                session.execute_batch("COMMIT")?;
            }
        } else {
            session.execute_batch("BEGIN")?;
        }
        tracing::debug!(auto_commit, "auto-commit mode changed");
        self.auto_commit = auto_commit;
        Ok(())
    }

    /// Commits the open transaction and starts the next one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AutoCommitEnabled`] in auto-commit mode,
    /// [`DbError::Closed`] after [`close`](Self::close) and
    /// [`DbError::Sqlite`] if the commit fails.
    pub fn commit(&self) -> DbResult<()> {
        self.end_transaction("COMMIT")
    }

    /// Discards the open transaction and starts the next one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::AutoCommitEnabled`] in auto-commit mode,
    /// [`DbError::Closed`] after [`close`](Self::close) and
    /// [`DbError::Sqlite`] if the rollback fails.
    pub fn rollback(&self) -> DbResult<()> {
        self.end_transaction("ROLLBACK")
    }

    fn end_transaction(&self, verb: &str) -> DbResult<()> {
        if self.auto_commit {
            return Err(DbError::AutoCommitEnabled);
        }
        let session = self.session()?;
        if !session.is_autocommit() {
            session.execute_batch(verb)?;
        }
        session.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Starts a scoped transaction that rolls back unless committed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Closed`] after [`close`](Self::close) and
    /// [`DbError::Sqlite`] if the transaction cannot be opened.
    pub fn transaction(&mut self) -> DbResult<Transaction<'_>> {
        Transaction::begin(self)
    }

    /// Whether the session is still open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Closes the session and releases its compiled statements.
    ///
    /// Calling this again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if `SQLite` reports a failure while
    /// closing; the session is released regardless.
    pub fn close(&mut self) -> DbResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session.close().map_err(|(_, err)| DbError::from(err))?;
        tracing::info!("connection closed");
        Ok(())
    }

    /// Names of the statements compiled for this connection, sorted.
    #[must_use]
    pub fn prepared_statements(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.statements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.session()?.execute_batch(sql)?;
        Ok(())
    }

    fn session(&self) -> DbResult<&rusqlite::Connection> {
        self.session.as_ref().ok_or(DbError::Closed)
    }

    fn statement(&self, name: &str) -> DbResult<(CachedStatement<'_>, &StatementBlueprint)> {
        let blueprint = self
            .statements
            .get(name)
            .ok_or_else(|| DbError::StatementNotPrepared(name.to_string()))?;
        let statement = self.session()?.prepare_cached(&blueprint.sql)?;
        Ok((statement, blueprint))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .field("auto_commit", &self.auto_commit)
            .field("statements", &self.prepared_statements())
            .finish_non_exhaustive()
    }
}
