//! Scoped transaction guard.

use std::ops::Deref;

use crate::connection::Connection;
use crate::error::DbResult;

const SAVEPOINT: &str = "querykit_guard";

/// A transaction on a [`Connection`], rolled back on drop unless committed.
///
/// Derefs to the connection, so named statements run inside the
/// transaction. In auto-commit mode the guard owns a whole transaction and
/// restores auto-commit when it finishes. With auto-commit off it opens a
/// savepoint inside the caller's transaction instead: committing releases
/// the savepoint and leaves the work pending, rolling back undoes only what
/// ran through the guard.
#[derive(Debug)]
pub struct Transaction<'conn> {
    conn: &'conn mut Connection,
    nested: bool,
    finished: bool,
}

impl<'conn> Transaction<'conn> {
    pub(crate) fn begin(conn: &'conn mut Connection) -> DbResult<Self> {
        let nested = !conn.auto_commit();
        if nested {
            conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))?;
        } else {
            conn.set_auto_commit(false)?;
        }
        Ok(Self {
            conn,
            nested,
            finished: false,
        })
    }

    /// Commits everything executed through this guard.
    ///
    /// With auto-commit off the work stays part of the caller's transaction
    /// until the caller commits it.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the commit fails; the guard then rolls
    /// back on drop.
    pub fn commit(mut self) -> DbResult<()> {
        if self.nested {
            self.conn.execute_batch(&format!("RELEASE {SAVEPOINT}"))?;
            self.finished = true;
            return Ok(());
        }
        self.conn.commit()?;
        self.finish()
    }

    /// Discards everything executed through this guard.
    ///
    /// # Errors
    ///
    /// Returns the driver error if the rollback fails.
    pub fn rollback(mut self) -> DbResult<()> {
        self.undo()
    }

    fn undo(&mut self) -> DbResult<()> {
        if self.nested {
            self.finished = true;
            return self
                .conn
                .execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}"));
        }
        let rolled_back = self.conn.rollback();
        let restored = self.finish();
        rolled_back.and(restored)
    }

    fn finish(&mut self) -> DbResult<()> {
        self.finished = true;
        self.conn.set_auto_commit(true)
    }
}

impl Deref for Transaction<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &*self.conn
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.undo() {
            tracing::warn!(error = %err, "transaction rollback on drop failed");
        }
    }
}
