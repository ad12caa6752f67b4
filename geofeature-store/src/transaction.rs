//! Nested, thread-affine transaction scopes over one physical transaction.
//!
//! SQLite has no true nested transactions. A [`TransactionScope`] counts the
//! scopes a caller opens and only touches the database when the outermost
//! one begins or ends. The outcome is a commit when the outermost scope was
//! marked successful and no inner scope ended unmarked; anything else rolls
//! the whole unit back.

use std::thread::{self, ThreadId};

use log::{debug, warn};
use rusqlite::{Connection, Error as SqliteError};

use crate::error::{FeatureStoreError, TransactionMisuse};

/// Physical transaction control driven by a [`TransactionScope`].
pub trait TransactionEngine {
    /// Start the physical transaction.
    fn begin(&mut self) -> Result<(), SqliteError>;
    /// Make the physical transaction durable.
    fn commit(&mut self) -> Result<(), SqliteError>;
    /// Discard the physical transaction.
    fn rollback(&mut self) -> Result<(), SqliteError>;
}

impl TransactionEngine for Connection {
    fn begin(&mut self) -> Result<(), SqliteError> {
        self.execute_batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), SqliteError> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), SqliteError> {
        self.execute_batch("ROLLBACK")
    }
}

/// Bookkeeping for nested transaction scopes.
///
/// Each open scope holds one success mark; the mark of the outermost scope is
/// the final success flag. Calls that violate the protocol return
/// [`TransactionMisuse`] and leave the state exactly as it was.
///
/// # Examples
/// ```
/// use geofeature_store::TransactionScope;
/// use rusqlite::Connection;
///
/// let mut conn = Connection::open_in_memory().expect("open database");
/// let mut scope = TransactionScope::new();
///
/// scope.begin(&mut conn).expect("outer begin");
/// scope.begin(&mut conn).expect("inner begin");
/// scope.set_successful().expect("mark inner");
/// scope.end(&mut conn).expect("inner end");
/// assert_eq!(scope.depth(), 1);
///
/// scope.set_successful().expect("mark outer");
/// scope.end(&mut conn).expect("outer end commits");
/// assert!(!scope.is_active());
/// ```
#[derive(Debug, Default)]
pub struct TransactionScope {
    owner: Option<ThreadId>,
    marks: Vec<bool>,
    rollback_only: bool,
}

impl TransactionScope {
    /// Scope tracker with nothing open.
    pub const fn new() -> Self {
        Self {
            owner: None,
            marks: Vec::new(),
            rollback_only: false,
        }
    }

    /// Number of scopes currently open.
    pub const fn depth(&self) -> usize {
        self.marks.len()
    }

    /// Whether any scope is open.
    pub const fn is_active(&self) -> bool {
        !self.marks.is_empty()
    }

    /// Thread that opened the outermost scope.
    pub const fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    /// Open a scope, starting the physical transaction at depth 0.
    ///
    /// # Errors
    /// [`TransactionMisuse::WrongThread`] when a scope is open on another
    /// thread; a storage error when the physical `BEGIN` fails, in which case
    /// no scope is opened.
    pub fn begin<E>(&mut self, engine: &mut E) -> Result<(), FeatureStoreError>
    where
        E: TransactionEngine + ?Sized,
    {
        let caller = thread::current().id();
        if self.marks.is_empty() {
            engine
                .begin()
                .map_err(FeatureStoreError::storage("begin transaction"))?;
            self.owner = Some(caller);
            self.rollback_only = false;
        } else if self.owner != Some(caller) {
            return Err(TransactionMisuse::WrongThread.into());
        }
        self.marks.push(false);
        Ok(())
    }

    /// Mark the innermost open scope successful.
    ///
    /// # Errors
    /// [`TransactionMisuse`] when nothing is open, the caller does not own the
    /// transaction, or the innermost scope is already marked.
    pub fn set_successful(&mut self) -> Result<(), FeatureStoreError> {
        self.check_owner()?;
        let Some(mark) = self.marks.last_mut() else {
            return Err(TransactionMisuse::NoTransaction.into());
        };
        if *mark {
            return Err(TransactionMisuse::AlreadySuccessful.into());
        }
        *mark = true;
        Ok(())
    }

    /// Close the innermost scope, finishing the physical transaction when it
    /// was the outermost one.
    ///
    /// # Errors
    /// [`TransactionMisuse`] when nothing is open or the caller does not own
    /// the transaction. When `COMMIT` or `ROLLBACK` fails the state is still
    /// cleared and the storage error is returned.
    pub fn end<E>(&mut self, engine: &mut E) -> Result<(), FeatureStoreError>
    where
        E: TransactionEngine + ?Sized,
    {
        self.check_owner()?;
        let Some(successful) = self.marks.pop() else {
            return Err(TransactionMisuse::NoTransaction.into());
        };
        if !self.marks.is_empty() {
            if !successful {
                self.rollback_only = true;
            }
            return Ok(());
        }

        let commit = successful && !self.rollback_only;
        self.owner = None;
        self.rollback_only = false;

        if commit {
            if let Err(source) = engine.commit() {
                if let Err(err) = engine.rollback() {
                    warn!("rollback after failed commit also failed: {err}");
                }
                return Err(FeatureStoreError::storage("commit transaction")(source));
            }
            debug!("committed transaction");
        } else {
            engine
                .rollback()
                .map_err(FeatureStoreError::storage("roll back transaction"))?;
            debug!("rolled back transaction");
        }
        Ok(())
    }

    fn check_owner(&self) -> Result<(), TransactionMisuse> {
        if self.marks.is_empty() {
            return Err(TransactionMisuse::NoTransaction);
        }
        if self.owner != Some(thread::current().id()) {
            return Err(TransactionMisuse::WrongThread);
        }
        Ok(())
    }
}
