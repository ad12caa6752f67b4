//! Scope guard pairing one `begin_transaction` with one `end_transaction`.

use std::ops::Deref;

use log::warn;

use crate::{FeatureStore, FeatureStoreError};

/// An open transaction scope on a [`FeatureStore`].
///
/// The guard dereferences to the store so work happens through it. Only
/// shared access is handed out, so the scope cannot be closed behind the
/// guard's back; open inner scopes with [`nested`](Self::nested). Call
/// [`set_successful`](Self::set_successful) once the work is complete and
/// [`finish`](Self::finish) to close the scope and observe the outcome.
/// Dropping an unfinished guard closes the scope as well; a failure at that
/// point is logged rather than raised.
///
/// # Examples
/// ```
/// use geofeature_store::{FeatureStore, ResolutionRange, Transaction};
///
/// let mut store = FeatureStore::open_in_memory().expect("open store");
/// {
///     let transaction = Transaction::begin(&mut store).expect("begin");
///     transaction
///         .add_group("osm", "lakes", "geneva", ResolutionRange::UNBOUNDED)
///         .expect("add group");
///     // Dropped without being marked: the group is rolled back.
/// }
/// assert!(!store.in_transaction());
/// ```
#[must_use = "dropping the guard immediately closes the transaction"]
pub struct Transaction<'store> {
    store: &'store mut FeatureStore,
    finished: bool,
}

impl<'store> Transaction<'store> {
    /// Open a scope on `store`.
    ///
    /// # Errors
    /// Whatever [`FeatureStore::begin_transaction`] reports; no scope is open
    /// on failure.
    pub fn begin(store: &'store mut FeatureStore) -> Result<Self, FeatureStoreError> {
        store.begin_transaction()?;
        Ok(Self {
            store,
            finished: false,
        })
    }

    /// Open an inner scope that must close before this guard is usable again.
    ///
    /// # Errors
    /// Whatever [`FeatureStore::begin_transaction`] reports.
    pub fn nested(&mut self) -> Result<Transaction<'_>, FeatureStoreError> {
        Transaction::begin(&mut *self.store)
    }

    /// Mark this scope successful.
    pub fn set_successful(&mut self) -> Result<(), FeatureStoreError> {
        self.store.set_transaction_successful()
    }

    /// Close the scope, returning any failure from the commit or rollback.
    pub fn finish(mut self) -> Result<(), FeatureStoreError> {
        self.finished = true;
        self.store.end_transaction()
    }
}

impl Deref for Transaction<'_> {
    type Target = FeatureStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.store.end_transaction() {
            warn!("failed to close transaction scope: {err}");
        }
    }
}
