//! Store observers.
//!
//! Observers are notified synchronously, in registration order, after every
//! store mutation that changed something. They only receive a shared borrow
//! of the store, so they cannot mutate it while being notified.

use std::fmt;

use super::{ChangeSet, Record, Store};
use crate::Result;

/// Identifier returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Trait for receiving store change notifications.
pub trait StoreObserver<R: Record> {
    /// Called after a mutation has been applied to `store`.
    ///
    /// Errors do not roll the mutation back. They are logged, and the first
    /// one is reported to the caller as [`StoreError::ObserverFailed`]
    /// together with the applied change set.
    ///
    /// [`StoreError::ObserverFailed`]: super::StoreError::ObserverFailed
    fn on_change(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<()>;
}

impl<R, F> StoreObserver<R> for F
where
    R: Record,
    F: FnMut(&Store<R>, &ChangeSet) -> Result<()>,
{
    fn on_change(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<()> {
        self(store, changes)
    }
}

/// Ordered collection of observers attached to one store.
pub(crate) struct ObserverCollection<R: Record> {
    next_id: u64,
    observers: Vec<(ObserverId, Box<dyn StoreObserver<R>>)>,
}

impl<R: Record> Default for ObserverCollection<R> {
    fn default() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }
}

impl<R: Record> ObserverCollection<R> {
    pub(crate) fn add(&mut self, observer: Box<dyn StoreObserver<R>>) -> ObserverId {
        let id = ObserverId::new(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> Option<Box<dyn StoreObserver<R>>> {
        let pos = self.observers.iter().position(|(oid, _)| *oid == id)?;
        Some(self.observers.remove(pos).1)
    }

    /// Notifies every observer; continues past failures and returns the first.
    pub(crate) fn notify(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<()> {
        let mut first_error = None;

        for (id, observer) in &mut self.observers {
            if let Err(e) = observer.on_change(store, changes) {
                tracing::warn!(observer = %id, "Store observer failed: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
