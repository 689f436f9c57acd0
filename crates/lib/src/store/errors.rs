//! Error types for store operations.

use thiserror::Error;

use super::{ChangeSet, Handle, ObserverId};

/// Structured error types for store operations.
///
/// None of these are transient: a store performs no I/O, so every error is a
/// broken caller contract. The operation that reported it did not run, except
/// for [`StoreError::ObserverFailed`], which carries the change set of the
/// mutation that was applied.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// A handle outlived the item it was issued for
    #[error("Stale handle {handle}: the item was erased")]
    StaleHandle { handle: Handle },

    /// A sequence range does not fit the store
    #[error("Range {start}..{end} out of bounds for store of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// A sequence position does not fit the store
    #[error("Position {position} out of bounds for store of length {len}")]
    PositionOutOfBounds { position: usize, len: usize },

    /// An observer id was not registered with this store
    #[error("Observer {id} is not subscribed to this store")]
    UnknownObserver { id: ObserverId },

    /// The mutation was applied but an observer rejected it
    #[error("Store observer failed after {operation}: {source}")]
    ObserverFailed {
        operation: &'static str,
        changes: ChangeSet,
        source: Box<crate::Error>,
    },
}

impl StoreError {
    /// Check if this error reports a stale handle
    pub fn is_stale_handle(&self) -> bool {
        matches!(self, StoreError::StaleHandle { .. })
    }

    /// Check if this error reports a position or range outside the store
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            StoreError::RangeOutOfBounds { .. } | StoreError::PositionOutOfBounds { .. }
        )
    }

    /// Check if this error reports an unknown observer id
    pub fn is_unknown_observer(&self) -> bool {
        matches!(self, StoreError::UnknownObserver { .. })
    }

    /// Check if this error reports an observer failure after an applied mutation
    pub fn is_observer_failure(&self) -> bool {
        matches!(self, StoreError::ObserverFailed { .. })
    }

    /// The change set of the applied mutation, if an observer failed after it
    pub fn applied_changes(&self) -> Option<&ChangeSet> {
        match self {
            StoreError::ObserverFailed { changes, .. } => Some(changes),
            _ => None,
        }
    }

    /// The error returned by the first failing observer
    pub fn observer_error(&self) -> Option<&crate::Error> {
        match self {
            StoreError::ObserverFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Get the handle if this is a handle-related error
    pub fn handle(&self) -> Option<Handle> {
        match self {
            StoreError::StaleHandle { handle } => Some(*handle),
            _ => None,
        }
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
