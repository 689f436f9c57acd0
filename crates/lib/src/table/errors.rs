//! Error types for table operations.

use thiserror::Error;

use super::PersistentRef;
use crate::store::{Handle, ObserverId};

/// Structured error types for table operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TableError {
    /// A row index does not fit the visible rows
    #[error("Row {row} out of bounds for table with {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },

    /// No record with the given key exists
    #[error("No record with key {key}")]
    KeyNotFound { key: String },

    /// A persistent reference was released or never issued by this table
    #[error("Unknown persistent reference {reference}")]
    UnknownReference { reference: PersistentRef },

    /// A remapped reference no longer points at the item it was created for
    #[error(
        "Persistent reference {reference} remapped to row {row}, which holds {found:?} instead of {expected}"
    )]
    RemapMismatch {
        reference: PersistentRef,
        row: usize,
        expected: Handle,
        found: Option<Handle>,
    },

    /// An observer id was not registered with this table
    #[error("Observer {id} is not subscribed to this table")]
    UnknownObserver { id: ObserverId },
}

impl TableError {
    /// Check if this error reports a row or key that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TableError::RowOutOfBounds { .. }
                | TableError::KeyNotFound { .. }
                | TableError::UnknownReference { .. }
        )
    }

    /// Check if this error reports broken row bookkeeping inside the table
    pub fn is_remap_mismatch(&self) -> bool {
        matches!(self, TableError::RemapMismatch { .. })
    }
}

impl From<TableError> for crate::Error {
    fn from(err: TableError) -> Self {
        crate::Error::Table(err)
    }
}
