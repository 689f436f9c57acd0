//! Error types for view operations.

use thiserror::Error;

use crate::store::StoreId;

/// Structured error types for view operations.
///
/// Every variant is a programmer-contract violation: the view was used in a
/// state or with an input it does not support. The view is left untouched.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ViewError {
    /// The view has not been attached to a store yet
    #[error("View is not attached to a store (operation '{operation}')")]
    Detached { operation: &'static str },

    /// The view was fed by a store other than the one it is attached to
    #[error("View is attached to {expected} but was given {actual}")]
    WrongStore { expected: StoreId, actual: StoreId },

    /// Partition-by-selection needs a configured selection order
    #[error("Partition by selection requested without a selection order")]
    NoSelectionOrder,

    /// A row index does not fit the visible region
    #[error("Row {row} out of bounds for {visible} visible rows")]
    RowOutOfBounds { row: usize, visible: usize },
}

impl ViewError {
    /// Check if this error reports a missing or wrong store attachment
    pub fn is_attachment_error(&self) -> bool {
        matches!(
            self,
            ViewError::Detached { .. } | ViewError::WrongStore { .. }
        )
    }

    /// Check if this error reports a row outside the visible region
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, ViewError::RowOutOfBounds { .. })
    }
}

impl From<ViewError> for crate::Error {
    fn from(err: ViewError) -> Self {
        crate::Error::View(err)
    }
}
