//! Error types for tree operations.

use thiserror::Error;

use crate::store::ObserverId;

/// Structured error types for tree operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TreeError {
    /// An incremental batch was not sorted by path group order
    #[error("Batch of {list} paths is not sorted at index {index}")]
    UnsortedBatch { list: &'static str, index: usize },

    /// A path does not continue the context it was analyzed under
    #[error("Path '{path}' is outside context '{context}'")]
    PathOutsideContext { path: String, context: String },

    /// A path has no segment left where one was expected
    #[error("Path '{path}' has an empty segment after '{context}'")]
    EmptySegment { path: String, context: String },

    /// No page exists at the given path
    #[error("No page at '{path}'")]
    PageNotFound { path: String },

    /// A row index does not fit a page's visible children
    #[error("Row {row} out of bounds for page '{path}' with {rows} visible children")]
    RowOutOfBounds { path: String, row: usize, rows: usize },

    /// A tree reference was released or never issued
    #[error("Unknown tree reference {reference}")]
    UnknownReference { reference: String },

    /// A child node's body does not match the kind in its key
    #[error("Child '{name}' of page '{path}' is not a page")]
    NotAPage { path: String, name: String },

    /// An observer id was not subscribed to this tree
    #[error("Observer {id} is not subscribed to this tree")]
    UnknownObserver { id: ObserverId },
}

impl TreeError {
    /// Check if this error reports a malformed path or batch
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TreeError::UnsortedBatch { .. }
                | TreeError::PathOutsideContext { .. }
                | TreeError::EmptySegment { .. }
        )
    }

    /// Check if this error reports a page, row or reference that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TreeError::PageNotFound { .. }
                | TreeError::RowOutOfBounds { .. }
                | TreeError::UnknownReference { .. }
                | TreeError::UnknownObserver { .. }
        )
    }
}

impl From<TreeError> for crate::Error {
    fn from(err: TreeError) -> Self {
        crate::Error::Tree(err)
    }
}
