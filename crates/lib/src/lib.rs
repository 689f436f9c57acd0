//!
//! Viewsync: incrementally synchronized sorted and filtered views.
//! This library keeps derived projections of a mutable keyed collection in
//! step with the collection, for consumers that hold on to row positions.
//!
//! ## Core Concepts
//!
//! Viewsync is built around several key concepts:
//!
//! * **Stores (`store::Store`)**: The system of record. Items are indexed by key and by insertion sequence, addressed by generational `Handle`s, and every mutation yields a `ChangeSet`.
//! * **Views (`view::SortedView`)**: A non-owning projection over a store: visible rows in sort order, followed by a shadow of items the filter hides. Views consume change sets in batches and report a `ViewUpdate` with the old-row to new-row `PositionMap`.
//! * **Selection (`view::SelectableView`)**: A view that can additionally group selected rows before or after the others.
//! * **Tables (`table::Table`)**: A store plus a view behind one row-addressed facade, with persistent row references that survive structural changes and a begin/end bracket around every change.
//! * **Trees (`tree::Tree`)**: The hierarchical variant. Path-bearing leaves are decomposed into pages, each page synchronized like a flat view and carrying an aggregate over its visible children.
//! * **Permutations (`permutation`)** and **tagged references (`tagged`)**: The index bookkeeping and the closed page/leaf sum type the layers above share.
//!
//! Everything is single-threaded and synchronous: observers run inline
//! during the mutating call and only ever see shared borrows.

pub mod permutation;
pub mod store;
pub mod table;
pub mod tagged;
pub mod tree;
pub mod view;

/// Re-export the most used types for easier access.
pub use store::{ChangeSet, Handle, Record, Store};
pub use table::Table;
pub use tree::Tree;

/// Result type used throughout the Viewsync library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Viewsync library.
///
/// Every variant wraps the structured error of the module that raised it.
/// None of them are transient: viewsync performs no I/O, so an error always
/// means a broken caller contract, and retrying the same call fails the same
/// way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Structured permutation errors from the permutation module
    #[error(transparent)]
    Permutation(permutation::PermutationError),

    /// Structured store errors from the store module
    #[error(transparent)]
    Store(store::StoreError),

    /// Structured view errors from the view module
    #[error(transparent)]
    View(view::ViewError),

    /// Structured table errors from the table module
    #[error(transparent)]
    Table(table::TableError),

    /// Structured tree errors from the tree module
    #[error(transparent)]
    Tree(tree::TreeError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Permutation(_) => "permutation",
            Error::Store(_) => "store",
            Error::View(_) => "view",
            Error::Table(_) => "table",
            Error::Tree(_) => "tree",
        }
    }

    /// The change set of a store mutation that was applied even though an
    /// observer failed afterwards.
    ///
    /// Whoever keeps a view over the store must still feed it this change
    /// set, or the view falls behind the store.
    pub fn applied_changes(&self) -> Option<&ChangeSet> {
        match self {
            Error::Store(store_err) => store_err.applied_changes(),
            _ => None,
        }
    }

    /// The error a failing store observer returned, if this is one.
    fn observer_error(&self) -> Option<&Error> {
        match self {
            Error::Store(store_err) => store_err.observer_error(),
            _ => None,
        }
    }

    /// Check if this error indicates a key, row, page or reference was not found.
    pub fn is_not_found(&self) -> bool {
        if let Some(inner) = self.observer_error() {
            return inner.is_not_found();
        }
        match self {
            Error::Table(table_err) => table_err.is_not_found(),
            Error::Tree(tree_err) => tree_err.is_not_found(),
            Error::View(view_err) => view_err.is_out_of_bounds(),
            _ => false,
        }
    }

    /// Check if this error is a programmer-contract violation.
    ///
    /// Covers detached or misattached views, a missing selection order,
    /// stale handles, persistent references that lost their item, and
    /// malformed index sets. A failed store observer is classified by the
    /// error it returned.
    pub fn is_logic_error(&self) -> bool {
        if let Some(inner) = self.observer_error() {
            return inner.is_logic_error();
        }
        match self {
            Error::Permutation(_) => true,
            Error::Store(store_err) => {
                store_err.is_stale_handle() || store_err.is_unknown_observer()
            }
            Error::View(view_err) => !view_err.is_out_of_bounds(),
            Error::Table(table_err) => table_err.is_remap_mismatch(),
            Error::Tree(tree_err) => matches!(tree_err, tree::TreeError::NotAPage { .. }),
        }
    }

    /// Check if this error reports input that violated a documented
    /// precondition: an unsorted or malformed batch, or a position or range
    /// outside the collection.
    pub fn is_precondition_violation(&self) -> bool {
        if let Some(inner) = self.observer_error() {
            return inner.is_precondition_violation();
        }
        match self {
            Error::Store(store_err) => store_err.is_out_of_bounds(),
            Error::View(view_err) => view_err.is_out_of_bounds(),
            Error::Tree(tree_err) => tree_err.is_input_error(),
            Error::Permutation(perm_err) => perm_err.is_ordering_error(),
            Error::Table(table_err) => {
                matches!(table_err, table::TableError::RowOutOfBounds { .. })
            }
        }
    }

    /// Check if this error is store-related.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    /// Check if this error is tree-related.
    pub fn is_tree_error(&self) -> bool {
        matches!(self, Error::Tree(_))
    }
}
