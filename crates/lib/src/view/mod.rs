//! Sorted, filtered projections over a [`Store`].
//!
//! A view keeps a [`Projection`]: the handles of every live item in its store,
//! split into visible rows (in display order) and a hidden shadow region.
//! Each store [`ChangeSet`] is folded in incrementally, and every operation
//! reports a [`ViewUpdate`] describing how old rows map to new ones so that
//! row-addressed consumers can follow along.
//!
//! - [`SortedView`] sorts and filters.
//! - [`SelectableView`] adds a selection set and can group rows by it.
//!
//! Both implement [`ViewSync`], which is what [`Table`](crate::table::Table)
//! drives.

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

use tracing::trace;

use crate::{
    Result,
    store::{ChangeSet, Record, Store, StoreObserver},
};

mod errors;
pub use errors::ViewError;

mod filter;
pub use filter::{
    Filter, NoFilter, Predicate, PredicateExpr, PredicateFilter, RefilterKind, Searchable,
    TextFilter, contains_ignore_case,
};

mod projection;
pub use projection::Projection;
pub(crate) use projection::{Arrangement, Refresh};

mod selection;
pub use selection::{SelectableView, SelectionOrder};

mod sort;
pub use sort::{SortBy, SortOrder};

mod sorted;
pub use sorted::SortedView;

mod update;
pub use update::{PositionMap, ViewUpdate};


/// Operations shared by every view kind.
pub trait ViewSync<R: Record> {
    type Filter: Filter<R>;

    /// Rebuilds the view over `store` and remembers it.
    fn attach(&mut self, store: &Store<R>) -> Result<ViewUpdate>;

    fn detach(&mut self);

    /// Folds one change set of the attached store into the view.
    fn apply(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<ViewUpdate>;

    fn sort_by(&mut self, store: &Store<R>, sort: Option<SortBy<R>>) -> Result<ViewUpdate>;

    fn filter_by(
        &mut self,
        store: &Store<R>,
        expr: <Self::Filter as Filter<R>>::Expr,
    ) -> Result<(RefilterKind, ViewUpdate)>;

    fn projection(&self) -> &Projection;

    /// Structural self-check; returns a description of the first violation.
    fn check_invariants(&self, store: &Store<R>) -> std::result::Result<(), String>;
}

impl<R: Record, F: Filter<R>> ViewSync<R> for SortedView<R, F> {
    type Filter = F;

    fn attach(&mut self, store: &Store<R>) -> Result<ViewUpdate> {
        SortedView::attach(self, store)
    }

    fn detach(&mut self) {
        SortedView::detach(self)
    }

    fn apply(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<ViewUpdate> {
        SortedView::apply(self, store, changes)
    }

    fn sort_by(&mut self, store: &Store<R>, sort: Option<SortBy<R>>) -> Result<ViewUpdate> {
        SortedView::sort_by(self, store, sort)
    }

    fn filter_by(&mut self, store: &Store<R>, expr: F::Expr) -> Result<(RefilterKind, ViewUpdate)> {
        SortedView::filter_by(self, store, expr)
    }

    fn projection(&self) -> &Projection {
        SortedView::projection(self)
    }

    fn check_invariants(&self, store: &Store<R>) -> std::result::Result<(), String> {
        SortedView::check_invariants(self, store)
    }
}

impl<R: Record, F: Filter<R>> ViewSync<R> for SelectableView<R, F> {
    type Filter = F;

    fn attach(&mut self, store: &Store<R>) -> Result<ViewUpdate> {
        SelectableView::attach(self, store)
    }

    fn detach(&mut self) {
        SelectableView::detach(self)
    }

    fn apply(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<ViewUpdate> {
        SelectableView::apply(self, store, changes)
    }

    fn sort_by(&mut self, store: &Store<R>, sort: Option<SortBy<R>>) -> Result<ViewUpdate> {
        SelectableView::sort_by(self, store, sort)
    }

    fn filter_by(&mut self, store: &Store<R>, expr: F::Expr) -> Result<(RefilterKind, ViewUpdate)> {
        SelectableView::filter_by(self, store, expr)
    }

    fn projection(&self) -> &Projection {
        SelectableView::projection(self)
    }

    fn check_invariants(&self, store: &Store<R>) -> std::result::Result<(), String> {
        SelectableView::check_invariants(self, store)
    }
}

/// A view shared between its owner and the store it observes.
///
/// Subscribe a clone to the store and keep another to read the view. The
/// [`ViewUpdate`]s are not kept, so this suits consumers that read the view
/// after the fact rather than tracking rows.
#[derive(Debug)]
pub struct SharedView<V> {
    inner: Rc<RefCell<V>>,
}

impl<V> Clone for SharedView<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> SharedView<V> {
    pub fn new(view: V) -> Self {
        Self {
            inner: Rc::new(RefCell::new(view)),
        }
    }

    /// Borrows the view. Panics if called from inside a store notification
    /// that is updating this same view.
    pub fn borrow(&self) -> Ref<'_, V> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, V> {
        self.inner.borrow_mut()
    }
}

impl<R, V> StoreObserver<R> for SharedView<V>
where
    R: Record,
    V: ViewSync<R>,
{
    fn on_change(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<()> {
        let update = self.inner.borrow_mut().apply(store, changes)?;
        trace!(
            visible = update.visible_after,
            structural = update.is_structural(),
            "Shared view followed store"
        );
        Ok(())
    }
}
