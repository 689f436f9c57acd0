//! The flat sorted and filtered view.

use std::collections::HashSet;

use tracing::debug;

use super::{
    Arrangement, Filter, NoFilter, PositionMap, Projection, RefilterKind, Refresh,
    SelectionOrder, SortBy, ViewError, ViewUpdate,
};
use crate::{
    Result,
    store::{ChangeSet, Handle, Record, Store, StoreId},
};

/// Sorted, filtered projection of one [`Store`].
///
/// The view never owns records; it holds handles into the store it is
/// attached to and must be fed every [`ChangeSet`] that store produces, in
/// order. [`Table`](crate::table::Table) does the feeding for you.
///
/// # Examples
///
/// ```
/// use viewsync::store::Store;
/// use viewsync::view::{SortBy, SortedView};
///
/// # fn main() -> viewsync::Result<()> {
/// let mut store = Store::new();
/// store.upsert([15, 1, 10])?;
///
/// let mut view = SortedView::unfiltered();
/// view.sort_by(&store, Some(SortBy::natural()))?;
/// view.attach(&store)?;
///
/// let changes = store.upsert([5])?;
/// let update = view.apply(&store, &changes)?;
/// assert_eq!(update.inserted, 1);
/// assert_eq!(view.items(&store)?, [&1, &5, &10, &15]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SortedView<R, F = NoFilter> {
    projection: Projection,
    sort: Option<SortBy<R>>,
    filter: F,
    attached: Option<StoreId>,
}

impl<R: Record> SortedView<R, NoFilter> {
    /// A view that shows every record.
    pub fn unfiltered() -> Self {
        Self::new(NoFilter)
    }
}

impl<R, F> Default for SortedView<R, F>
where
    R: Record,
    F: Filter<R> + Default,
{
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<R, F> SortedView<R, F>
where
    R: Record,
    F: Filter<R>,
{
    pub fn new(filter: F) -> Self {
        Self {
            projection: Projection::new(),
            sort: None,
            filter,
            attached: None,
        }
    }

    /// Sets the initial sort before attaching.
    pub fn with_sort(mut self, sort: SortBy<R>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn sort(&self) -> Option<&SortBy<R>> {
        self.sort.as_ref()
    }

    pub fn attached_to(&self) -> Option<StoreId> {
        self.attached
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn nvisible(&self) -> usize {
        self.projection.nvisible()
    }

    /// Number of tracked items, visible or hidden.
    pub fn len(&self) -> usize {
        self.projection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projection.is_empty()
    }

    pub fn visible(&self) -> &[Handle] {
        self.projection.visible()
    }

    pub fn shadow(&self) -> &[Handle] {
        self.projection.shadow()
    }

    pub fn row_of(&self, handle: Handle) -> Option<usize> {
        self.projection.row_of(handle)
    }

    pub fn handle_at(&self, row: usize) -> Result<Handle> {
        self.projection
            .handle_at(row)
            .ok_or_else(|| self.out_of_bounds(row))
    }

    /// Record shown at a visible row.
    pub fn item_at<'s>(&self, store: &'s Store<R>, row: usize) -> Result<&'s R> {
        self.check_store(store, "item_at")?;
        store.get(self.handle_at(row)?)
    }

    /// All visible records in display order.
    pub fn items<'s>(&self, store: &'s Store<R>) -> Result<Vec<&'s R>> {
        self.check_store(store, "items")?;
        self.visible().iter().map(|h| store.get(*h)).collect()
    }

    /// Rebuilds the view from scratch over `store`.
    ///
    /// Attaching again to the same store is a full rebuild.
    pub fn attach(&mut self, store: &Store<R>) -> Result<ViewUpdate> {
        self.attach_arranged(store, ArrangementKind::Own)
    }

    /// Forgets the store; the view becomes empty.
    pub fn detach(&mut self) {
        self.projection.clear();
        self.attached = None;
    }

    /// Incorporates one change set of the attached store.
    pub fn apply(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<ViewUpdate> {
        self.apply_arranged(store, changes, ArrangementKind::Own)
    }

    /// Replaces the sort; `None` keeps the current order as is.
    pub fn sort_by(&mut self, store: &Store<R>, sort: Option<SortBy<R>>) -> Result<ViewUpdate> {
        self.sort = sort;
        if !self.is_attached() {
            return Ok(ViewUpdate::unchanged(0));
        }
        self.check_store(store, "sort_by")?;
        let refresh = Refresh {
            resort: true,
            ..Refresh::default()
        };
        self.rearrange(store, &ChangeSet::new(), refresh, ArrangementKind::Own)
    }

    /// Replaces the filter expression.
    ///
    /// A [`RefilterKind::Same`] change does no work at all.
    pub fn filter_by(
        &mut self,
        store: &Store<R>,
        expr: F::Expr,
    ) -> Result<(RefilterKind, ViewUpdate)> {
        self.filter_by_arranged(store, expr, ArrangementKind::Own)
    }

    /// Checks the view against `store`; see [`Projection::check_invariants`].
    ///
    /// Also verifies that the visible rows are sorted when a sort is set.
    pub fn check_invariants(&self, store: &Store<R>) -> std::result::Result<(), String> {
        self.projection
            .check_invariants(store, |item| self.filter.matches(item))?;
        if let Some(sort) = &self.sort {
            let items = self.items(store).map_err(|e| e.to_string())?;
            if let Some(row) =
                crate::permutation::first_unsorted_by(&items, |a, b| sort.compare(a, b))
            {
                return Err(format!("visible row {row} is out of order"));
            }
        }
        Ok(())
    }

    pub(crate) fn check_store(&self, store: &Store<R>, operation: &'static str) -> Result<()> {
        match self.attached {
            None => Err(ViewError::Detached { operation }.into()),
            Some(expected) if expected != store.id() => Err(ViewError::WrongStore {
                expected,
                actual: store.id(),
            }
            .into()),
            Some(_) => Ok(()),
        }
    }

    pub(crate) fn projection_mut(&mut self) -> &mut Projection {
        &mut self.projection
    }

    pub(crate) fn set_sort(&mut self, sort: Option<SortBy<R>>) {
        self.sort = sort;
    }

    pub(crate) fn attach_arranged(
        &mut self,
        store: &Store<R>,
        kind: ArrangementKind<'_>,
    ) -> Result<ViewUpdate> {
        let before = self.projection.nvisible();
        let everything = ChangeSet::from_parts(Vec::new(), Vec::new(), store.handles().to_vec());
        let mut projection = Projection::new();
        let mut update = projection.rearrange(
            store,
            &everything,
            Refresh::default(),
            |item| self.filter.matches(item),
            arrangement(&self.sort, kind),
        )?;
        self.projection = projection;
        self.attached = Some(store.id());

        // Every previously visible row is gone; the rebuilt rows are all new.
        update.positions = PositionMap::with_offset(0, vec![None; before]);
        update.removed = before;
        update.visible_before = before;
        debug!(
            store = %store.id(),
            visible = update.visible_after,
            hidden = self.projection.shadow().len(),
            "Attached view"
        );
        Ok(update)
    }

    pub(crate) fn apply_arranged(
        &mut self,
        store: &Store<R>,
        changes: &ChangeSet,
        kind: ArrangementKind<'_>,
    ) -> Result<ViewUpdate> {
        self.check_store(store, "apply")?;
        if changes.is_empty() {
            return Ok(ViewUpdate::unchanged(self.nvisible()));
        }
        let passthrough = matches!(kind, ArrangementKind::Own)
            && self.sort.is_none()
            && !self.filter.is_active();
        let update = if passthrough {
            self.projection.passthrough(changes)?
        } else {
            self.rearrange(store, changes, Refresh::default(), kind)?
        };
        debug!(
            erased = changes.erased().len(),
            updated = changes.updated().len(),
            inserted = changes.inserted().len(),
            visible = update.visible_after,
            passthrough,
            "Applied changes to view"
        );
        Ok(update)
    }

    pub(crate) fn filter_by_arranged(
        &mut self,
        store: &Store<R>,
        expr: F::Expr,
        kind: ArrangementKind<'_>,
    ) -> Result<(RefilterKind, ViewUpdate)> {
        if self.is_attached() {
            self.check_store(store, "filter_by")?;
        }
        let refilter = self.filter.set_expr(expr);
        if !self.is_attached() {
            return Ok((refilter, ViewUpdate::unchanged(0)));
        }
        let refresh = match refilter {
            RefilterKind::Same => return Ok((refilter, ViewUpdate::unchanged(self.nvisible()))),
            RefilterKind::Incremental => Refresh {
                recheck_visible: true,
                ..Refresh::default()
            },
            RefilterKind::Full => Refresh {
                recheck_visible: true,
                rescan_shadow: true,
                ..Refresh::default()
            },
        };
        let update = self.rearrange(store, &ChangeSet::new(), refresh, kind)?;
        debug!(kind = ?refilter, visible = update.visible_after, "Refiltered view");
        Ok((refilter, update))
    }

    /// Runs the batch algorithm with an explicit arrangement.
    pub(crate) fn rearrange(
        &mut self,
        store: &Store<R>,
        changes: &ChangeSet,
        refresh: Refresh,
        kind: ArrangementKind<'_>,
    ) -> Result<ViewUpdate> {
        let arrangement = arrangement(&self.sort, kind);
        let filter = &self.filter;
        self.projection
            .rearrange(store, changes, refresh, |item| filter.matches(item), arrangement)
    }

    fn out_of_bounds(&self, row: usize) -> crate::Error {
        ViewError::RowOutOfBounds {
            row,
            visible: self.nvisible(),
        }
        .into()
    }
}

/// Which ordering [`SortedView::rearrange`] applies.
#[derive(Clone, Copy)]
pub(crate) enum ArrangementKind<'a> {
    /// The view's own sort, if any.
    Own,
    Selection {
        selected: &'a HashSet<Handle>,
        order: SelectionOrder,
    },
}

fn arrangement<'a, R>(sort: &'a Option<SortBy<R>>, kind: ArrangementKind<'a>) -> Arrangement<'a, R> {
    match kind {
        ArrangementKind::Own => match sort {
            Some(sort) => Arrangement::Sorted(sort),
            None => Arrangement::Unsorted,
        },
        ArrangementKind::Selection { selected, order } => {
            Arrangement::Selection { selected, order }
        }
    }
}
