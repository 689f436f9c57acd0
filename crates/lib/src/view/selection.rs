//! Selection tracking layered on top of [`SortedView`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    Filter, NoFilter, Projection, RefilterKind, Refresh, SortBy, SortedView, ViewError,
    ViewUpdate, sorted::ArrangementKind,
};
use crate::{
    Result,
    store::{ChangeSet, Handle, Record, Store},
};

/// Where selected rows go when the view is partitioned by selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    SelectedFirst,
    SelectedLast,
}

impl SelectionOrder {
    /// Rank of a row's group; lower ranks are shown first.
    pub(crate) fn group(self, selected: bool) -> u8 {
        match (self, selected) {
            (SelectionOrder::SelectedFirst, true) | (SelectionOrder::SelectedLast, false) => 0,
            _ => 1,
        }
    }
}

/// A [`SortedView`] that also tracks a set of selected items.
///
/// With [`SelectableView::set_partition_by_selection`] enabled, visible rows
/// are grouped by selection membership instead of being sorted: rows keep
/// their relative order inside each group, and toggling one item slides it
/// across the group boundary without disturbing anything else.
#[derive(Debug)]
pub struct SelectableView<R, F = NoFilter> {
    view: SortedView<R, F>,
    selected: HashSet<Handle>,
    order: Option<SelectionOrder>,
    partitioned: bool,
}

impl<R, F> Default for SelectableView<R, F>
where
    R: Record,
    F: Filter<R> + Default,
{
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<R: Record> SelectableView<R, NoFilter> {
    pub fn unfiltered() -> Self {
        Self::new(NoFilter)
    }
}

impl<R, F> SelectableView<R, F>
where
    R: Record,
    F: Filter<R>,
{
    pub fn new(filter: F) -> Self {
        Self {
            view: SortedView::new(filter),
            selected: HashSet::new(),
            order: None,
            partitioned: false,
        }
    }

    pub fn with_selection_order(mut self, order: SelectionOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn view(&self) -> &SortedView<R, F> {
        &self.view
    }

    pub fn projection(&self) -> &Projection {
        self.view.projection()
    }

    pub fn selection_order(&self) -> Option<SelectionOrder> {
        self.order
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    pub fn is_selected(&self, handle: Handle) -> bool {
        self.selected.contains(&handle)
    }

    /// Selected handles, in no particular order.
    pub fn selected(&self) -> impl Iterator<Item = Handle> + '_ {
        self.selected.iter().copied()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn attach(&mut self, store: &Store<R>) -> Result<ViewUpdate> {
        if self.view.attached_to() != Some(store.id()) {
            self.selected.clear();
        } else {
            self.selected.retain(|h| store.contains(*h));
        }
        let kind = arrangement_kind(self.partitioned, self.order, &self.selected);
        self.view.attach_arranged(store, kind)
    }

    pub fn detach(&mut self) {
        self.view.detach();
        self.selected.clear();
    }

    /// Incorporates one change set; erased items leave the selection.
    pub fn apply(&mut self, store: &Store<R>, changes: &ChangeSet) -> Result<ViewUpdate> {
        self.view.check_store(store, "apply")?;
        for handle in changes.erased() {
            self.selected.remove(handle);
        }
        let kind = arrangement_kind(self.partitioned, self.order, &self.selected);
        self.view.apply_arranged(store, changes, kind)
    }

    /// Replaces the sort.
    ///
    /// While partitioned by selection the sort is only remembered; it takes
    /// effect when partitioning is turned off.
    pub fn sort_by(&mut self, store: &Store<R>, sort: Option<SortBy<R>>) -> Result<ViewUpdate> {
        if !self.partitioned {
            return self.view.sort_by(store, sort);
        }
        self.view.set_sort(sort);
        if self.view.is_attached() {
            self.view.check_store(store, "sort_by")?;
        }
        Ok(ViewUpdate::unchanged(self.view.nvisible()))
    }

    pub fn filter_by(
        &mut self,
        store: &Store<R>,
        expr: F::Expr,
    ) -> Result<(RefilterKind, ViewUpdate)> {
        let kind = arrangement_kind(self.partitioned, self.order, &self.selected);
        self.view.filter_by_arranged(store, expr, kind)
    }

    /// Sets or clears the selection order.
    ///
    /// Clearing it while partitioned turns partitioning off and restores the
    /// sort. Changing it while partitioned regroups the rows.
    pub fn set_selection_order(
        &mut self,
        store: &Store<R>,
        order: Option<SelectionOrder>,
    ) -> Result<ViewUpdate> {
        if order == self.order {
            return Ok(ViewUpdate::unchanged(self.view.nvisible()));
        }
        self.order = order;
        if !self.partitioned || !self.view.is_attached() {
            if order.is_none() {
                self.partitioned = false;
            }
            return Ok(ViewUpdate::unchanged(self.view.nvisible()));
        }
        if order.is_none() {
            self.partitioned = false;
        }
        self.regroup(store)
    }

    /// Turns grouping by selection on or off.
    ///
    /// Turning it on requires a selection order. Turning it off restores the
    /// sort, if one is set.
    pub fn set_partition_by_selection(
        &mut self,
        store: &Store<R>,
        enabled: bool,
    ) -> Result<ViewUpdate> {
        if enabled && self.order.is_none() {
            return Err(ViewError::NoSelectionOrder.into());
        }
        if enabled == self.partitioned {
            return Ok(ViewUpdate::unchanged(self.view.nvisible()));
        }
        self.partitioned = enabled;
        if !self.view.is_attached() {
            return Ok(ViewUpdate::unchanged(0));
        }
        self.regroup(store)
    }

    pub fn select(&mut self, store: &Store<R>, handle: Handle) -> Result<ViewUpdate> {
        self.set_selected(store, handle, true)
    }

    pub fn deselect(&mut self, store: &Store<R>, handle: Handle) -> Result<ViewUpdate> {
        self.set_selected(store, handle, false)
    }

    pub fn toggle(&mut self, store: &Store<R>, handle: Handle) -> Result<ViewUpdate> {
        let select = !self.selected.contains(&handle);
        self.set_selected(store, handle, select)
    }

    /// Deselects everything. Rows do not move.
    pub fn clear_selection(&mut self) -> ViewUpdate {
        self.selected.clear();
        ViewUpdate::unchanged(self.view.nvisible())
    }

    /// Checks the view invariants, including the grouping when partitioned.
    pub fn check_invariants(&self, store: &Store<R>) -> std::result::Result<(), String> {
        if let Some(stray) = self.selected.iter().find(|h| !store.contains(**h)) {
            return Err(format!("{stray} is selected but no longer live"));
        }
        if !self.partitioned {
            return self.view.check_invariants(store);
        }
        self.view
            .projection()
            .check_invariants(store, |item| self.view.filter().matches(item))?;
        let Some(order) = self.order else {
            return Err("partitioned without a selection order".to_string());
        };
        let groups: Vec<u8> = self
            .view
            .visible()
            .iter()
            .map(|h| order.group(self.selected.contains(h)))
            .collect();
        if let Some(row) = groups.windows(2).position(|w| w[0] > w[1]) {
            return Err(format!("visible row {} breaks the selection grouping", row + 1));
        }
        Ok(())
    }

    fn set_selected(&mut self, store: &Store<R>, handle: Handle, select: bool) -> Result<ViewUpdate> {
        self.view.check_store(store, "select")?;
        store.get(handle)?;
        let unchanged = ViewUpdate::unchanged(self.view.nvisible());
        if self.selected.contains(&handle) == select {
            return Ok(unchanged);
        }

        let slide = match (self.partitioned, self.order) {
            (true, Some(order)) => self.slide_target(handle, order),
            _ => None,
        };
        if select {
            self.selected.insert(handle);
        } else {
            self.selected.remove(&handle);
        }
        let Some((from, to)) = slide else {
            return Ok(unchanged);
        };
        debug!(%handle, select, from, to, "Sliding row across the selection boundary");
        Ok(self.view.projection_mut().slide(from, to))
    }

    /// Current row of `handle` and the row it moves to once its membership
    /// flips. Must run before the selection set changes.
    fn slide_target(&self, handle: Handle, order: SelectionOrder) -> Option<(usize, usize)> {
        let visible = self.view.visible();
        let from = visible.iter().position(|h| *h == handle)?;
        let boundary =
            visible.partition_point(|h| order.group(self.selected.contains(h)) == 0);
        // Rows before the boundary are in group 0; the moving row lands next
        // to the boundary on the other side.
        let to = if from < boundary { boundary - 1 } else { boundary };
        Some((from, to))
    }

    fn regroup(&mut self, store: &Store<R>) -> Result<ViewUpdate> {
        self.view.check_store(store, "set_partition_by_selection")?;
        let refresh = Refresh {
            resort: true,
            ..Refresh::default()
        };
        let kind = arrangement_kind(self.partitioned, self.order, &self.selected);
        let update = self.view.rearrange(store, &ChangeSet::new(), refresh, kind)?;
        debug!(
            partitioned = self.partitioned,
            order = ?self.order,
            "Regrouped selectable view"
        );
        Ok(update)
    }
}

fn arrangement_kind(
    partitioned: bool,
    order: Option<SelectionOrder>,
    selected: &HashSet<Handle>,
) -> ArrangementKind<'_> {
    match (partitioned, order) {
        (true, Some(order)) => ArrangementKind::Selection { selected, order },
        _ => ArrangementKind::Own,
    }
}
