//! The visible/shadow array and the batch algorithm that maintains it.

use std::{cmp::Ordering, collections::HashSet};

use tracing::trace;

use super::{PositionMap, SelectionOrder, SortBy, ViewUpdate};
use crate::{
    Result,
    permutation::{
        coalesce_ranges, compact_marked, merge_sorted_by, partial_inverse, relocate_after_removal,
    },
    store::{ChangeSet, Handle, Record, Store},
};

/// Handles of a view, visible rows first.
///
/// `entries[..nvisible]` are the rows the user sees, in display order;
/// `entries[nvisible..]` is the shadow: live items the filter hides, in no
/// particular order. Every live item of the attached store sits in exactly
/// one of the two regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    entries: Vec<Handle>,
    nvisible: usize,
}

/// Extra work requested on top of a change set.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Refresh {
    /// Re-evaluate the filter on every visible row.
    pub recheck_visible: bool,
    /// Re-evaluate the filter on every shadow row.
    pub rescan_shadow: bool,
    /// Re-sort the visible rows even if none was updated.
    pub resort: bool,
}

impl Refresh {
    pub(crate) fn is_none(&self) -> bool {
        !(self.recheck_visible || self.rescan_shadow || self.resort)
    }
}

/// How visible rows are ordered.
pub(crate) enum Arrangement<'a, R> {
    /// Keep the current order; newcomers go to the end.
    Unsorted,
    Sorted(&'a SortBy<R>),
    /// Group rows by selection membership, keeping relative order within
    /// each group.
    Selection {
        selected: &'a HashSet<Handle>,
        order: SelectionOrder,
    },
}

impl<R> Clone for Arrangement<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Arrangement<'_, R> {}

/// A row being placed, with its record resolved upfront.
struct Tracked<'s, R> {
    handle: Handle,
    item: &'s R,
    origin: Option<usize>,
    touched: bool,
}

impl<R> Arrangement<'_, R> {
    fn compare(&self, a: &Tracked<'_, R>, b: &Tracked<'_, R>) -> Ordering {
        match self {
            Arrangement::Unsorted => Ordering::Equal,
            Arrangement::Sorted(sort) => sort.compare(a.item, b.item),
            Arrangement::Selection { selected, order } => order
                .group(selected.contains(&a.handle))
                .cmp(&order.group(selected.contains(&b.handle))),
        }
    }
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible handles in display order.
    pub fn visible(&self) -> &[Handle] {
        &self.entries[..self.nvisible]
    }

    /// Handles hidden by the filter.
    pub fn shadow(&self) -> &[Handle] {
        &self.entries[self.nvisible..]
    }

    pub fn nvisible(&self) -> usize {
        self.nvisible
    }

    /// Number of tracked handles, visible or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handle_at(&self, row: usize) -> Option<Handle> {
        self.visible().get(row).copied()
    }

    /// Visible row of a handle. Linear in the number of visible rows.
    pub fn row_of(&self, handle: Handle) -> Option<usize> {
        self.visible().iter().position(|h| *h == handle)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.nvisible = 0;
    }

    /// Moves the visible row `from` to `to`, shifting the rows in between.
    pub(crate) fn slide(&mut self, from: usize, to: usize) -> ViewUpdate {
        let nvisible = self.nvisible;
        let mut update = ViewUpdate::unchanged(nvisible);
        if from == to || from >= nvisible || to >= nvisible {
            return update;
        }
        let lo = from.min(to);
        let hi = from.max(to);
        let span = hi - lo;
        let mut map: Vec<Option<usize>> = (lo..nvisible).map(Some).collect();
        if from < to {
            self.entries[lo..=hi].rotate_left(1);
            for slot in map.iter_mut().skip(1).take(span) {
                *slot = slot.map(|row| row - 1);
            }
            map[0] = Some(hi);
        } else {
            self.entries[lo..=hi].rotate_right(1);
            for slot in map.iter_mut().take(span) {
                *slot = slot.map(|row| row + 1);
            }
            map[span] = Some(lo);
        }
        update.positions = PositionMap::with_offset(lo, map);
        update
    }

    /// Applies changes without filtering or ordering: erased rows leave,
    /// inserted rows are appended to the visible region.
    pub(crate) fn passthrough(&mut self, changes: &ChangeSet) -> Result<ViewUpdate> {
        let before = self.nvisible;
        let marks: Vec<bool> = self.entries.iter().map(|h| changes.is_erased(*h)).collect();
        let removed_rows: Vec<usize> = marks[..before]
            .iter()
            .enumerate()
            .filter_map(|(row, erased)| erased.then_some(row))
            .collect();
        let map = relocate_after_removal(before, &removed_rows)?;
        compact_marked(&mut self.entries, &marks)?;
        self.nvisible = before - removed_rows.len();

        let kept = self.nvisible;
        let inserted = changes.inserted().len();
        self.entries
            .splice(kept..kept, changes.inserted().iter().copied());
        self.nvisible += inserted;

        let touched: Vec<usize> = self.entries[..kept]
            .iter()
            .enumerate()
            .filter_map(|(row, h)| changes.is_updated(*h).then_some(row))
            .collect();

        Ok(ViewUpdate {
            positions: PositionMap::from_entries(map),
            changed: coalesce_ranges(&touched),
            removed: removed_rows.len(),
            inserted,
            visible_before: before,
            visible_after: self.nvisible,
        })
    }

    /// Drops erased handles in one pass; nothing else moves.
    fn erase_only(&mut self, changes: &ChangeSet) -> Result<ViewUpdate> {
        let before = self.nvisible;
        let marks: Vec<bool> = self.entries.iter().map(|h| changes.is_erased(*h)).collect();
        let removed_rows: Vec<usize> = marks[..before]
            .iter()
            .enumerate()
            .filter_map(|(row, erased)| erased.then_some(row))
            .collect();
        let map = relocate_after_removal(before, &removed_rows)?;
        compact_marked(&mut self.entries, &marks)?;
        self.nvisible = before - removed_rows.len();

        Ok(ViewUpdate {
            positions: PositionMap::from_entries(map),
            changed: Vec::new(),
            removed: removed_rows.len(),
            inserted: 0,
            visible_before: before,
            visible_after: self.nvisible,
        })
    }

    /// Brings the projection in line with `items` after `changes`.
    ///
    /// Handles in `changes` that were erased are dropped. Updated rows and,
    /// depending on `refresh`, the whole visible or shadow region are checked
    /// against `matches` again. Rows that still match keep their relative
    /// order unless an update or `refresh.resort` calls for a stable re-sort;
    /// newcomers are sorted on their own and merged in, after existing rows
    /// with an equal key.
    ///
    /// Fails without modifying anything if a tracked handle that is not
    /// listed as erased turns out stale.
    pub(crate) fn rearrange<R, M>(
        &mut self,
        items: &Store<R>,
        changes: &ChangeSet,
        refresh: Refresh,
        matches: M,
        arrangement: Arrangement<'_, R>,
    ) -> Result<ViewUpdate>
    where
        R: Record,
        M: Fn(&R) -> bool,
    {
        if changes.is_erase_only() && refresh.is_none() {
            return self.erase_only(changes);
        }

        let before = self.nvisible;
        let mut kept: Vec<Tracked<'_, R>> = Vec::with_capacity(before);
        let mut excluded = Vec::new();
        let mut removed = 0;
        let mut kept_touched = false;

        for (row, &handle) in self.entries[..before].iter().enumerate() {
            if changes.is_erased(handle) {
                removed += 1;
                continue;
            }
            let touched = changes.is_updated(handle);
            let item = items.get(handle)?;
            if (touched || refresh.recheck_visible) && !matches(item) {
                excluded.push(handle);
                removed += 1;
                continue;
            }
            kept_touched |= touched;
            kept.push(Tracked {
                handle,
                item,
                origin: Some(row),
                touched,
            });
        }

        let mut joining: Vec<Tracked<'_, R>> = Vec::new();
        let mut shadow = Vec::with_capacity(self.entries.len() - before);
        for &handle in &self.entries[before..] {
            if changes.is_erased(handle) {
                continue;
            }
            let touched = changes.is_updated(handle);
            if touched || refresh.rescan_shadow {
                let item = items.get(handle)?;
                if matches(item) {
                    joining.push(Tracked {
                        handle,
                        item,
                        origin: None,
                        touched,
                    });
                    continue;
                }
            }
            shadow.push(handle);
        }

        let mut rejected = Vec::new();
        for &handle in changes.inserted() {
            let item = items.get(handle)?;
            if matches(item) {
                joining.push(Tracked {
                    handle,
                    item,
                    origin: None,
                    touched: false,
                });
            } else {
                rejected.push(handle);
            }
        }

        let inserted = joining.len();
        let visible = match arrangement {
            Arrangement::Unsorted => {
                kept.extend(joining);
                kept
            }
            _ => {
                if kept_touched || refresh.resort {
                    kept.sort_by(|a, b| arrangement.compare(a, b));
                }
                joining.sort_by(|a, b| arrangement.compare(a, b));
                merge_sorted_by(kept, joining, |a, b| arrangement.compare(a, b))
            }
        };

        let map = partial_inverse(visible.iter().map(|t| t.origin), before);
        let touched: Vec<usize> = visible
            .iter()
            .enumerate()
            .filter_map(|(row, t)| (t.touched && t.origin.is_some()).then_some(row))
            .collect();

        let mut entries =
            Vec::with_capacity(visible.len() + shadow.len() + excluded.len() + rejected.len());
        entries.extend(visible.iter().map(|t| t.handle));
        let nvisible = entries.len();
        entries.extend(shadow);
        entries.extend(excluded);
        entries.extend(rejected);

        trace!(
            before,
            after = nvisible,
            removed,
            inserted,
            tracked = entries.len(),
            "Rearranged projection"
        );

        self.entries = entries;
        self.nvisible = nvisible;

        Ok(ViewUpdate {
            positions: PositionMap::from_entries(map),
            changed: coalesce_ranges(&touched),
            removed,
            inserted,
            visible_before: before,
            visible_after: nvisible,
        })
    }

    /// Checks the structural invariants against the attached store.
    ///
    /// Every live item must be tracked exactly once, nothing stale may be
    /// tracked, visible rows must match and hidden rows must not. Returns a
    /// description of the first violation.
    pub fn check_invariants<R, M>(
        &self,
        items: &Store<R>,
        matches: M,
    ) -> std::result::Result<(), String>
    where
        R: Record,
        M: Fn(&R) -> bool,
    {
        if self.entries.len() != items.len() {
            return Err(format!(
                "tracks {} handles but the store holds {}",
                self.entries.len(),
                items.len()
            ));
        }
        let mut seen = HashSet::with_capacity(self.entries.len());
        for (pos, &handle) in self.entries.iter().enumerate() {
            if !seen.insert(handle) {
                return Err(format!("{handle} tracked twice"));
            }
            let item = items
                .get(handle)
                .map_err(|_| format!("{handle} at {pos} is stale"))?;
            let visible = pos < self.nvisible;
            if matches(item) != visible {
                return Err(format!(
                    "{handle} at {pos} is {} but the filter says otherwise",
                    if visible { "visible" } else { "hidden" }
                ));
            }
        }
        Ok(())
    }
}
