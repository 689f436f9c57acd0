//! Row-addressed facade over a store and a view.
//!
//! [`Table`] owns a [`Store`] and a view and keeps them in lockstep. Every
//! mutation goes through one bracket:
//!
//! 1. observers get `begin_structural_change`;
//! 2. live [`PersistentRef`]s are captured together with their items;
//! 3. the store is mutated and the view is fed the resulting change set;
//! 4. references are remapped through the view's position map and verified;
//! 5. observers get row-level notifications, then `end_structural_change`.
//!
//! The closing notification is sent even when a step fails.
//!
//! ```
//! use viewsync::table::Table;
//! use viewsync::view::SortBy;
//!
//! # fn main() -> viewsync::Result<()> {
//! let mut table = Table::new()?;
//! table.sort_by(Some(SortBy::natural()))?;
//! table.assign([10, 15, 1, 25, 100])?;
//! let pinned = table.persistent_ref(1)?; // the row showing 10
//!
//! table.upsert([-100])?;
//! assert_eq!(table.resolve(pinned)?, Some(2));
//! assert_eq!(table.row(2)?, &10);
//! # Ok(())
//! # }
//! ```

use std::ops::Range;

use tracing::{debug, warn};

use crate::{
    Result,
    store::{ChangeSet, Handle, ObserverId, Record, Store},
    view::{
        Filter, NoFilter, RefilterKind, SelectableView, SelectionOrder, SortBy, SortedView,
        ViewSync, ViewUpdate,
    },
};

mod errors;
pub use errors::TableError;

mod observer;
pub use observer::{RecordingObserver, ViewEvent, ViewObserver};

mod refs;
pub use refs::{InvalidationPolicy, PersistentRef, RefState};
pub(crate) use refs::{Captured, RefRegistry};


/// A store plus a view, addressed by visible row.
///
/// # Type Parameters
/// - `R`: the record type
/// - `V`: the view; [`SortedView`] by default, [`SelectableView`] for
///   selection support
pub struct Table<R: Record, V = SortedView<R, NoFilter>> {
    store: Store<R>,
    view: V,
    refs: RefRegistry,
    policy: InvalidationPolicy,
    next_observer: u64,
    observers: Vec<(ObserverId, Box<dyn ViewObserver>)>,
}

impl<R: Record> Table<R> {
    /// An empty, unsorted, unfiltered table.
    pub fn new() -> Result<Self> {
        Self::with_view(SortedView::unfiltered())
    }
}

impl<R, V> std::fmt::Debug for Table<R, V>
where
    R: Record + std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("store", &self.store)
            .field("view", &self.view)
            .field("policy", &self.policy)
            .field("refs", &self.refs.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<R, V> Table<R, V>
where
    R: Record,
    V: ViewSync<R>,
{
    /// An empty table driving `view`.
    pub fn with_view(view: V) -> Result<Self> {
        Self::from_store(Store::new(), view)
    }

    /// Wraps an existing store; `view` is attached to it.
    pub fn from_store(store: Store<R>, mut view: V) -> Result<Self> {
        view.attach(&store)?;
        debug!(store = %store.id(), rows = view.projection().nvisible(), "Created table");
        Ok(Self {
            store,
            view,
            refs: RefRegistry::default(),
            policy: InvalidationPolicy::default(),
            next_observer: 0,
            observers: Vec::new(),
        })
    }

    pub fn store(&self) -> &Store<R> {
        &self.store
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn invalidation_policy(&self) -> InvalidationPolicy {
        self.policy
    }

    pub fn set_invalidation_policy(&mut self, policy: InvalidationPolicy) {
        self.policy = policy;
    }

    /// Number of visible rows.
    pub fn row_count(&self) -> usize {
        self.view.projection().nvisible()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// The record shown at `row`.
    pub fn row(&self, row: usize) -> Result<&R> {
        let handle = self.handle_at(row)?;
        self.store.get(handle)
    }

    /// All visible records in display order.
    pub fn rows(&self) -> Result<Vec<&R>> {
        self.view
            .projection()
            .visible()
            .iter()
            .map(|h| self.store.get(*h))
            .collect()
    }

    /// The visible row of the record with `key`, if it is shown.
    pub fn find_row(&self, key: &R::Key) -> Option<usize> {
        let handle = self.store.find(key)?;
        self.view.projection().row_of(handle)
    }

    pub fn handle_at(&self, row: usize) -> Result<Handle> {
        self.view.projection().handle_at(row).ok_or_else(|| {
            TableError::RowOutOfBounds {
                row,
                rows: self.row_count(),
            }
            .into()
        })
    }

    /// Replaces the whole contents with `items`.
    ///
    /// Records whose key survives are updated in place rather than erased
    /// and re-inserted.
    pub fn assign<I>(&mut self, items: I) -> Result<ViewUpdate>
    where
        I: IntoIterator<Item = R>,
    {
        self.mutate("assign", |store| store.assign(items))
    }

    /// Inserts new records and replaces existing ones with equal keys.
    pub fn upsert<I>(&mut self, items: I) -> Result<ViewUpdate>
    where
        I: IntoIterator<Item = R>,
    {
        self.mutate("upsert", |store| store.upsert(items))
    }

    /// Erases the record with `key`. An absent key is not an error.
    pub fn erase(&mut self, key: &R::Key) -> Result<ViewUpdate> {
        self.mutate("erase", |store| store.erase(key))
    }

    pub fn erase_keys<'k, I>(&mut self, keys: I) -> Result<ViewUpdate>
    where
        I: IntoIterator<Item = &'k R::Key>,
        R::Key: 'k,
    {
        self.mutate("erase_keys", |store| store.erase_keys(keys))
    }

    /// Erases a range of the store's insertion sequence.
    pub fn erase_range(&mut self, range: Range<usize>) -> Result<ViewUpdate> {
        self.mutate("erase_range", |store| store.erase_range(range))
    }

    /// Erases the records shown at a range of visible rows.
    pub fn erase_rows(&mut self, rows: Range<usize>) -> Result<ViewUpdate> {
        if rows.end > self.row_count() || rows.start > rows.end {
            return Err(TableError::RowOutOfBounds {
                row: rows.end,
                rows: self.row_count(),
            }
            .into());
        }
        let keys = self.view.projection().visible()[rows]
            .iter()
            .map(|h| self.store.get(*h).map(|r| r.key().clone()))
            .collect::<Result<Vec<_>>>()?;
        self.erase_keys(keys.iter())
    }

    pub fn clear(&mut self) -> Result<ViewUpdate> {
        self.mutate("clear", |store| store.clear())
    }

    /// Erases `erase` and upserts `upserts` as one change.
    pub fn modify<'k, E, U>(&mut self, erase: E, upserts: U) -> Result<ViewUpdate>
    where
        E: IntoIterator<Item = &'k R::Key>,
        U: IntoIterator<Item = R>,
        R::Key: 'k,
    {
        self.mutate("modify", |store| store.modify(erase, upserts))
    }

    pub fn sort_by(&mut self, sort: Option<SortBy<R>>) -> Result<ViewUpdate> {
        self.bracket("sort_by", |store, view| view.sort_by(store, sort))
    }

    /// Replaces the filter expression and reports how much was recomputed.
    pub fn filter_by(
        &mut self,
        expr: <V::Filter as Filter<R>>::Expr,
    ) -> Result<RefilterKind> {
        let mut kind = RefilterKind::Same;
        self.bracket("filter_by", |store, view| {
            let (refilter, update) = view.filter_by(store, expr)?;
            kind = refilter;
            Ok(update)
        })?;
        Ok(kind)
    }

    /// Creates a persistent reference to the item shown at `row`.
    pub fn persistent_ref(&mut self, row: usize) -> Result<PersistentRef> {
        self.handle_at(row)?;
        Ok(self.refs.create(row))
    }

    /// Current row of a reference; `None` once its item left the view.
    pub fn resolve(&self, reference: PersistentRef) -> Result<Option<usize>> {
        match self.refs.state(reference) {
            Some(RefState::Live(row)) => Ok(Some(row)),
            Some(_) => Ok(None),
            None => Err(TableError::UnknownReference { reference }.into()),
        }
    }

    pub fn ref_state(&self, reference: PersistentRef) -> Result<RefState> {
        self.refs
            .state(reference)
            .ok_or_else(|| TableError::UnknownReference { reference }.into())
    }

    pub fn release(&mut self, reference: PersistentRef) -> Result<()> {
        if self.refs.release(reference) {
            Ok(())
        } else {
            Err(TableError::UnknownReference { reference }.into())
        }
    }

    /// References pointing at a visible row, with that row.
    pub fn live_refs(&self) -> Vec<(PersistentRef, usize)> {
        self.refs.live().collect()
    }

    pub fn subscribe(&mut self, observer: Box<dyn ViewObserver>) -> ObserverId {
        let id = ObserverId::new(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> Result<Box<dyn ViewObserver>> {
        match self.observers.iter().position(|(i, _)| *i == id) {
            Some(pos) => Ok(self.observers.remove(pos).1),
            None => Err(TableError::UnknownObserver { id }.into()),
        }
    }

    /// Checks the view against the store; see [`ViewSync::check_invariants`].
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        self.view.check_invariants(&self.store)?;
        for (reference, row) in self.refs.live() {
            if row >= self.row_count() {
                return Err(format!("{reference} points past the last row ({row})"));
            }
        }
        Ok(())
    }

    /// Runs a store mutation and feeds its change set to the view.
    ///
    /// If a store observer fails, the mutation is already applied: the view
    /// and references still follow it, and the observer error is returned
    /// after the bracket closes.
    fn mutate<M>(&mut self, operation: &'static str, mutation: M) -> Result<ViewUpdate>
    where
        M: FnOnce(&mut Store<R>) -> Result<ChangeSet>,
    {
        let mut observer_failure = None;
        let update = self.bracket_store(operation, |store, view| match mutation(store) {
            Ok(changes) => view.apply(store, &changes),
            Err(err) => {
                let Some(changes) = err.applied_changes() else {
                    return Err(err);
                };
                let update = view.apply(store, changes);
                observer_failure = Some(err);
                update
            }
        })?;
        match observer_failure {
            Some(err) => {
                warn!(operation, error = %err, "Store observer failed");
                Err(err)
            }
            None => Ok(update),
        }
    }

    /// Runs a view-only change inside the structural bracket.
    fn bracket<C>(&mut self, operation: &'static str, change: C) -> Result<ViewUpdate>
    where
        C: FnOnce(&Store<R>, &mut V) -> Result<ViewUpdate>,
    {
        self.bracket_store(operation, |store, view| change(store, view))
    }

    fn bracket_store<C>(&mut self, operation: &'static str, change: C) -> Result<ViewUpdate>
    where
        C: FnOnce(&mut Store<R>, &mut V) -> Result<ViewUpdate>,
    {
        self.notify(|o| o.begin_structural_change());
        let result = self.run_change(operation, change);
        self.notify(|o| o.end_structural_change());
        if let Err(err) = &result {
            warn!(operation, error = %err, "Table change failed");
        }
        result
    }

    fn run_change<C>(&mut self, operation: &'static str, change: C) -> Result<ViewUpdate>
    where
        C: FnOnce(&mut Store<R>, &mut V) -> Result<ViewUpdate>,
    {
        let captured = self.refs.capture(self.view.projection());
        let update = change(&mut self.store, &mut self.view)?;
        let remapped =
            self.refs
                .remap(&captured, &update, self.view.projection(), self.policy);
        self.publish(&update);
        debug!(
            operation,
            rows = update.visible_after,
            removed = update.removed,
            inserted = update.inserted,
            refs = captured.len(),
            "Table change"
        );
        remapped?;
        Ok(update)
    }

    /// Sends the row-level notifications for one update.
    fn publish(&mut self, update: &ViewUpdate) {
        if update.removed > 0 {
            self.notify(|o| o.rows_removed(update.removed));
        }
        if update.inserted > 0 {
            self.notify(|o| o.rows_inserted(update.inserted));
        }
        if !update.positions.is_identity() {
            self.notify(|o| o.rows_remapped(&update.positions));
        }
        if !update.changed.is_empty() {
            self.notify(|o| o.rows_changed(&update.changed));
        }
    }

    fn notify<N>(&mut self, mut notification: N)
    where
        N: FnMut(&mut dyn ViewObserver),
    {
        for (_, observer) in self.observers.iter_mut() {
            notification(observer.as_mut());
        }
    }
}

/// Selection operations, available when the table drives a
/// [`SelectableView`].
impl<R, F> Table<R, SelectableView<R, F>>
where
    R: Record,
    F: Filter<R>,
{
    pub fn select(&mut self, key: &R::Key) -> Result<ViewUpdate> {
        let handle = self.handle_for(key)?;
        self.bracket("select", |store, view| view.select(store, handle))
    }

    pub fn deselect(&mut self, key: &R::Key) -> Result<ViewUpdate> {
        let handle = self.handle_for(key)?;
        self.bracket("deselect", |store, view| view.deselect(store, handle))
    }

    pub fn toggle(&mut self, key: &R::Key) -> Result<ViewUpdate> {
        let handle = self.handle_for(key)?;
        self.bracket("toggle", |store, view| view.toggle(store, handle))
    }

    pub fn is_selected(&self, key: &R::Key) -> bool {
        self.store
            .find(key)
            .is_some_and(|h| self.view.is_selected(h))
    }

    /// Keys of the selected records, in no particular order.
    pub fn selected_keys(&self) -> Vec<&R::Key> {
        self.view
            .selected()
            .filter_map(|h| self.store.get(h).ok())
            .map(|r| r.key())
            .collect()
    }

    pub fn clear_selection(&mut self) -> ViewUpdate {
        self.view.clear_selection()
    }

    pub fn set_selection_order(&mut self, order: Option<SelectionOrder>) -> Result<ViewUpdate> {
        self.bracket("set_selection_order", |store, view| {
            view.set_selection_order(store, order)
        })
    }

    pub fn set_partition_by_selection(&mut self, enabled: bool) -> Result<ViewUpdate> {
        self.bracket("set_partition_by_selection", |store, view| {
            view.set_partition_by_selection(store, enabled)
        })
    }

    fn handle_for(&self, key: &R::Key) -> Result<Handle> {
        self.store.find(key).ok_or_else(|| {
            TableError::KeyNotFound {
                key: format!("{key:?}"),
            }
            .into()
        })
    }
}
