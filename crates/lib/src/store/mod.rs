//! Keyed, sequenced item store.
//!
//! A [`Store`] owns its items and indexes them two ways at once: by key, to
//! enforce that exactly one live item exists per key, and by sequence
//! position, the insertion order that unsorted views fall back to. Items live
//! in generational slots, so the [`Handle`] of an item never changes while
//! the item is alive and becomes detectably stale once it is erased.
//!
//! Every mutation returns a [`ChangeSet`] describing which handles were
//! erased, updated and inserted; the same change set is delivered to every
//! subscribed [`StoreObserver`].
//!
//! # Examples
//!
//! ```
//! use viewsync::store::Store;
//!
//! let mut store = Store::new();
//! let changes = store.assign([10, 15, 1])?;
//! assert_eq!(changes.inserted().len(), 3);
//!
//! // Re-assigning an overlapping key set updates in place.
//! let changes = store.assign([15, 1, 7])?;
//! assert_eq!(changes.erased().len(), 1);
//! assert_eq!(changes.updated().len(), 2);
//! assert_eq!(changes.inserted().len(), 1);
//! # Ok::<(), viewsync::Error>(())
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    hash::Hash,
    ops::Range,
};

use crate::Result;

mod changes;
pub use changes::ChangeSet;

mod errors;
pub use errors::StoreError;

mod handle;
pub use handle::{Handle, StoreId};

mod observer;
pub use observer::{ObserverId, StoreObserver};
use observer::ObserverCollection;


/// An item that can live in a [`Store`].
///
/// The key must uniquely identify the item within its store.
pub trait Record {
    type Key: Eq + Hash + Clone + Debug;

    fn key(&self) -> &Self::Key;
}

macro_rules! self_keyed_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                type Key = $ty;

                fn key(&self) -> &Self::Key {
                    self
                }
            }
        )*
    };
}

self_keyed_record!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, char, String);

struct Slot<R> {
    generation: u32,
    value: Option<R>,
}

/// Owning collection of records, indexed by key and by sequence position.
pub struct Store<R: Record> {
    id: StoreId,
    slots: Vec<Slot<R>>,
    free: Vec<u32>,
    sequence: Vec<Handle>,
    index: HashMap<R::Key, Handle>,
    observers: ObserverCollection<R>,
}

impl<R: Record> Default for Store<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record + Debug> Debug for Store<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("items", &self.iter().collect::<Vec<_>>())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<R: Record> Store<R> {
    pub fn new() -> Self {
        Self {
            id: StoreId::next(),
            slots: Vec::new(),
            free: Vec::new(),
            sequence: Vec::new(),
            index: HashMap::new(),
            observers: ObserverCollection::default(),
        }
    }

    /// Identity of this store, used by views to check their attachment.
    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Looks up a live item by handle.
    ///
    /// # Errors
    /// Returns [`StoreError::StaleHandle`] if the item was erased.
    pub fn get(&self, handle: Handle) -> Result<&R> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| StoreError::StaleHandle { handle }.into())
    }

    /// Mutable lookup by handle.
    ///
    /// Changing the item's key through this reference is not supported; the
    /// key index would go out of sync. Changes made here are invisible to
    /// views until the handle is reported through [`ChangeSet::mark_updated`].
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut R> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
            .ok_or_else(|| StoreError::StaleHandle { handle }.into())
    }

    /// Returns true if `handle` refers to a live item.
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_ok()
    }

    pub fn find(&self, key: &R::Key) -> Option<Handle> {
        self.index.get(key).copied()
    }

    pub fn get_by_key(&self, key: &R::Key) -> Option<&R> {
        self.find(key).and_then(|handle| self.get(handle).ok())
    }

    pub fn contains_key(&self, key: &R::Key) -> bool {
        self.index.contains_key(key)
    }

    /// Handles in sequence order.
    pub fn handles(&self) -> &[Handle] {
        &self.sequence
    }

    /// Items in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
        self.sequence.iter().filter_map(|h| self.get(*h).ok())
    }

    /// Consumes the store, returning its items in sequence order.
    pub fn into_items(mut self) -> Vec<R> {
        let sequence = std::mem::take(&mut self.sequence);
        sequence
            .into_iter()
            .filter_map(|handle| {
                self.slots
                    .get_mut(handle.index())
                    .and_then(|slot| slot.value.take())
            })
            .collect()
    }

    /// Sequence position of a live item.
    pub fn position(&self, handle: Handle) -> Option<usize> {
        self.sequence.iter().position(|h| *h == handle)
    }

    /// Moves an item to `position` in the sequence index.
    ///
    /// Only the sequence order changes; the item keeps its handle and no
    /// change set is emitted, since no item content changed.
    pub fn relocate(&mut self, handle: Handle, position: usize) -> Result<()> {
        let len = self.sequence.len();
        if position >= len {
            return Err(StoreError::PositionOutOfBounds { position, len }.into());
        }
        let from = self
            .position(handle)
            .ok_or(StoreError::StaleHandle { handle })?;
        if from < position {
            self.sequence[from..=position].rotate_left(1);
        } else {
            self.sequence[position..=from].rotate_right(1);
        }
        Ok(())
    }

    /// Subscribes an observer to every future change set.
    pub fn subscribe(&mut self, observer: Box<dyn StoreObserver<R>>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> Result<Box<dyn StoreObserver<R>>> {
        self.observers
            .remove(id)
            .ok_or_else(|| StoreError::UnknownObserver { id }.into())
    }

    /// Replaces the entire contents with `items`.
    ///
    /// Keys present before and after keep their handles and are reported as
    /// updated; within the batch the last item for a key wins.
    pub fn assign<I>(&mut self, items: I) -> Result<ChangeSet>
    where
        I: IntoIterator<Item = R>,
    {
        let items: Vec<R> = items.into_iter().collect();
        let keep: HashSet<&R::Key> = items.iter().map(Record::key).collect();
        let doomed: Vec<Handle> = self
            .index
            .iter()
            .filter(|(key, _)| !keep.contains(key))
            .map(|(_, handle)| *handle)
            .collect();
        drop(keep);

        let mut changes = ChangeSet::new();
        self.erase_handles(doomed, &mut changes);
        self.upsert_into(items, &mut changes);
        self.finish("assign", changes)
    }

    /// Inserts new items and replaces existing ones by key.
    pub fn upsert<I>(&mut self, items: I) -> Result<ChangeSet>
    where
        I: IntoIterator<Item = R>,
    {
        let mut changes = ChangeSet::new();
        self.upsert_into(items, &mut changes);
        self.finish("upsert", changes)
    }

    /// Erases the item with `key`; absent keys are a no-op.
    pub fn erase(&mut self, key: &R::Key) -> Result<ChangeSet> {
        self.erase_keys(std::iter::once(key))
    }

    pub fn erase_keys<'k, I>(&mut self, keys: I) -> Result<ChangeSet>
    where
        I: IntoIterator<Item = &'k R::Key>,
        R::Key: 'k,
    {
        let doomed: Vec<Handle> = keys.into_iter().filter_map(|k| self.find(k)).collect();
        let mut changes = ChangeSet::new();
        self.erase_handles(doomed, &mut changes);
        self.finish("erase", changes)
    }

    /// Erases a range of sequence positions.
    pub fn erase_range(&mut self, range: Range<usize>) -> Result<ChangeSet> {
        let len = self.sequence.len();
        if range.start > range.end || range.end > len {
            return Err(StoreError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            }
            .into());
        }
        let doomed = self.sequence[range].to_vec();
        let mut changes = ChangeSet::new();
        self.erase_handles(doomed, &mut changes);
        self.finish("erase_range", changes)
    }

    pub fn clear(&mut self) -> Result<ChangeSet> {
        let doomed = self.sequence.clone();
        let mut changes = ChangeSet::new();
        self.erase_handles(doomed, &mut changes);
        self.finish("clear", changes)
    }

    /// Erases `erase` and then upserts `upserts`, as a single change set.
    pub fn modify<'k, E, U>(&mut self, erase: E, upserts: U) -> Result<ChangeSet>
    where
        E: IntoIterator<Item = &'k R::Key>,
        U: IntoIterator<Item = R>,
        R::Key: 'k,
    {
        let doomed: Vec<Handle> = erase.into_iter().filter_map(|k| self.find(k)).collect();
        let mut changes = ChangeSet::new();
        self.erase_handles(doomed, &mut changes);
        self.upsert_into(upserts, &mut changes);
        self.finish("modify", changes)
    }

    fn upsert_into<I>(&mut self, items: I, changes: &mut ChangeSet)
    where
        I: IntoIterator<Item = R>,
    {
        for item in items {
            match self.index.get(item.key()).copied() {
                Some(handle) => {
                    let slot = &mut self.slots[handle.index()];
                    slot.value = Some(item);
                    changes.push_updated(handle);
                }
                None => {
                    let handle = self.allocate(item);
                    changes.push_inserted(handle);
                }
            }
        }
    }

    fn allocate(&mut self, item: R) -> Handle {
        let key = item.key().clone();
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.value = Some(item);
                Handle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(item),
                });
                Handle::new(index, 0)
            }
        };
        self.index.insert(key, handle);
        self.sequence.push(handle);
        handle
    }

    fn erase_handles(&mut self, mut doomed: Vec<Handle>, changes: &mut ChangeSet) {
        if doomed.is_empty() {
            return;
        }
        doomed.sort_unstable();
        doomed.dedup();

        for &handle in &doomed {
            let slot = &mut self.slots[handle.index()];
            if slot.generation != handle.generation() {
                continue;
            }
            if let Some(item) = slot.value.take() {
                self.index.remove(item.key());
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index() as u32);
                changes.push_erased(handle);
            }
        }
        self.sequence
            .retain(|h| doomed.binary_search(h).is_err());
    }

    fn finish(&mut self, operation: &'static str, mut changes: ChangeSet) -> Result<ChangeSet> {
        changes.normalize();
        tracing::debug!(
            store = %self.id,
            operation,
            erased = changes.erased().len(),
            updated = changes.updated().len(),
            inserted = changes.inserted().len(),
            len = self.len(),
            "Store mutated"
        );

        if !changes.is_empty() && !self.observers.is_empty() {
            let mut observers = std::mem::take(&mut self.observers);
            let outcome = observers.notify(self, &changes);
            self.observers = observers;
            if let Err(source) = outcome {
                return Err(StoreError::ObserverFailed {
                    operation,
                    changes,
                    source: Box::new(source),
                }
                .into());
            }
        }
        Ok(changes)
    }
}
