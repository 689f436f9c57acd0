//! Generational handles into a [`Store`](super::Store).

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// Stable reference to one item of a store.
///
/// A handle stays valid for as long as the item it was issued for is alive,
/// no matter how the surrounding items are reordered. Once the item is erased
/// the slot's generation moves on and the handle becomes stale; looking it up
/// yields [`StoreError::StaleHandle`](super::StoreError::StaleHandle) instead
/// of some other item.
///
/// Handles are totally ordered (slot index first, then generation). Change
/// sets keep their erased and updated lists sorted in this order so observers
/// can binary-search them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the owning store.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Process-unique identity of a store.
///
/// Views remember the id of the store they were attached to and refuse
/// batches coming from any other store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        StoreId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}
