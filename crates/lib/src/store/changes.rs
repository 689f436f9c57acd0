//! Change sets emitted by store mutations.

use std::collections::HashSet;

use super::Handle;

/// The outcome of one store mutation.
///
/// `erased` and `updated` are sorted by handle and free of duplicates, so
/// observers can classify their own handles with a binary search. `inserted`
/// keeps batch order. A handle appears in at most one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    erased: Vec<Handle>,
    updated: Vec<Handle>,
    inserted: Vec<Handle>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a change set from raw lists, normalizing them.
    ///
    /// Erased and updated lists are sorted and deduplicated; a handle listed
    /// as inserted is dropped from `updated`, a handle listed as erased is
    /// dropped from the other two lists.
    pub fn from_parts(erased: Vec<Handle>, updated: Vec<Handle>, inserted: Vec<Handle>) -> Self {
        let mut changes = Self {
            erased,
            updated,
            inserted,
        };
        changes.normalize();
        changes
    }

    pub(crate) fn push_erased(&mut self, handle: Handle) {
        self.erased.push(handle);
    }

    pub(crate) fn push_updated(&mut self, handle: Handle) {
        self.updated.push(handle);
    }

    pub(crate) fn push_inserted(&mut self, handle: Handle) {
        self.inserted.push(handle);
    }

    /// Restores the sorted/disjoint shape after raw pushes.
    pub(crate) fn normalize(&mut self) {
        self.erased.sort_unstable();
        self.erased.dedup();

        let mut inserted_sorted = self.inserted.clone();
        inserted_sorted.sort_unstable();

        self.updated.sort_unstable();
        self.updated.dedup();
        let erased = &self.erased;
        self.updated.retain(|h| {
            inserted_sorted.binary_search(h).is_err() && erased.binary_search(h).is_err()
        });

        let mut seen = HashSet::with_capacity(self.inserted.len());
        self.inserted
            .retain(|h| erased.binary_search(h).is_err() && seen.insert(*h));
    }

    /// Marks an existing item as updated.
    ///
    /// Used when something other than the store itself changed an item in
    /// place, e.g. a tree page whose children were modified. Handles already
    /// present in any list are left alone.
    pub fn mark_updated(&mut self, handle: Handle) {
        if self.erased.binary_search(&handle).is_ok() || self.inserted.contains(&handle) {
            return;
        }
        if let Err(pos) = self.updated.binary_search(&handle) {
            self.updated.insert(pos, handle);
        }
    }

    pub fn erased(&self) -> &[Handle] {
        &self.erased
    }

    pub fn updated(&self) -> &[Handle] {
        &self.updated
    }

    pub fn inserted(&self) -> &[Handle] {
        &self.inserted
    }

    pub fn is_erased(&self, handle: Handle) -> bool {
        self.erased.binary_search(&handle).is_ok()
    }

    pub fn is_updated(&self, handle: Handle) -> bool {
        self.updated.binary_search(&handle).is_ok()
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.erased.is_empty() && self.updated.is_empty() && self.inserted.is_empty()
    }

    /// Returns true if the batch only removed items.
    pub fn is_erase_only(&self) -> bool {
        !self.erased.is_empty() && self.updated.is_empty() && self.inserted.is_empty()
    }

    /// Folds a later change set into this one.
    ///
    /// Items inserted and then erased within the combined window disappear
    /// entirely; items inserted and then updated stay inserted.
    pub fn absorb(&mut self, later: ChangeSet) {
        let ChangeSet {
            erased,
            updated,
            inserted,
        } = later;
        for handle in erased {
            if let Some(pos) = self.inserted.iter().position(|h| *h == handle) {
                self.inserted.remove(pos);
            } else {
                self.erased.push(handle);
            }
        }
        self.updated.extend(updated);
        self.inserted.extend(inserted);
        self.normalize();
    }
}
