//! Persistent row references.
//!
//! A persistent reference names a visible row and follows that row's item
//! across structural changes. After every change the registry remaps its
//! references through the change's [`PositionMap`](crate::view::PositionMap)
//! and checks that each one still lands on the item it was created for.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use super::TableError;
use crate::{
    store::Handle,
    view::{Projection, ViewUpdate},
};

/// Identifier of a persistent row reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistentRef(u64);

impl fmt::Display for PersistentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref#{}", self.0)
    }
}

/// What happens to a reference whose row leaves the visible region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationPolicy {
    /// The reference becomes invalid.
    #[default]
    Invalidate,
    /// The reference is parked one past the last row and stays there.
    ParkPastEnd,
}

/// Where a persistent reference currently points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefState {
    Live(usize),
    /// Parked at the row count, past the last visible row.
    Parked(usize),
    Invalid,
}

/// A live reference as seen right before a structural change.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Captured {
    reference: PersistentRef,
    row: usize,
    handle: Handle,
}

#[derive(Debug, Default)]
pub(crate) struct RefRegistry {
    next: u64,
    refs: BTreeMap<PersistentRef, RefState>,
}

impl RefRegistry {
    pub(crate) fn create(&mut self, row: usize) -> PersistentRef {
        let reference = PersistentRef(self.next);
        self.next += 1;
        self.refs.insert(reference, RefState::Live(row));
        reference
    }

    pub(crate) fn state(&self, reference: PersistentRef) -> Option<RefState> {
        self.refs.get(&reference).copied()
    }

    /// Forgets a reference; returns false if it was not registered.
    pub(crate) fn release(&mut self, reference: PersistentRef) -> bool {
        self.refs.remove(&reference).is_some()
    }

    /// References that currently point at a visible row, with that row.
    pub(crate) fn live(&self) -> impl Iterator<Item = (PersistentRef, usize)> + '_ {
        self.refs.iter().filter_map(|(r, state)| match state {
            RefState::Live(row) => Some((*r, *row)),
            _ => None,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.refs.len()
    }

    /// Records the item under every live reference.
    ///
    /// A live reference outside the visible rows means the bookkeeping broke
    /// earlier; it is invalidated here rather than captured.
    pub(crate) fn capture(&mut self, projection: &Projection) -> Vec<Captured> {
        let mut captured = Vec::new();
        for (reference, state) in self.refs.iter_mut() {
            if let RefState::Live(row) = *state {
                match projection.handle_at(row) {
                    Some(handle) => captured.push(Captured {
                        reference: *reference,
                        row,
                        handle,
                    }),
                    None => {
                        error!(%reference, row, "Live reference outside the visible rows");
                        *state = RefState::Invalid;
                    }
                }
            }
        }
        captured
    }

    /// Moves every captured reference to its item's new row.
    ///
    /// All references are processed even if one fails verification; the
    /// first mismatch is returned and the offending references invalidated.
    pub(crate) fn remap(
        &mut self,
        captured: &[Captured],
        update: &ViewUpdate,
        projection: &Projection,
        policy: InvalidationPolicy,
    ) -> Result<(), TableError> {
        let rows = projection.nvisible();
        for state in self.refs.values_mut() {
            if let RefState::Parked(_) = state {
                *state = RefState::Parked(rows);
            }
        }

        let mut first_error = None;
        for c in captured {
            let next = match update.positions.new_index(c.row) {
                Some(row) => {
                    let found = projection.handle_at(row);
                    if found == Some(c.handle) {
                        RefState::Live(row)
                    } else {
                        error!(
                            reference = %c.reference,
                            row,
                            expected = %c.handle,
                            "Remapped reference lost its item"
                        );
                        first_error.get_or_insert(TableError::RemapMismatch {
                            reference: c.reference,
                            row,
                            expected: c.handle,
                            found,
                        });
                        RefState::Invalid
                    }
                }
                None => match policy {
                    InvalidationPolicy::Invalidate => RefState::Invalid,
                    InvalidationPolicy::ParkPastEnd => RefState::Parked(rows),
                },
            };
            trace!(reference = %c.reference, from = c.row, to = ?next, "Remapped reference");
            if let Some(state) = self.refs.get_mut(&c.reference) {
                *state = next;
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
