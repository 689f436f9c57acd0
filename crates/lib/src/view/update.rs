//! Descriptions of what a view update did to the visible rows.

use std::ops::Range;

/// Old visible row -> new visible row.
///
/// Rows below `offset` kept their index; the table stores only the tail that
/// moved. `None` means the row left the visible region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    offset: usize,
    map: Vec<Option<usize>>,
}

impl PositionMap {
    /// The map of an update that moved nothing.
    pub fn identity(len: usize) -> Self {
        Self {
            offset: len,
            map: Vec::new(),
        }
    }

    /// Builds a map from one entry per old row, trimming the unchanged prefix.
    pub fn from_entries(entries: Vec<Option<usize>>) -> Self {
        let offset = entries
            .iter()
            .enumerate()
            .take_while(|(old, new)| **new == Some(*old))
            .count();
        let mut map = entries;
        map.drain(..offset);
        Self { offset, map }
    }

    /// Builds a map that keeps rows below `offset` and stores the rest.
    pub fn with_offset(offset: usize, map: Vec<Option<usize>>) -> Self {
        Self { offset, map }
    }

    /// Number of leading rows that did not move.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Stored entries for old rows `offset..`.
    pub fn entries(&self) -> &[Option<usize>] {
        &self.map
    }

    /// Number of old rows the map describes.
    pub fn old_len(&self) -> usize {
        self.offset + self.map.len()
    }

    /// New index of an old row, or `None` if it left the visible region.
    ///
    /// Rows at or beyond [`PositionMap::old_len`] did not exist and map to
    /// `None`.
    pub fn new_index(&self, old: usize) -> Option<usize> {
        if old < self.offset {
            Some(old)
        } else {
            self.map.get(old - self.offset).copied().flatten()
        }
    }

    /// Returns true if every old row kept its index.
    pub fn is_identity(&self) -> bool {
        self.map
            .iter()
            .enumerate()
            .all(|(i, new)| *new == Some(self.offset + i))
    }

    /// Iterates `(old, new)` pairs for the rows past the offset.
    pub fn moved(&self) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
        self.map
            .iter()
            .enumerate()
            .map(move |(i, new)| (self.offset + i, *new))
    }
}

/// Summary of one view update, delivered to structural observers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    /// Old visible row -> new visible row.
    pub positions: PositionMap,
    /// New-row ranges whose content was updated in place.
    pub changed: Vec<Range<usize>>,
    /// Rows that left the visible region.
    pub removed: usize,
    /// Rows that entered the visible region.
    pub inserted: usize,
    pub visible_before: usize,
    pub visible_after: usize,
}

impl ViewUpdate {
    /// An update that touched nothing.
    pub fn unchanged(visible: usize) -> Self {
        Self {
            positions: PositionMap::identity(visible),
            changed: Vec::new(),
            removed: 0,
            inserted: 0,
            visible_before: visible,
            visible_after: visible,
        }
    }

    /// Returns true if no row moved, entered, left, or changed.
    pub fn is_noop(&self) -> bool {
        self.removed == 0
            && self.inserted == 0
            && self.changed.is_empty()
            && self.positions.is_identity()
    }

    /// Returns true if the visible row order or membership changed.
    pub fn is_structural(&self) -> bool {
        self.removed != 0 || self.inserted != 0 || !self.positions.is_identity()
    }
}
