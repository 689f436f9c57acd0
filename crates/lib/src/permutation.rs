//! Index-permutation utilities.
//!
//! Every structural change in a view ends with the question "where did old row
//! `i` go?". The functions here answer it from the permutation that was
//! actually applied, so higher layers never have to search for items to find
//! their new positions.

use std::{cmp::Ordering, ops::Range};

use thiserror::Error;

/// Errors raised when an index set handed to one of the permutation helpers
/// does not satisfy its contract.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermutationError {
    /// An index points outside the sequence it describes.
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The same index appears twice where a permutation was expected.
    #[error("Index {index} appears more than once")]
    DuplicateIndex { index: usize },

    /// A removal set was not sorted ascending.
    #[error("Removal indices must be sorted ascending (found {previous} before {next})")]
    UnsortedIndices { previous: usize, next: usize },

    /// A marker array does not cover the sequence it marks.
    #[error("Marker array length {marks} does not match sequence length {len}")]
    MarkerLengthMismatch { marks: usize, len: usize },
}

impl PermutationError {
    /// Check if this error reports an out-of-range index.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, PermutationError::IndexOutOfRange { .. })
    }

    /// Check if this error reports an ordering violation of the input.
    pub fn is_ordering_error(&self) -> bool {
        matches!(self, PermutationError::UnsortedIndices { .. })
    }
}

impl From<PermutationError> for crate::Error {
    fn from(err: PermutationError) -> Self {
        crate::Error::Permutation(err)
    }
}

/// Inverts a full permutation.
///
/// `order[new] = old` becomes `inverse[old] = new`.
pub fn inverse_permutation(order: &[usize]) -> Result<Vec<usize>, PermutationError> {
    let len = order.len();
    let mut inverse = vec![usize::MAX; len];
    for (new, &old) in order.iter().enumerate() {
        if old >= len {
            return Err(PermutationError::IndexOutOfRange { index: old, len });
        }
        if inverse[old] != usize::MAX {
            return Err(PermutationError::DuplicateIndex { index: old });
        }
        inverse[old] = new;
    }
    Ok(inverse)
}

/// Inverts a partial permutation.
///
/// `origins` describes a new layout slot by slot: `Some(old)` when the slot
/// holds what used to live at `old`, `None` for content that did not exist in
/// the old layout. The result maps every old index below `old_len` to its new
/// slot, or `None` when it no longer appears. Origins at or above `old_len`
/// are ignored.
pub fn partial_inverse<I>(origins: I, old_len: usize) -> Vec<Option<usize>>
where
    I: IntoIterator<Item = Option<usize>>,
{
    let mut map = vec![None; old_len];
    for (new, origin) in origins.into_iter().enumerate() {
        if let Some(old) = origin
            && old < old_len
        {
            map[old] = Some(new);
        }
    }
    map
}

/// Builds the old -> new map for removing `removed` from a sequence of `len`.
///
/// `removed` must be sorted ascending without duplicates. Survivors shift
/// down by the number of removed indices in front of them.
pub fn relocate_after_removal(
    len: usize,
    removed: &[usize],
) -> Result<Vec<Option<usize>>, PermutationError> {
    for pair in removed.windows(2) {
        if pair[0] >= pair[1] {
            return Err(PermutationError::UnsortedIndices {
                previous: pair[0],
                next: pair[1],
            });
        }
    }
    if let Some(&last) = removed.last()
        && last >= len
    {
        return Err(PermutationError::IndexOutOfRange { index: last, len });
    }

    let mut map = Vec::with_capacity(len);
    let mut pending = removed.iter().peekable();
    let mut shift = 0;
    for index in 0..len {
        if pending.next_if_eq(&&index).is_some() {
            shift += 1;
            map.push(None);
        } else {
            map.push(Some(index - shift));
        }
    }
    Ok(map)
}

/// Merges an ascending position list into maximal contiguous ranges.
///
/// Duplicates are tolerated and collapse into the range that contains them.
pub fn coalesce_ranges(positions: &[usize]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for &pos in positions {
        match ranges.last_mut() {
            Some(last) if pos < last.end => {}
            Some(last) if pos == last.end => last.end += 1,
            _ => ranges.push(pos..pos + 1),
        }
    }
    ranges
}

/// Removes every element whose marker is set, in one pass.
///
/// Returns the number of removed elements. Relative order of the survivors is
/// preserved.
pub fn compact_marked<T>(items: &mut Vec<T>, marks: &[bool]) -> Result<usize, PermutationError> {
    if marks.len() != items.len() {
        return Err(PermutationError::MarkerLengthMismatch {
            marks: marks.len(),
            len: items.len(),
        });
    }
    let before = items.len();
    let mut flags = marks.iter();
    items.retain(|_| !flags.next().copied().unwrap_or(false));
    Ok(before - items.len())
}

/// Checks that `items` is non-decreasing under `compare`.
///
/// This is the generic sortedness check used to validate pre-sorted batch
/// preconditions. Returns the index of the first element that is out of
/// order, so callers can report it.
pub fn first_unsorted_by<T, C>(items: &[T], mut compare: C) -> Option<usize>
where
    C: FnMut(&T, &T) -> Ordering,
{
    items
        .windows(2)
        .position(|pair| compare(&pair[0], &pair[1]) == Ordering::Greater)
        .map(|i| i + 1)
}

/// Convenience wrapper over [`first_unsorted_by`].
pub fn is_sorted_by<T, C>(items: &[T], compare: C) -> bool
where
    C: FnMut(&T, &T) -> Ordering,
{
    first_unsorted_by(items, compare).is_none()
}

/// Stable merge of two runs that are each sorted under `compare`.
///
/// On ties the element from `left` comes first, which keeps rows that were
/// already in place ahead of newcomers with an equal sort key.
pub fn merge_sorted_by<T, C>(left: Vec<T>, right: Vec<T>, mut compare: C) -> Vec<T>
where
    C: FnMut(&T, &T) -> Ordering,
{
    if right.is_empty() {
        return left;
    }
    if left.is_empty() {
        return right;
    }

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged
}
