//! Sort criteria.

use std::{cmp::Ordering, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

/// Direction of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Applies the direction to an ascending comparison result.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// A comparator plus direction.
///
/// Cloning is cheap; the comparator is shared. Equal elements are never
/// reordered relative to each other, in either direction.
///
/// # Examples
///
/// ```
/// use viewsync::view::SortBy;
///
/// let by_len = SortBy::key(|s: &String| s.len()).descending();
/// let mut words = vec!["a".to_string(), "ccc".to_string(), "bb".to_string()];
/// words.sort_by(|a, b| by_len.compare(a, b));
/// assert_eq!(words, ["ccc", "bb", "a"]);
/// ```
pub struct SortBy<R> {
    compare: Rc<dyn Fn(&R, &R) -> Ordering>,
    order: SortOrder,
}

impl<R> Clone for SortBy<R> {
    fn clone(&self) -> Self {
        Self {
            compare: Rc::clone(&self.compare),
            order: self.order,
        }
    }
}

impl<R> fmt::Debug for SortBy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortBy")
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl<R> SortBy<R> {
    /// Sorts ascending by an arbitrary comparator.
    pub fn new<C>(compare: C) -> Self
    where
        C: Fn(&R, &R) -> Ordering + 'static,
    {
        Self {
            compare: Rc::new(compare),
            order: SortOrder::Ascending,
        }
    }

    /// Sorts ascending by a derived key.
    pub fn key<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&R) -> K + 'static,
    {
        Self::new(move |a, b| key(a).cmp(&key(b)))
    }

    /// Sorts by the record's own ordering.
    pub fn natural() -> Self
    where
        R: Ord,
    {
        Self::new(|a: &R, b: &R| a.cmp(b))
    }

    pub fn descending(self) -> Self {
        self.with_order(SortOrder::Descending)
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn compare(&self, a: &R, b: &R) -> Ordering {
        self.order.apply((self.compare)(a, b))
    }
}
