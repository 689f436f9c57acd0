//! Per-page aggregate values.

use std::{marker::PhantomData, ops::Add};

use super::Page;
use crate::{Result, tagged::TaggedVisitor};

/// Computes a page's value from its visible children.
///
/// A leaf contributes [`Aggregate::leaf`]; a child page contributes its own
/// cached value. Contributions are folded in display order starting from
/// `Value::default()`. Hidden children never contribute, so the value of a
/// page follows the active filter.
pub trait Aggregate<L> {
    type Value: Clone + Default;

    fn leaf(&self, leaf: &L) -> Self::Value;

    fn fold(&self, acc: Self::Value, value: &Self::Value) -> Self::Value;
}

/// Keeps no value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAggregate;

impl<L> Aggregate<L> for NoAggregate {
    type Value = ();

    fn leaf(&self, _leaf: &L) {}

    fn fold(&self, _acc: (), _value: &()) {}
}

/// Counts visible leaves below a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeafCount;

impl<L> Aggregate<L> for LeafCount {
    type Value = usize;

    fn leaf(&self, _leaf: &L) -> usize {
        1
    }

    fn fold(&self, acc: usize, value: &usize) -> usize {
        acc + value
    }
}

/// Sums a numeric field over the visible leaves below a page.
///
/// ```
/// use viewsync::tree::{Aggregate, SumBy};
///
/// let size = SumBy::new(|file: &(String, u64)| file.1);
/// assert_eq!(size.fold(size.leaf(&("a".into(), 3)), &4), 7);
/// ```
pub struct SumBy<F, N> {
    field: F,
    _value: PhantomData<fn() -> N>,
}

impl<F, N> SumBy<F, N> {
    pub fn new(field: F) -> Self {
        Self {
            field,
            _value: PhantomData,
        }
    }
}

impl<F, N> std::fmt::Debug for SumBy<F, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SumBy").finish_non_exhaustive()
    }
}

impl<L, F, N> Aggregate<L> for SumBy<F, N>
where
    F: Fn(&L) -> N,
    N: Clone + Default + Add<Output = N>,
{
    type Value = N;

    fn leaf(&self, leaf: &L) -> N {
        (self.field)(leaf)
    }

    fn fold(&self, acc: N, value: &N) -> N {
        acc + value.clone()
    }
}

/// Contribution of one child node.
struct Contribution<'a, A> {
    aggregate: &'a A,
}

impl<L, A: Aggregate<L>> TaggedVisitor<Page<L, A::Value>, L> for Contribution<'_, A> {
    type Output = A::Value;

    fn visit_page(&mut self, page: &Page<L, A::Value>) -> A::Value {
        page.value.clone()
    }

    fn visit_leaf(&mut self, leaf: &L) -> A::Value {
        self.aggregate.leaf(leaf)
    }
}

/// Recomputes a page's value from its visible children.
///
/// Child pages must already hold their own recalculated value.
pub(super) fn recalculate<L, A: Aggregate<L>>(
    page: &mut Page<L, A::Value>,
    aggregate: &A,
) -> Result<()> {
    let mut contribution = Contribution { aggregate };
    let mut acc = A::Value::default();
    for &handle in page.projection.visible() {
        let node = page.nodes.get(handle)?;
        let value = node.body.visit(&mut contribution);
        acc = aggregate.fold(acc, &value);
    }
    page.value = acc;
    Ok(())
}
