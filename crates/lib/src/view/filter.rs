//! Filter expressions.
//!
//! A filter decides which records are visible. Changing the expression
//! reports how much of a view must be recomputed: nothing ([`Same`]), only the
//! visible rows ([`Incremental`], the new expression can only hide rows), or
//! everything ([`Full`]).
//!
//! [`Same`]: RefilterKind::Same
//! [`Incremental`]: RefilterKind::Incremental
//! [`Full`]: RefilterKind::Full

use std::{fmt, rc::Rc};

use serde::{Deserialize, Serialize};

/// How much of a view a filter change invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefilterKind {
    /// The expression did not change.
    Same,
    /// The new expression is a strict refinement; only visible rows can drop out.
    Incremental,
    /// Anything may change.
    Full,
}

/// A filter over records of type `R`.
pub trait Filter<R> {
    /// The expression type accepted by [`Filter::set_expr`].
    type Expr;

    /// Replaces the expression and classifies the change.
    fn set_expr(&mut self, expr: Self::Expr) -> RefilterKind;

    /// Returns false if every record passes; views use this for the
    /// identity fast path.
    fn is_active(&self) -> bool;

    fn matches(&self, item: &R) -> bool;
}

/// The filter that lets everything through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoFilter;

impl<R> Filter<R> for NoFilter {
    type Expr = ();

    fn set_expr(&mut self, _expr: ()) -> RefilterKind {
        RefilterKind::Same
    }

    fn is_active(&self) -> bool {
        false
    }

    fn matches(&self, _item: &R) -> bool {
        true
    }
}

/// Records that can be matched against a text expression.
pub trait Searchable {
    /// Returns true if the record matches `needle`.
    ///
    /// `needle` is already trimmed and lowercased and never empty.
    fn matches_text(&self, needle: &str) -> bool;
}

/// Case-insensitive substring test against an already lowercased needle.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if haystack.is_ascii() && needle.is_ascii() {
        haystack
            .as_bytes()
            .windows(needle.len().max(1))
            .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
            || needle.is_empty()
    } else {
        haystack.to_lowercase().contains(needle)
    }
}

impl Searchable for String {
    fn matches_text(&self, needle: &str) -> bool {
        contains_ignore_case(self, needle)
    }
}

impl Searchable for &str {
    fn matches_text(&self, needle: &str) -> bool {
        contains_ignore_case(self, needle)
    }
}

macro_rules! searchable_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Searchable for $ty {
                fn matches_text(&self, needle: &str) -> bool {
                    self.to_string().contains(needle)
                }
            }
        )*
    };
}

searchable_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Case-insensitive substring filter.
///
/// Typing more characters into a search box produces an expression that
/// contains the previous one; such changes are [`RefilterKind::Incremental`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFilter {
    expr: String,
}

impl TextFilter {
    pub fn new(expr: impl AsRef<str>) -> Self {
        Self {
            expr: normalize(expr.as_ref()),
        }
    }

    /// The normalized (trimmed, lowercased) expression.
    pub fn expr(&self) -> &str {
        &self.expr
    }
}

fn normalize(expr: &str) -> String {
    expr.trim().to_lowercase()
}

impl<R: Searchable> Filter<R> for TextFilter {
    type Expr = String;

    fn set_expr(&mut self, expr: String) -> RefilterKind {
        let expr = normalize(&expr);
        let kind = if expr == self.expr {
            RefilterKind::Same
        } else if expr.contains(self.expr.as_str()) {
            RefilterKind::Incremental
        } else {
            RefilterKind::Full
        };
        self.expr = expr;
        kind
    }

    fn is_active(&self) -> bool {
        !self.expr.is_empty()
    }

    fn matches(&self, item: &R) -> bool {
        self.expr.is_empty() || item.matches_text(&self.expr)
    }
}

/// Shared predicate used as a [`PredicateFilter`] expression.
pub type Predicate<R> = Rc<dyn Fn(&R) -> bool>;

/// Filter driven by an arbitrary predicate.
///
/// Predicates cannot be compared, so every change is treated as
/// [`RefilterKind::Full`] unless both the old and the new expression are
/// empty, or the caller states the refinement explicitly with
/// [`PredicateFilter::refine`].
pub struct PredicateFilter<R> {
    predicate: Option<Predicate<R>>,
}

impl<R> Default for PredicateFilter<R> {
    fn default() -> Self {
        Self { predicate: None }
    }
}

impl<R> fmt::Debug for PredicateFilter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateFilter")
            .field("active", &self.predicate.is_some())
            .finish()
    }
}

impl<R> PredicateFilter<R> {
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn(&R) -> bool + 'static,
    {
        Self {
            predicate: Some(Rc::new(predicate)),
        }
    }

    /// Expression that narrows the current one: everything it accepts must
    /// also be accepted by the current expression.
    pub fn refine<P>(predicate: P) -> PredicateExpr<R>
    where
        P: Fn(&R) -> bool + 'static,
    {
        PredicateExpr {
            predicate: Some(Rc::new(predicate)),
            refines: true,
        }
    }

    /// Expression with no relationship to the current one.
    pub fn replace<P>(predicate: P) -> PredicateExpr<R>
    where
        P: Fn(&R) -> bool + 'static,
    {
        PredicateExpr {
            predicate: Some(Rc::new(predicate)),
            refines: false,
        }
    }

    /// Expression that removes the filter.
    pub fn clear() -> PredicateExpr<R> {
        PredicateExpr {
            predicate: None,
            refines: false,
        }
    }
}

/// Expression accepted by [`PredicateFilter`].
pub struct PredicateExpr<R> {
    predicate: Option<Predicate<R>>,
    refines: bool,
}

impl<R> Filter<R> for PredicateFilter<R> {
    type Expr = PredicateExpr<R>;

    fn set_expr(&mut self, expr: PredicateExpr<R>) -> RefilterKind {
        let kind = match (&self.predicate, &expr.predicate) {
            (None, None) => RefilterKind::Same,
            (_, Some(_)) if expr.refines => RefilterKind::Incremental,
            _ => RefilterKind::Full,
        };
        self.predicate = expr.predicate;
        kind
    }

    fn is_active(&self) -> bool {
        self.predicate.is_some()
    }

    fn matches(&self, item: &R) -> bool {
        self.predicate.as_ref().is_none_or(|p| p(item))
    }
}
