//! Path decomposition.
//!
//! A tree is built from leaves that carry a path. At every page the path is
//! split into the part already consumed (the *context*) and the rest; the
//! analyzer reports whether the rest names a leaf of this page or the next
//! page down.

use std::cmp::Ordering;

use super::TreeError;

/// A leaf record that carries its position in the tree.
pub trait PathRecord {
    fn path(&self) -> &str;
}

impl PathRecord for String {
    fn path(&self) -> &str {
        self
    }
}

impl PathRecord for &str {
    fn path(&self) -> &str {
        self
    }
}

/// What the remainder of a path denotes at the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// The remainder is a single segment: a leaf of the current page.
    Leaf,
    /// The remainder continues below a child page.
    Page,
}

/// One step of path analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'p> {
    pub kind: SegmentKind,
    /// Context for the next step: the path up to and including `name`.
    pub context: &'p str,
    pub name: &'p str,
}

/// Splits paths into segments.
pub trait PathAnalyzer {
    /// Analyzes `path` below `context`.
    ///
    /// `context` must be a prefix of `path`, as returned by an earlier call
    /// for the same path (or empty at the root).
    fn analyze<'p>(&self, context: &str, path: &'p str) -> Result<Segment<'p>, TreeError>;

    /// Compares two paths so that paths sharing a prefix are contiguous.
    fn group_order(&self, a: &str, b: &str) -> Ordering;
}

/// Analyzer for separator-delimited paths such as `a/b/c`.
///
/// Empty segments (`a//b`, a leading or trailing separator) are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorAnalyzer {
    separator: char,
}

impl Default for SeparatorAnalyzer {
    fn default() -> Self {
        Self { separator: '/' }
    }
}

impl SeparatorAnalyzer {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    fn segments<'p>(&self, path: &'p str) -> impl Iterator<Item = &'p str> {
        path.split(self.separator).filter(|s| !s.is_empty())
    }
}

impl PathAnalyzer for SeparatorAnalyzer {
    fn analyze<'p>(&self, context: &str, path: &'p str) -> Result<Segment<'p>, TreeError> {
        let rest = path
            .strip_prefix(context)
            .ok_or_else(|| TreeError::PathOutsideContext {
                path: path.to_string(),
                context: context.to_string(),
            })?;
        let skipped = rest.len() - rest.trim_start_matches(self.separator).len();
        let start = path.len() - rest.len() + skipped;
        let rest = &path[start..];
        if rest.is_empty() {
            return Err(TreeError::EmptySegment {
                path: path.to_string(),
                context: context.to_string(),
            });
        }

        let (name, tail) = match rest.find(self.separator) {
            Some(at) => (&rest[..at], &rest[at..]),
            None => (rest, ""),
        };
        let end = start + name.len();
        let kind = if tail.chars().all(|c| c == self.separator) {
            SegmentKind::Leaf
        } else {
            SegmentKind::Page
        };
        Ok(Segment {
            kind,
            context: &path[..end],
            name,
        })
    }

    fn group_order(&self, a: &str, b: &str) -> Ordering {
        self.segments(a).cmp(self.segments(b))
    }
}

/// Segment-wise comparison of `/`-separated paths.
///
/// Sorting leaves with this order makes every page's leaves contiguous, and
/// a page's own contents follow directly after any leaf that names the page.
pub fn path_group_order(a: &str, b: &str) -> Ordering {
    SeparatorAnalyzer::default().group_order(a, b)
}
