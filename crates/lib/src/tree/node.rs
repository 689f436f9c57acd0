//! Pages and the nodes they own.

use std::fmt;

use crate::{
    store::{Record, Store},
    table::RefRegistry,
    tagged::{LeafKind, NodeKind, PageKind, Tagged, TaggedRef},
    view::{Projection, SortBy},
};

/// Process-local identity of a page, stable for the page's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub(super) u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Key of a node within its parent page.
///
/// The kind is part of the key, so a leaf and a page may share a name.
/// Pages order before leaves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    kind: NodeKind,
    name: String,
}

impl NodeKey {
    pub fn page(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Page,
            name: name.into(),
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Leaf,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// A child of a page: either a nested page or a leaf record.
pub struct Node<L, V> {
    key: NodeKey,
    pub(super) body: Tagged<Page<L, V>, L>,
}

impl<L, V> Record for Node<L, V> {
    type Key = NodeKey;

    fn key(&self) -> &NodeKey {
        &self.key
    }
}

impl<L: fmt::Debug, V: fmt::Debug> fmt::Debug for Node<L, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("body", &self.body)
            .finish()
    }
}

impl<L, V> Node<L, V> {
    pub(super) fn leaf(name: impl Into<String>, leaf: L) -> Self {
        Self {
            key: NodeKey::leaf(name),
            body: Tagged::leaf(leaf),
        }
    }

    pub(super) fn page(page: Page<L, V>) -> Self {
        Self {
            key: NodeKey::page(page.name.clone()),
            body: Tagged::page(page),
        }
    }

    pub(super) fn into_body(self) -> Tagged<Page<L, V>, L> {
        self.body
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }

    pub fn body(&self) -> &Tagged<Page<L, V>, L> {
        &self.body
    }

    pub fn as_page(&self) -> Option<&Page<L, V>> {
        self.body.get::<PageKind>()
    }

    pub fn as_leaf(&self) -> Option<&L> {
        self.body.get::<LeafKind>()
    }

    pub(super) fn as_page_mut(&mut self) -> Option<&mut Page<L, V>> {
        self.body.get_mut::<PageKind>()
    }

    /// Directory-style order: pages first, then by name.
    pub fn by_key() -> SortBy<Self> {
        SortBy::new(|a: &Self, b: &Self| a.key.cmp(&b.key))
    }
}

/// An inner node of a tree.
///
/// A page owns its children in a [`Store`] keyed by [`NodeKey`] and keeps a
/// [`Projection`] over them, exactly like a flat view over a table. Its
/// aggregate value is cached and recomputed whenever its visible children
/// change.
pub struct Page<L, V> {
    pub(super) id: PageId,
    pub(super) path: String,
    pub(super) name: String,
    pub(super) nodes: Store<Node<L, V>>,
    pub(super) projection: Projection,
    pub(super) value: V,
    pub(super) refs: RefRegistry,
}

impl<L, V: fmt::Debug> fmt::Debug for Page<L, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("value", &self.value)
            .field("nvisible", &self.projection.nvisible())
            .field("len", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl<L, V: Default> Page<L, V> {
    pub(super) fn new(id: PageId, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            name: name.into(),
            nodes: Store::new(),
            projection: Projection::new(),
            value: V::default(),
            refs: RefRegistry::default(),
        }
    }
}

impl<L, V> Page<L, V> {
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Path of this page as first seen in the input; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last segment of the path; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cached aggregate over the visible children.
    pub fn aggregate(&self) -> &V {
        &self.value
    }

    pub fn nvisible(&self) -> usize {
        self.projection.nvisible()
    }

    /// Number of children, visible or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Visible children in display order.
    pub fn children(&self) -> impl Iterator<Item = &Node<L, V>> + '_ {
        self.projection
            .visible()
            .iter()
            .filter_map(|handle| self.nodes.get(*handle).ok())
    }

    /// All children in insertion order, hidden ones included.
    pub fn all_children(&self) -> impl Iterator<Item = &Node<L, V>> + '_ {
        self.nodes.iter()
    }

    /// The visible child at `row`.
    pub fn child(&self, row: usize) -> Option<&Node<L, V>> {
        let handle = self.projection.handle_at(row)?;
        self.nodes.get(handle).ok()
    }

    /// Child page by name, visible or not.
    pub fn page(&self, name: &str) -> Option<&Page<L, V>> {
        self.nodes.get_by_key(&NodeKey::page(name))?.as_page()
    }

    /// Leaf by name, visible or not.
    pub fn leaf(&self, name: &str) -> Option<&L> {
        self.nodes.get_by_key(&NodeKey::leaf(name))?.as_leaf()
    }

    /// Visible row of the child with `key`.
    pub fn row_of(&self, key: &NodeKey) -> Option<usize> {
        self.projection.row_of(self.nodes.find(key)?)
    }

    pub(super) fn page_mut(&mut self, name: &str) -> Option<&mut Page<L, V>> {
        let handle = self.nodes.find(&NodeKey::page(name))?;
        self.nodes.get_mut(handle).ok()?.as_page_mut()
    }

    /// Number of leaves at and below this page, visible or not.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node.as_page() {
                Some(page) => page.leaf_count(),
                None => 1,
            })
            .sum()
    }

    /// Visits every leaf at and below this page, depth first in insertion
    /// order.
    pub fn for_each_leaf<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a L),
    {
        for node in self.nodes.iter() {
            match node.body.by_ref() {
                TaggedRef::Page(page) => page.for_each_leaf(f),
                TaggedRef::Leaf(leaf) => f(leaf),
            }
        }
    }
}
