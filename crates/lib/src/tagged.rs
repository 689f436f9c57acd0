//! Closed-set tagged references over the two node kinds of a tree.
//!
//! A tree node is either a *page* (an aggregating inner node) or a *leaf*
//! (a node carrying external data). [`Tagged`] is the owning form used inside
//! a page's child store, [`TaggedRef`] and [`TaggedMut`] are the borrowed
//! forms handed out to callers.
//!
//! # Examples
//!
//! ```
//! use viewsync::tagged::{LeafKind, PageKind, Tagged};
//!
//! let node: Tagged<Vec<u8>, &str> = Tagged::leaf("readme");
//! assert!(node.holds::<LeafKind>());
//! assert_eq!(node.get::<LeafKind>(), Some(&"readme"));
//! assert!(node.get::<PageKind>().is_none());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant of a tagged reference.
///
/// Pages order before leaves, which is the conventional grouping for
/// directory-like listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Page,
    Leaf,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Page => write!(f, "page"),
            NodeKind::Leaf => write!(f, "leaf"),
        }
    }
}

/// Owning tagged reference.
///
/// Pages are boxed so the enum stays small regardless of the page size; the
/// correct destructor runs automatically when the value is dropped.
pub enum Tagged<P, L> {
    Page(Box<P>),
    Leaf(L),
}

/// Shared borrowed tagged reference.
pub enum TaggedRef<'a, P, L> {
    Page(&'a P),
    Leaf(&'a L),
}

/// Mutable borrowed tagged reference.
pub enum TaggedMut<'a, P, L> {
    Page(&'a mut P),
    Leaf(&'a mut L),
}

// Manual impls: derive would require `P: Copy` and `L: Copy`.
impl<P, L> Clone for TaggedRef<'_, P, L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, L> Copy for TaggedRef<'_, P, L> {}

impl<P: fmt::Debug, L: fmt::Debug> fmt::Debug for Tagged<P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.by_ref().fmt(f)
    }
}

impl<P: fmt::Debug, L: fmt::Debug> fmt::Debug for TaggedRef<'_, P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaggedRef::Page(page) => f.debug_tuple("Page").field(page).finish(),
            TaggedRef::Leaf(leaf) => f.debug_tuple("Leaf").field(leaf).finish(),
        }
    }
}

/// Type-level selector for one of the two kinds.
///
/// Implemented by the marker types [`PageKind`] and [`LeafKind`]; this is what
/// makes `holds::<K>()` and `get::<K>()` type-safe.
pub trait Kind<P, L> {
    /// The referenced type for this kind.
    type Target;

    /// The runtime discriminant of this kind.
    const KIND: NodeKind;

    fn project<'a>(tagged: TaggedRef<'a, P, L>) -> Option<&'a Self::Target>;

    fn project_mut<'a>(tagged: TaggedMut<'a, P, L>) -> Option<&'a mut Self::Target>;
}

/// Marker selecting the page kind.
#[derive(Debug, Clone, Copy)]
pub struct PageKind;

/// Marker selecting the leaf kind.
#[derive(Debug, Clone, Copy)]
pub struct LeafKind;

impl<P, L> Kind<P, L> for PageKind {
    type Target = P;
    const KIND: NodeKind = NodeKind::Page;

    fn project<'a>(tagged: TaggedRef<'a, P, L>) -> Option<&'a P> {
        match tagged {
            TaggedRef::Page(page) => Some(page),
            TaggedRef::Leaf(_) => None,
        }
    }

    fn project_mut<'a>(tagged: TaggedMut<'a, P, L>) -> Option<&'a mut P> {
        match tagged {
            TaggedMut::Page(page) => Some(page),
            TaggedMut::Leaf(_) => None,
        }
    }
}

impl<P, L> Kind<P, L> for LeafKind {
    type Target = L;
    const KIND: NodeKind = NodeKind::Leaf;

    fn project<'a>(tagged: TaggedRef<'a, P, L>) -> Option<&'a L> {
        match tagged {
            TaggedRef::Leaf(leaf) => Some(leaf),
            TaggedRef::Page(_) => None,
        }
    }

    fn project_mut<'a>(tagged: TaggedMut<'a, P, L>) -> Option<&'a mut L> {
        match tagged {
            TaggedMut::Leaf(leaf) => Some(leaf),
            TaggedMut::Page(_) => None,
        }
    }
}

/// Double-dispatch over the two kinds.
///
/// Implementors must handle both kinds; adding a kind would break every
/// visitor at compile time.
pub trait TaggedVisitor<P, L> {
    type Output;

    fn visit_page(&mut self, page: &P) -> Self::Output;

    fn visit_leaf(&mut self, leaf: &L) -> Self::Output;
}

impl<P, L> Tagged<P, L> {
    pub fn page(page: P) -> Self {
        Tagged::Page(Box::new(page))
    }

    pub fn leaf(leaf: L) -> Self {
        Tagged::Leaf(leaf)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Tagged::Page(_) => NodeKind::Page,
            Tagged::Leaf(_) => NodeKind::Leaf,
        }
    }

    pub fn by_ref(&self) -> TaggedRef<'_, P, L> {
        match self {
            Tagged::Page(page) => TaggedRef::Page(page),
            Tagged::Leaf(leaf) => TaggedRef::Leaf(leaf),
        }
    }

    pub fn by_mut(&mut self) -> TaggedMut<'_, P, L> {
        match self {
            Tagged::Page(page) => TaggedMut::Page(page),
            Tagged::Leaf(leaf) => TaggedMut::Leaf(leaf),
        }
    }

    /// Returns true if this reference holds kind `K`.
    pub fn holds<K: Kind<P, L>>(&self) -> bool {
        self.kind() == K::KIND
    }

    pub fn get<K: Kind<P, L>>(&self) -> Option<&K::Target> {
        K::project(self.by_ref())
    }

    pub fn get_mut<K: Kind<P, L>>(&mut self) -> Option<&mut K::Target> {
        K::project_mut(self.by_mut())
    }

    pub fn visit<V: TaggedVisitor<P, L>>(&self, visitor: &mut V) -> V::Output {
        self.by_ref().visit(visitor)
    }

    /// Consumes the reference, returning the leaf if it holds one.
    pub fn into_leaf(self) -> Result<L, Self> {
        match self {
            Tagged::Leaf(leaf) => Ok(leaf),
            page => Err(page),
        }
    }
}

impl<'a, P, L> TaggedRef<'a, P, L> {
    pub fn kind(&self) -> NodeKind {
        match self {
            TaggedRef::Page(_) => NodeKind::Page,
            TaggedRef::Leaf(_) => NodeKind::Leaf,
        }
    }

    pub fn holds<K: Kind<P, L>>(&self) -> bool {
        self.kind() == K::KIND
    }

    pub fn get<K: Kind<P, L>>(self) -> Option<&'a K::Target> {
        K::project(self)
    }

    pub fn visit<V: TaggedVisitor<P, L>>(self, visitor: &mut V) -> V::Output {
        match self {
            TaggedRef::Page(page) => visitor.visit_page(page),
            TaggedRef::Leaf(leaf) => visitor.visit_leaf(leaf),
        }
    }
}
