//! Hierarchical view over path-bearing leaves.
//!
//! A [`Tree`] decomposes a flat collection of leaves into pages by path:
//! `a/b/x` becomes leaf `x` in page `b` in page `a`. Each page owns its
//! children in a [`Store`](crate::store::Store) and keeps its own
//! [`Projection`](crate::view::Projection) over them, so every page is
//! synchronized with the same batch algorithm as a flat view, recursively
//! and bottom-up:
//!
//! - leaves that end at a page are applied to that page directly;
//! - the rest are grouped by their next segment and handed to the child page,
//!   which is created on demand;
//! - a child page left without children is erased from its parent, any other
//!   touched child page is reported to the parent as an update;
//! - each page rearranges once, then recomputes its [`Aggregate`] value.
//!
//! A page is visible when at least one of its children is.
//!
//! ```
//! use viewsync::tree::{LeafCount, Tree};
//! use viewsync::view::NoFilter;
//!
//! # fn main() -> viewsync::Result<()> {
//! let mut tree: Tree<String, NoFilter, LeafCount> = Tree::with_parts(NoFilter, LeafCount);
//! tree.upsert(["a/b/x", "a/b/y", "a/c/z"].map(String::from))?;
//! assert_eq!(tree.page("a")?.aggregate(), &3);
//!
//! tree.erase(["a/b/x", "a/b/y"])?;
//! assert!(tree.page("a/b").is_err());
//! assert_eq!(tree.page("a")?.aggregate(), &1);
//! # Ok(())
//! # }
//! ```

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    fmt,
};

use tracing::{debug, trace, warn};

use crate::{
    Result,
    store::{ChangeSet, Handle, ObserverId},
    table::{Captured, InvalidationPolicy, PersistentRef, RefState},
    tagged::{Tagged, TaggedRef},
    view::{Arrangement, Filter, NoFilter, RefilterKind, Refresh, SortBy, ViewUpdate},
};

mod aggregate;
pub use aggregate::{Aggregate, LeafCount, NoAggregate, SumBy};

mod errors;
pub use errors::TreeError;

mod node;
pub use node::{Node, NodeKey, Page, PageId};

mod observer;
pub use observer::{TreeEvent, TreeObserver, TreeRecorder};

mod path;
pub use path::{
    PathAnalyzer, PathRecord, Segment, SegmentKind, SeparatorAnalyzer, path_group_order,
};

#[cfg(test)]
mod tests;

/// Node type of a tree with leaves `L` and aggregate `A`.
pub type TreeNode<L, A> = Node<L, <A as Aggregate<L>>::Value>;

/// Page type of a tree with leaves `L` and aggregate `A`.
pub type TreePage<L, A> = Page<L, <A as Aggregate<L>>::Value>;

/// A persistent reference to a visible row of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeRef {
    page: PageId,
    reference: PersistentRef,
}

impl TreeRef {
    pub fn page(&self) -> PageId {
        self.page
    }
}

impl fmt::Display for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.page, self.reference)
    }
}

/// An incremental change to the leaves of a tree.
///
/// Both lists must be sorted by the analyzer's group order (see
/// [`path_group_order`]); [`Tree::apply`] rejects unsorted batches before
/// touching anything. Erasures are applied before upserts.
#[derive(Debug, Clone)]
pub struct TreeBatch<L> {
    pub erased: Vec<String>,
    pub upserted: Vec<L>,
}

impl<L> Default for TreeBatch<L> {
    fn default() -> Self {
        Self {
            erased: Vec::new(),
            upserted: Vec::new(),
        }
    }
}

impl<L> TreeBatch<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.erased.is_empty() && self.upserted.is_empty()
    }
}

/// A batch entry and how much of its path the walk has consumed.
struct Walk<T> {
    consumed: usize,
    item: T,
}

impl<T> Walk<T> {
    fn start(item: T) -> Self {
        Self { consumed: 0, item }
    }
}

/// Entries bound for one child page.
struct Group<'b, L> {
    context: String,
    erased: Vec<Walk<&'b str>>,
    upserted: Vec<Walk<L>>,
}

/// A batch split at one page.
struct Level<'b, L, V> {
    erased_leaves: Vec<NodeKey>,
    upserted_leaves: Vec<Node<L, V>>,
    groups: BTreeMap<String, Group<'b, L>>,
}

impl<'b, L, V> Level<'b, L, V> {
    fn group(&mut self, name: &str, context: &str) -> &mut Group<'b, L> {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group {
                context: context.to_string(),
                erased: Vec::new(),
                upserted: Vec::new(),
            })
    }
}

/// Everything a page walk needs besides the page itself.
struct Ctx<'t, L, G, A: Aggregate<L>> {
    analyzer: &'t dyn PathAnalyzer,
    sort: Option<&'t SortBy<TreeNode<L, A>>>,
    filter: &'t G,
    aggregate: &'t A,
    policy: InvalidationPolicy,
    next_page: &'t mut u64,
    updates: Vec<(String, ViewUpdate)>,
}

impl<'t, L, G, A> Ctx<'t, L, G, A>
where
    L: PathRecord,
    G: Filter<L>,
    A: Aggregate<L>,
{
    fn next_id(&mut self) -> PageId {
        let id = PageId(*self.next_page);
        *self.next_page += 1;
        id
    }

    fn arrangement(&self) -> Arrangement<'t, TreeNode<L, A>> {
        match self.sort {
            Some(sort) => Arrangement::Sorted(sort),
            None => Arrangement::Unsorted,
        }
    }
}

/// A page tree built from path-bearing leaves.
///
/// # Type Parameters
/// - `L`: the leaf record, addressed by [`PathRecord::path`]
/// - `G`: the filter applied to leaves
/// - `A`: the per-page [`Aggregate`]
pub struct Tree<L, G = NoFilter, A: Aggregate<L> = NoAggregate> {
    root: TreePage<L, A>,
    analyzer: Box<dyn PathAnalyzer>,
    sort: Option<SortBy<TreeNode<L, A>>>,
    filter: G,
    aggregate: A,
    policy: InvalidationPolicy,
    next_page: u64,
    next_observer: u64,
    observers: Vec<(ObserverId, Box<dyn TreeObserver>)>,
}

impl<L: PathRecord> Tree<L> {
    /// An empty tree with `/` separated paths, no filter and no aggregate.
    pub fn new() -> Self {
        Self::with_parts(NoFilter, NoAggregate)
    }
}

impl<L: PathRecord> Default for Tree<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L, G, A> fmt::Debug for Tree<L, G, A>
where
    A: Aggregate<L>,
    A::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root)
            .field("sorted", &self.sort.is_some())
            .field("policy", &self.policy)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<L, G, A> Tree<L, G, A>
where
    L: PathRecord,
    G: Filter<L>,
    A: Aggregate<L>,
{
    pub fn with_parts(filter: G, aggregate: A) -> Self {
        Self {
            root: Page::new(PageId(0), "", ""),
            analyzer: Box::new(SeparatorAnalyzer::default()),
            sort: None,
            filter,
            aggregate,
            policy: InvalidationPolicy::default(),
            next_page: 1,
            next_observer: 0,
            observers: Vec::new(),
        }
    }

    /// Replaces the path analyzer. Existing leaves are re-decomposed.
    pub fn with_analyzer(mut self, analyzer: impl PathAnalyzer + 'static) -> Result<Self> {
        self.analyzer = Box::new(analyzer);
        if !self.root.is_empty() {
            let old = std::mem::replace(&mut self.root, Page::new(PageId(0), "", ""));
            self.rebuild(into_leaves(old))?;
        }
        Ok(self)
    }

    /// Sets the initial sort of every page.
    pub fn with_sort(mut self, sort: SortBy<TreeNode<L, A>>) -> Result<Self> {
        self.sort_by(Some(sort))?;
        Ok(self)
    }

    pub fn root(&self) -> &TreePage<L, A> {
        &self.root
    }

    pub fn filter(&self) -> &G {
        &self.filter
    }

    pub fn sort(&self) -> Option<&SortBy<TreeNode<L, A>>> {
        self.sort.as_ref()
    }

    pub fn invalidation_policy(&self) -> InvalidationPolicy {
        self.policy
    }

    pub fn set_invalidation_policy(&mut self, policy: InvalidationPolicy) {
        self.policy = policy;
    }

    /// Number of leaves, visible or not.
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// All leaves, depth first.
    pub fn leaves(&self) -> Vec<&L> {
        let mut leaves = Vec::new();
        self.root.for_each_leaf(&mut |leaf| leaves.push(leaf));
        leaves
    }

    /// The page at `path`; the empty path names the root.
    ///
    /// # Errors
    /// [`TreeError::PageNotFound`] if any segment does not name a page.
    pub fn page(&self, path: &str) -> Result<&TreePage<L, A>> {
        let mut page = &self.root;
        let mut context = "";
        while let Some(segment) = step(self.analyzer.as_ref(), context, path)? {
            page = page
                .page(segment.name)
                .ok_or_else(|| TreeError::PageNotFound {
                    path: path.to_string(),
                })?;
            context = segment.context;
        }
        Ok(page)
    }

    fn page_mut(&mut self, path: &str) -> Result<&mut TreePage<L, A>> {
        let analyzer = self.analyzer.as_ref();
        let mut page = &mut self.root;
        let mut context = "";
        while let Some(segment) = step(analyzer, context, path)? {
            page = page
                .page_mut(segment.name)
                .ok_or_else(|| TreeError::PageNotFound {
                    path: path.to_string(),
                })?;
            context = segment.context;
        }
        Ok(page)
    }

    /// The leaf at `path`, visible or not.
    pub fn leaf(&self, path: &str) -> Option<&L> {
        let mut page = &self.root;
        let mut context = "";
        while let Some(segment) = step(self.analyzer.as_ref(), context, path).ok()? {
            match segment.kind {
                SegmentKind::Leaf => return page.leaf(segment.name),
                SegmentKind::Page => page = page.page(segment.name)?,
            }
            context = segment.context;
        }
        None
    }

    /// Replaces every leaf, building the tree from scratch.
    ///
    /// Leaves with the same path collapse to the last one. Observers see a
    /// single [`TreeObserver::page_reset`] for the root, and every persistent
    /// reference is dropped.
    pub fn rebuild<I>(&mut self, leaves: I) -> Result<()>
    where
        I: IntoIterator<Item = L>,
    {
        let analyzer = self.analyzer.as_ref();
        let mut sorted: Vec<L> = leaves.into_iter().collect();
        sorted.sort_by(|a, b| analyzer.group_order(a.path(), b.path()));
        let mut unique: Vec<L> = Vec::with_capacity(sorted.len());
        for leaf in sorted {
            match unique.last_mut() {
                Some(last) if analyzer.group_order(last.path(), leaf.path()) == Ordering::Equal => {
                    *last = leaf;
                }
                _ => unique.push(leaf),
            }
        }
        for leaf in &unique {
            check_path(analyzer, leaf.path())?;
        }

        self.notify(|o| o.begin_structural_change());
        let (root, mut ctx) = self.split();
        let mut fresh = Page::new(ctx.next_id(), "", "");
        let walks = unique.into_iter().map(Walk::start).collect();
        let result = build_page(&mut fresh, &mut ctx, walks).map(|()| *root = fresh);
        if result.is_ok() {
            self.notify(|o| o.page_reset(""));
        }
        self.notify(|o| o.end_structural_change());

        match &result {
            Ok(()) => debug!(
                leaves = self.leaf_count(),
                rows = self.root.nvisible(),
                "Tree rebuilt"
            ),
            Err(err) => warn!(error = %err, "Tree rebuild failed"),
        }
        result
    }

    /// Applies an incremental batch.
    ///
    /// # Errors
    /// [`TreeError::UnsortedBatch`] if either list is out of group order,
    /// and path errors for malformed paths; in both cases nothing changed.
    pub fn apply(&mut self, batch: TreeBatch<L>) -> Result<()> {
        let TreeBatch { erased, upserted } = batch;
        check_batch(self.analyzer.as_ref(), &erased, &upserted)?;
        trace!(
            erased = erased.len(),
            upserted = upserted.len(),
            "Applying tree batch"
        );
        let erased_walks: Vec<Walk<&str>> =
            erased.iter().map(|path| Walk::start(path.as_str())).collect();
        let upserted_walks: Vec<Walk<L>> = upserted.into_iter().map(Walk::start).collect();
        self.bracket("apply", |root, ctx| {
            apply_page(root, ctx, erased_walks, upserted_walks)
        })
    }

    /// Inserts or replaces leaves by path.
    pub fn upsert<I>(&mut self, leaves: I) -> Result<()>
    where
        I: IntoIterator<Item = L>,
    {
        let analyzer = self.analyzer.as_ref();
        let mut upserted: Vec<L> = leaves.into_iter().collect();
        upserted.sort_by(|a, b| analyzer.group_order(a.path(), b.path()));
        self.apply(TreeBatch {
            erased: Vec::new(),
            upserted,
        })
    }

    /// Erases leaves by path. Unknown paths are ignored.
    pub fn erase<I, S>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let analyzer = self.analyzer.as_ref();
        let mut erased: Vec<String> = paths.into_iter().map(Into::into).collect();
        erased.sort_by(|a, b| analyzer.group_order(a, b));
        self.apply(TreeBatch {
            erased,
            upserted: Vec::new(),
        })
    }

    /// Replaces the leaves with `leaves`, incrementally.
    ///
    /// Leaves whose path is present before and after are updated in place.
    pub fn assign<I>(&mut self, leaves: I) -> Result<()>
    where
        I: IntoIterator<Item = L>,
    {
        let analyzer = self.analyzer.as_ref();
        let mut upserted: Vec<L> = leaves.into_iter().collect();
        upserted.sort_by(|a, b| analyzer.group_order(a.path(), b.path()));

        let incoming: HashSet<&str> = upserted.iter().map(|leaf| leaf.path()).collect();
        let mut erased: Vec<String> = self
            .leaves()
            .into_iter()
            .map(|leaf| leaf.path())
            .filter(|path| !incoming.contains(path))
            .map(str::to_string)
            .collect();
        erased.sort_by(|a, b| analyzer.group_order(a, b));

        self.apply(TreeBatch { erased, upserted })
    }

    /// Changes the sort of every page; `None` keeps the current order.
    pub fn sort_by(&mut self, sort: Option<SortBy<TreeNode<L, A>>>) -> Result<()> {
        self.sort = sort;
        let refresh = Refresh {
            resort: true,
            ..Refresh::default()
        };
        self.bracket("sort_by", |root, ctx| refresh_page(root, ctx, refresh))
    }

    /// Changes the leaf filter and refilters every page.
    pub fn filter_by(&mut self, expr: G::Expr) -> Result<RefilterKind> {
        let kind = self.filter.set_expr(expr);
        let refresh = match kind {
            RefilterKind::Same => Refresh::default(),
            RefilterKind::Incremental => Refresh {
                recheck_visible: true,
                ..Refresh::default()
            },
            RefilterKind::Full => Refresh {
                recheck_visible: true,
                rescan_shadow: true,
                resort: false,
            },
        };
        self.bracket("filter_by", |root, ctx| refresh_page(root, ctx, refresh))?;
        Ok(kind)
    }

    /// Creates a persistent reference to a visible row of the page at
    /// `page_path`.
    pub fn persistent_ref(&mut self, page_path: &str, row: usize) -> Result<TreeRef> {
        let page = self.page_mut(page_path)?;
        let rows = page.nvisible();
        if row >= rows {
            return Err(TreeError::RowOutOfBounds {
                path: page_path.to_string(),
                row,
                rows,
            }
            .into());
        }
        Ok(TreeRef {
            page: page.id,
            reference: page.refs.create(row),
        })
    }

    /// Current page path and row of a reference.
    ///
    /// `None` if the row left the visible region or its page was destroyed.
    pub fn resolve(&self, reference: TreeRef) -> Result<Option<(String, usize)>> {
        let Some(page) = find_page(&self.root, reference.page) else {
            return Ok(None);
        };
        match page.refs.state(reference.reference) {
            Some(RefState::Live(row)) => Ok(Some((page.path.clone(), row))),
            Some(_) => Ok(None),
            None => Err(TreeError::UnknownReference {
                reference: reference.to_string(),
            }
            .into()),
        }
    }

    /// Forgets a reference. References into destroyed pages are already gone.
    pub fn release(&mut self, reference: TreeRef) -> Result<()> {
        let Some(chain) = locate(&self.root, reference.page) else {
            return Ok(());
        };
        let page = descend_mut(&mut self.root, &chain)?;
        if page.refs.release(reference.reference) {
            Ok(())
        } else {
            Err(TreeError::UnknownReference {
                reference: reference.to_string(),
            }
            .into())
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn TreeObserver>) -> ObserverId {
        let id = ObserverId::new(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> Result<Box<dyn TreeObserver>> {
        match self.observers.iter().position(|(i, _)| *i == id) {
            Some(pos) => Ok(self.observers.remove(pos).1),
            None => Err(TreeError::UnknownObserver { id }.into()),
        }
    }

    /// Checks every page: projection against children, sort order, no empty
    /// pages below the root. Returns a description of the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        check_page(&self.root, &self.filter, self.sort.as_ref(), true)
    }

    fn split(&mut self) -> (&mut TreePage<L, A>, Ctx<'_, L, G, A>) {
        let ctx = Ctx {
            analyzer: self.analyzer.as_ref(),
            sort: self.sort.as_ref(),
            filter: &self.filter,
            aggregate: &self.aggregate,
            policy: self.policy,
            next_page: &mut self.next_page,
            updates: Vec::new(),
        };
        (&mut self.root, ctx)
    }

    /// Runs a page walk inside the structural bracket, then reports every
    /// page it touched.
    fn bracket<C>(&mut self, operation: &'static str, change: C) -> Result<()>
    where
        C: FnOnce(&mut TreePage<L, A>, &mut Ctx<'_, L, G, A>) -> Result<()>,
    {
        self.notify(|o| o.begin_structural_change());
        let (root, mut ctx) = self.split();
        let result = change(root, &mut ctx);
        let updates = std::mem::take(&mut ctx.updates);
        for (path, update) in &updates {
            self.notify(|o| o.page_updated(path, update));
        }
        self.notify(|o| o.end_structural_change());

        match &result {
            Ok(()) => debug!(
                operation,
                pages = updates.len(),
                rows = self.root.nvisible(),
                "Tree change"
            ),
            Err(err) => warn!(operation, error = %err, "Tree change failed"),
        }
        result
    }

    fn notify<N>(&mut self, mut notification: N)
    where
        N: FnMut(&mut dyn TreeObserver),
    {
        for (_, observer) in self.observers.iter_mut() {
            notification(observer.as_mut());
        }
    }
}

/// One analysis step, or `None` once the path is used up.
fn step<'p>(
    analyzer: &dyn PathAnalyzer,
    context: &str,
    path: &'p str,
) -> std::result::Result<Option<Segment<'p>>, TreeError> {
    match analyzer.analyze(context, path) {
        Ok(segment) if segment.context.len() <= context.len() => Err(TreeError::EmptySegment {
            path: path.to_string(),
            context: context.to_string(),
        }),
        Ok(segment) => Ok(Some(segment)),
        Err(TreeError::EmptySegment { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Walks a leaf path to its end, so that a batch fails before any page is
/// touched.
fn check_path(analyzer: &dyn PathAnalyzer, path: &str) -> std::result::Result<(), TreeError> {
    let mut context = "";
    loop {
        let segment = analyzer.analyze(context, path)?;
        if segment.context.len() <= context.len() {
            return Err(TreeError::EmptySegment {
                path: path.to_string(),
                context: context.to_string(),
            });
        }
        match segment.kind {
            SegmentKind::Leaf => return Ok(()),
            SegmentKind::Page => context = segment.context,
        }
    }
}

fn check_sorted<'p, I>(
    analyzer: &dyn PathAnalyzer,
    list: &'static str,
    paths: I,
) -> std::result::Result<(), TreeError>
where
    I: IntoIterator<Item = &'p str>,
{
    let mut previous: Option<&str> = None;
    for (index, path) in paths.into_iter().enumerate() {
        if let Some(previous) = previous {
            if analyzer.group_order(previous, path) == Ordering::Greater {
                return Err(TreeError::UnsortedBatch { list, index });
            }
        }
        previous = Some(path);
    }
    Ok(())
}

fn check_batch<L: PathRecord>(
    analyzer: &dyn PathAnalyzer,
    erased: &[String],
    upserted: &[L],
) -> std::result::Result<(), TreeError> {
    check_sorted(analyzer, "erased", erased.iter().map(String::as_str))?;
    check_sorted(analyzer, "upserted", upserted.iter().map(|leaf| leaf.path()))?;
    for path in erased.iter().map(String::as_str) {
        check_path(analyzer, path)?;
    }
    for leaf in upserted {
        check_path(analyzer, leaf.path())?;
    }
    Ok(())
}

fn node_matches<L, V, G: Filter<L>>(filter: &G, node: &Node<L, V>) -> bool {
    match node.body.by_ref() {
        TaggedRef::Page(page) => page.nvisible() > 0,
        TaggedRef::Leaf(leaf) => filter.matches(leaf),
    }
}

/// Splits entries into this page's leaves and per-child groups.
fn classify<'b, L, V>(
    analyzer: &dyn PathAnalyzer,
    erased: Vec<Walk<&'b str>>,
    upserted: Vec<Walk<L>>,
) -> std::result::Result<Level<'b, L, V>, TreeError>
where
    L: PathRecord,
{
    let mut level = Level {
        erased_leaves: Vec::new(),
        upserted_leaves: Vec::new(),
        groups: BTreeMap::new(),
    };

    for walk in erased {
        let path = walk.item;
        let segment = analyzer.analyze(path.get(..walk.consumed).unwrap_or_default(), path)?;
        match segment.kind {
            SegmentKind::Leaf => level.erased_leaves.push(NodeKey::leaf(segment.name)),
            SegmentKind::Page => level
                .group(segment.name, segment.context)
                .erased
                .push(Walk {
                    consumed: segment.context.len(),
                    item: path,
                }),
        }
    }

    for walk in upserted {
        let (kind, name, context) = {
            let path = walk.item.path();
            let segment =
                analyzer.analyze(path.get(..walk.consumed).unwrap_or_default(), path)?;
            (
                segment.kind,
                segment.name.to_string(),
                segment.context.to_string(),
            )
        };
        match kind {
            SegmentKind::Leaf => level.upserted_leaves.push(Node::leaf(name, walk.item)),
            SegmentKind::Page => level.group(&name, &context).upserted.push(Walk {
                consumed: context.len(),
                item: walk.item,
            }),
        }
    }
    Ok(level)
}

/// Builds a fresh page from leaves that all lie below it.
fn build_page<L, G, A>(
    page: &mut TreePage<L, A>,
    ctx: &mut Ctx<'_, L, G, A>,
    leaves: Vec<Walk<L>>,
) -> Result<()>
where
    L: PathRecord,
    G: Filter<L>,
    A: Aggregate<L>,
{
    let level = classify::<L, A::Value>(ctx.analyzer, Vec::new(), leaves)?;
    let mut nodes = level.upserted_leaves;
    for (name, group) in level.groups {
        let mut child = Page::new(ctx.next_id(), group.context, name);
        build_page(&mut child, ctx, group.upserted)?;
        nodes.push(Node::page(child));
    }
    let changes = page.nodes.upsert(nodes)?;
    finish_page(page, ctx, &[], &changes, Refresh::default())
}

/// Applies the part of a batch that lies below `page`.
fn apply_page<L, G, A>(
    page: &mut TreePage<L, A>,
    ctx: &mut Ctx<'_, L, G, A>,
    erased: Vec<Walk<&str>>,
    upserted: Vec<Walk<L>>,
) -> Result<()>
where
    L: PathRecord,
    G: Filter<L>,
    A: Aggregate<L>,
{
    let captured = page.refs.capture(&page.projection);
    let level = classify(ctx.analyzer, erased, upserted)?;
    let mut changes = page
        .nodes
        .modify(level.erased_leaves.iter(), level.upserted_leaves)?;

    for (name, group) in level.groups {
        let key = NodeKey::page(name.as_str());
        let handle = match page.nodes.find(&key) {
            Some(handle) => handle,
            // Erasing below a page that does not exist.
            None if group.upserted.is_empty() => continue,
            None => {
                let child = Page::new(ctx.next_id(), group.context.as_str(), name.as_str());
                trace!(page = %group.context, "Creating page");
                changes.absorb(page.nodes.upsert([Node::page(child)])?);
                page.nodes
                    .find(&key)
                    .ok_or_else(|| TreeError::PageNotFound {
                        path: group.context.clone(),
                    })?
            }
        };

        let child = page
            .nodes
            .get_mut(handle)?
            .as_page_mut()
            .ok_or_else(|| TreeError::NotAPage {
                path: page.path.clone(),
                name: name.clone(),
            })?;
        apply_page(child, ctx, group.erased, group.upserted)?;

        if child.is_empty() {
            trace!(page = %group.context, "Removing emptied page");
            changes.absorb(page.nodes.erase(&key)?);
        } else {
            changes.mark_updated(handle);
        }
    }

    finish_page(page, ctx, &captured, &changes, Refresh::default())
}

/// Re-sorts or refilters every page below `page`, bottom-up.
fn refresh_page<L, G, A>(
    page: &mut TreePage<L, A>,
    ctx: &mut Ctx<'_, L, G, A>,
    refresh: Refresh,
) -> Result<()>
where
    L: PathRecord,
    G: Filter<L>,
    A: Aggregate<L>,
{
    if refresh.is_none() {
        return Ok(());
    }
    let captured = page.refs.capture(&page.projection);
    let mut changes = ChangeSet::new();
    let handles: Vec<Handle> = page.nodes.handles().to_vec();
    for handle in handles {
        if let Some(child) = page.nodes.get_mut(handle)?.as_page_mut() {
            refresh_page(child, ctx, refresh)?;
            changes.mark_updated(handle);
        }
    }
    finish_page(page, ctx, &captured, &changes, refresh)
}

/// Rearranges one page, recomputes its aggregate and remaps its references.
fn finish_page<L, G, A>(
    page: &mut TreePage<L, A>,
    ctx: &mut Ctx<'_, L, G, A>,
    captured: &[Captured],
    changes: &ChangeSet,
    refresh: Refresh,
) -> Result<()>
where
    L: PathRecord,
    G: Filter<L>,
    A: Aggregate<L>,
{
    let filter = ctx.filter;
    let update = if changes.is_empty() && refresh.is_none() {
        ViewUpdate::unchanged(page.projection.nvisible())
    } else {
        page.projection.rearrange(
            &page.nodes,
            changes,
            refresh,
            |node| node_matches(filter, node),
            ctx.arrangement(),
        )?
    };
    aggregate::recalculate(page, ctx.aggregate)?;
    let remapped = page
        .refs
        .remap(captured, &update, &page.projection, ctx.policy);

    trace!(
        page = %page.path,
        rows = update.visible_after,
        removed = update.removed,
        inserted = update.inserted,
        "Page rearranged"
    );
    if !update.is_noop() {
        ctx.updates.push((page.path.clone(), update));
    }
    remapped?;
    Ok(())
}

fn find_page<L, V>(page: &Page<L, V>, id: PageId) -> Option<&Page<L, V>> {
    if page.id == id {
        return Some(page);
    }
    page.nodes
        .iter()
        .filter_map(Node::as_page)
        .find_map(|child| find_page(child, id))
}

/// Child handles leading from `page` down to the page with `id`.
fn locate<L, V>(page: &Page<L, V>, id: PageId) -> Option<Vec<Handle>> {
    if page.id == id {
        return Some(Vec::new());
    }
    for &handle in page.nodes.handles() {
        let Some(child) = page.nodes.get(handle).ok().and_then(Node::as_page) else {
            continue;
        };
        if let Some(mut chain) = locate(child, id) {
            chain.insert(0, handle);
            return Some(chain);
        }
    }
    None
}

fn descend_mut<'p, L, V>(
    page: &'p mut Page<L, V>,
    chain: &[Handle],
) -> Result<&'p mut Page<L, V>> {
    let mut page = page;
    for &handle in chain {
        let path = page.path.clone();
        let node = page.nodes.get_mut(handle)?;
        let name = node.name().to_string();
        page = node
            .as_page_mut()
            .ok_or(TreeError::NotAPage { path, name })?;
    }
    Ok(page)
}

/// Takes the leaves out of a detached page.
fn into_leaves<L, V>(page: Page<L, V>) -> Vec<L> {
    let mut leaves = Vec::new();
    let mut pending = vec![page];
    while let Some(page) = pending.pop() {
        for node in page.nodes.into_items() {
            match node.into_body() {
                Tagged::Page(child) => pending.push(*child),
                Tagged::Leaf(leaf) => leaves.push(leaf),
            }
        }
    }
    leaves
}

fn check_page<L, V, G: Filter<L>>(
    page: &Page<L, V>,
    filter: &G,
    sort: Option<&SortBy<Node<L, V>>>,
    is_root: bool,
) -> std::result::Result<(), String> {
    if !is_root && page.is_empty() {
        return Err(format!("page '{}' has no children", page.path));
    }
    page.projection
        .check_invariants(&page.nodes, |node| node_matches(filter, node))
        .map_err(|err| format!("page '{}': {err}", page.path))?;
    if let Some(sort) = sort {
        let visible: Vec<&Node<L, V>> = page.children().collect();
        if let Some(pos) = visible
            .windows(2)
            .position(|pair| sort.compare(pair[0], pair[1]) == Ordering::Greater)
        {
            return Err(format!("page '{}' is unsorted at row {}", page.path, pos + 1));
        }
    }
    for child in page.nodes.iter().filter_map(Node::as_page) {
        check_page(child, filter, sort, false)?;
    }
    Ok(())
}
