//! Tests for the tree facade.

use super::*;
use crate::{tagged::NodeKind, view::TextFilter};

#[derive(Debug, Clone, PartialEq)]
struct File {
    path: String,
    size: u64,
}

impl PathRecord for File {
    fn path(&self) -> &str {
        &self.path
    }
}

fn file(path: &str, size: u64) -> File {
    File {
        path: path.to_string(),
        size,
    }
}

fn file_size(file: &File) -> u64 {
    file.size
}

type Sizes = SumBy<fn(&File) -> u64, u64>;

fn sizes() -> Sizes {
    SumBy::new(file_size as fn(&File) -> u64)
}

fn counted() -> Tree<String, NoFilter, LeafCount> {
    Tree::with_parts(NoFilter, LeafCount)
}

fn paths(leaves: &[&str]) -> Vec<String> {
    leaves.iter().map(|p| p.to_string()).collect()
}

fn names<L, V>(page: &Page<L, V>) -> Vec<String> {
    page.children().map(|node| node.name().to_string()).collect()
}

#[test]
fn test_emptied_page_is_removed_from_its_parent() -> Result<()> {
    let mut tree = counted();
    tree.upsert(paths(&["a/b/x", "a/b/y", "a/c/z"]))?;
    assert_eq!(names(tree.root()), vec!["a"]);
    assert_eq!(names(tree.page("a")?), vec!["b", "c"]);
    assert_eq!(names(tree.page("a/b")?), vec!["x", "y"]);
    assert_eq!(tree.page("a")?.aggregate(), &3);
    assert_eq!(tree.page("a/b")?.path(), "a/b");

    let recorder = TreeRecorder::new();
    tree.subscribe(Box::new(recorder.clone()));
    tree.erase(["a/b/x", "a/b/y"])?;

    assert!(matches!(
        tree.page("a/b"),
        Err(crate::Error::Tree(TreeError::PageNotFound { .. }))
    ));
    assert_eq!(names(tree.page("a")?), vec!["c"]);
    assert_eq!(tree.page("a")?.aggregate(), &1);
    assert_eq!(tree.root().aggregate(), &1);
    assert_eq!(recorder.updated_paths(), vec!["a/b", "a", ""]);

    let events = recorder.take();
    assert_eq!(events.first(), Some(&TreeEvent::Begin));
    assert_eq!(events.last(), Some(&TreeEvent::End));
    match &events[2] {
        TreeEvent::PageUpdated { path, update } => {
            assert_eq!(path, "a");
            assert_eq!(update.removed, 1);
            assert_eq!(update.positions.new_index(0), None);
            assert_eq!(update.positions.new_index(1), Some(0));
        }
        other => panic!("expected an update of page a, got {other:?}"),
    }
    match &events[3] {
        TreeEvent::PageUpdated { update, .. } => assert_eq!(update.changed, vec![0..1]),
        other => panic!("expected an update of the root, got {other:?}"),
    }
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_rebuild_resets_the_tree() -> Result<()> {
    let mut tree = counted();
    tree.upsert(paths(&["old/leaf"]))?;
    let recorder = TreeRecorder::new();
    tree.subscribe(Box::new(recorder.clone()));

    tree.rebuild(paths(&["a/c/z", "a/b/y", "a/b/x", "a//b/x"]))?;
    assert_eq!(
        recorder.take(),
        vec![
            TreeEvent::Begin,
            TreeEvent::PageReset(String::new()),
            TreeEvent::End
        ]
    );
    assert_eq!(tree.leaf_count(), 3);
    assert!(tree.page("old").is_err());
    assert_eq!(tree.root().aggregate(), &3);
    assert_eq!(tree.leaf("a/b/x").map(String::as_str), Some("a//b/x"));
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_leaf_and_page_may_share_a_name() -> Result<()> {
    let mut tree: Tree<String> = Tree::new().with_sort(Node::by_key())?;
    tree.upsert(paths(&["c", "a", "a/x", "b"]))?;

    let root = tree.root();
    assert_eq!(root.len(), 4);
    assert_eq!(names(root), vec!["a", "a", "b", "c"]);
    assert_eq!(root.child(0).map(Node::kind), Some(NodeKind::Page));
    assert_eq!(root.child(1).map(Node::kind), Some(NodeKind::Leaf));
    assert_eq!(tree.leaf("a").map(String::as_str), Some("a"));
    assert_eq!(tree.leaf("a/x").map(String::as_str), Some("a/x"));
    assert_eq!(tree.leaf("a/y"), None);
    Ok(())
}

#[test]
fn test_unsorted_batch_is_rejected_untouched() -> Result<()> {
    let mut tree = counted();
    tree.upsert(paths(&["a/x"]))?;

    let err = tree
        .apply(TreeBatch {
            erased: paths(&["a/x"]),
            upserted: paths(&["b", "a/y"]),
        })
        .unwrap_err();
    assert!(err.is_precondition_violation());
    assert!(matches!(
        err,
        crate::Error::Tree(TreeError::UnsortedBatch {
            list: "upserted",
            index: 1
        })
    ));
    assert_eq!(tree.leaf_count(), 1);
    assert!(tree.leaf("a/x").is_some());

    let err = tree.upsert(paths(&["ok", ""])).unwrap_err();
    assert!(matches!(
        err,
        crate::Error::Tree(TreeError::EmptySegment { .. })
    ));
    assert!(tree.leaf("ok").is_none());
    Ok(())
}

#[test]
fn test_erasing_unknown_paths_is_harmless() -> Result<()> {
    let mut tree = counted();
    tree.upsert(paths(&["a/x"]))?;
    tree.erase(["nowhere/x", "a/nothing", "a/deeper/still"])?;
    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_filter_hides_pages_without_visible_children() -> Result<()> {
    let mut tree: Tree<String, TextFilter, LeafCount> =
        Tree::with_parts(TextFilter::default(), LeafCount);
    tree.upsert(paths(&["docs/readme.md", "docs/guide.md", "src/main.rs"]))?;
    assert_eq!(tree.root().aggregate(), &3);

    assert_eq!(tree.filter_by("md".into())?, RefilterKind::Incremental);
    assert_eq!(names(tree.root()), vec!["docs"]);
    assert_eq!(tree.root().aggregate(), &2);
    assert_eq!(tree.page("src")?.nvisible(), 0);
    assert_eq!(tree.check_invariants(), Ok(()));

    assert_eq!(tree.filter_by("guide".into())?, RefilterKind::Full);
    assert_eq!(names(tree.page("docs")?), vec!["guide.md"]);

    assert_eq!(tree.filter_by(String::new())?, RefilterKind::Full);
    assert_eq!(names(tree.root()), vec!["docs", "src"]);
    assert_eq!(tree.root().aggregate(), &3);

    // New leaves are filtered on the way in.
    tree.filter_by("rs".into())?;
    tree.upsert(paths(&["docs/notes.txt", "src/lib.rs"]))?;
    assert_eq!(names(tree.root()), vec!["src"]);
    assert_eq!(tree.page("src")?.aggregate(), &2);
    assert_eq!(tree.leaf_count(), 5);
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_pages_sorted_by_aggregate() -> Result<()> {
    let by_size = SortBy::key(|node: &TreeNode<File, Sizes>| match node.body() {
        Tagged::Page(page) => *page.aggregate(),
        Tagged::Leaf(file) => file.size,
    })
    .descending();
    let mut tree: Tree<File, NoFilter, Sizes> =
        Tree::with_parts(NoFilter, sizes()).with_sort(by_size)?;

    tree.upsert([
        file("src/a.rs", 10),
        file("src/b.rs", 5),
        file("docs/x.md", 30),
        file("big.bin", 20),
    ])?;
    assert_eq!(names(tree.root()), vec!["docs", "big.bin", "src"]);
    assert_eq!(tree.root().aggregate(), &65);

    let on_docs = tree.persistent_ref("", 0)?;
    tree.upsert([file("src/c.rs", 40)])?;
    assert_eq!(names(tree.root()), vec!["src", "docs", "big.bin"]);
    assert_eq!(names(tree.page("src")?), vec!["c.rs", "a.rs", "b.rs"]);
    assert_eq!(tree.root().aggregate(), &105);
    assert_eq!(tree.resolve(on_docs)?, Some((String::new(), 1)));

    tree.upsert([file("src/c.rs", 1)])?;
    assert_eq!(tree.page("src")?.aggregate(), &16);
    assert_eq!(names(tree.root()), vec!["docs", "big.bin", "src"]);
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_references_are_tracked_per_page() -> Result<()> {
    let mut tree = counted();
    tree.upsert(paths(&["a/b/x", "a/b/y", "a/c/z"]))?;
    let on_c = tree.persistent_ref("a", 1)?;
    let on_y = tree.persistent_ref("a/b", 1)?;

    tree.erase(["a/b/x"])?;
    assert_eq!(tree.resolve(on_y)?, Some(("a/b".to_string(), 0)));
    assert_eq!(tree.resolve(on_c)?, Some(("a".to_string(), 1)));

    tree.erase(["a/b/y"])?;
    assert_eq!(tree.resolve(on_y)?, None);
    assert_eq!(tree.resolve(on_c)?, Some(("a".to_string(), 0)));

    tree.release(on_c)?;
    assert!(tree.resolve(on_c).is_err());
    assert!(tree.release(on_c).is_err());
    // The page is gone along with its references.
    tree.release(on_y)?;

    assert!(matches!(
        tree.persistent_ref("a", 5),
        Err(crate::Error::Tree(TreeError::RowOutOfBounds { row: 5, rows: 1, .. }))
    ));
    assert!(tree.persistent_ref("missing", 0).is_err());
    Ok(())
}

#[test]
fn test_assign_updates_unchanged_paths_in_place() -> Result<()> {
    let mut tree: Tree<File, NoFilter, Sizes> = Tree::with_parts(NoFilter, sizes());
    tree.assign([file("a/x", 1), file("a/y", 2), file("b/z", 3)])?;
    let on_y = tree.persistent_ref("a", 1)?;

    let recorder = TreeRecorder::new();
    tree.subscribe(Box::new(recorder.clone()));
    tree.assign([file("a/x", 1), file("a/y", 7), file("b/z", 3)])?;
    for event in recorder.take() {
        if let TreeEvent::PageUpdated { update, .. } = event {
            assert_eq!((update.removed, update.inserted), (0, 0));
            assert!(update.positions.is_identity());
        }
    }
    assert_eq!(tree.page("a")?.aggregate(), &8);
    assert_eq!(tree.resolve(on_y)?, Some(("a".to_string(), 1)));

    tree.assign([file("b/z", 3), file("c/w", 4)])?;
    assert!(tree.page("a").is_err());
    assert_eq!(tree.resolve(on_y)?, None);
    assert_eq!(tree.root().aggregate(), &7);
    assert_eq!(tree.leaf_count(), 2);
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_custom_separator() -> Result<()> {
    let mut tree: Tree<String> = Tree::new().with_analyzer(SeparatorAnalyzer::new('.'))?;
    tree.upsert(paths(&["net.ipv4.forward", "net.ipv6.forward", "kernel.hostname"]))?;
    assert_eq!(names(tree.page("net")?), vec!["ipv4", "ipv6"]);
    assert!(tree.leaf("kernel.hostname").is_some());

    let tree = tree.with_analyzer(SeparatorAnalyzer::default())?;
    assert_eq!(tree.leaf_count(), 3);
    assert!(tree.leaf("net.ipv4.forward").is_some());
    assert!(tree.page("net").is_err());
    Ok(())
}

#[test]
fn test_unsubscribe() -> Result<()> {
    let mut tree = counted();
    let recorder = TreeRecorder::new();
    let id = tree.subscribe(Box::new(recorder.clone()));
    tree.unsubscribe(id)?;
    assert!(tree.unsubscribe(id).is_err());
    tree.upsert(paths(&["x"]))?;
    assert!(recorder.take().is_empty());
    Ok(())
}
