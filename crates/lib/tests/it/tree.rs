//! Tree facade over path-bearing records.

use viewsync::{
    Result, Tree,
    tagged::{NodeKind, Tagged},
    tree::{LeafCount, SumBy, TreeBatch, TreeEvent, TreeNode, TreeRecorder},
    view::{NoFilter, SortBy, TextFilter},
};

use crate::helpers::*;

type Sizes = SumBy<fn(&FileEntry) -> u64, u64>;

fn sized_tree() -> Tree<FileEntry, TextFilter, Sizes> {
    Tree::with_parts(
        TextFilter::default(),
        SumBy::new(entry_size as fn(&FileEntry) -> u64),
    )
}

fn names<L, V>(page: &viewsync::tree::Page<L, V>) -> Vec<&str> {
    page.children().map(|node| node.name()).collect()
}

#[test]
fn test_tree_scenario() -> Result<()> {
    let mut tree: Tree<String, NoFilter, LeafCount> = Tree::with_parts(NoFilter, LeafCount);
    tree.upsert(["a/b/x", "a/b/y", "a/c/z"].map(String::from))?;

    let a = tree.page("a")?;
    assert_eq!(names(a), vec!["b", "c"]);
    assert_eq!(tree.page("a/b")?.aggregate(), &2);
    assert_eq!(tree.page("a/c")?.aggregate(), &1);
    assert_eq!(a.aggregate(), &3);

    let recorder = TreeRecorder::new();
    tree.subscribe(Box::new(recorder.clone()));
    tree.erase(["a/b/x", "a/b/y"])?;

    assert!(tree.page("a/b").is_err());
    assert_eq!(names(tree.page("a")?), vec!["c"]);
    assert_eq!(tree.page("a")?.aggregate(), &1);
    let removed_b = recorder.take().into_iter().any(|event| match event {
        TreeEvent::PageUpdated { path, update } => path == "a" && update.removed == 1,
        _ => false,
    });
    assert!(removed_b);
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_directory_listing_with_sizes() -> Result<()> {
    let mut tree = sized_tree();
    tree.rebuild([
        file("docs/guide.md", 120),
        file("docs/api/index.md", 40),
        file("src/main.rs", 300),
        file("src/util/fmt.rs", 80),
        file("README.md", 10),
    ])?;
    assert_eq!(tree.root().aggregate(), &550);
    assert_eq!(tree.page("docs")?.aggregate(), &160);
    assert_eq!(tree.page("src/util")?.aggregate(), &80);

    tree.filter_by("md".to_string())?;
    assert_eq!(names(tree.root()), vec!["README.md", "docs"]);
    assert_eq!(tree.root().aggregate(), &170);
    assert_eq!(tree.page("src")?.aggregate(), &0);

    // Growing a hidden file changes nothing visible.
    tree.upsert([file("src/main.rs", 900)])?;
    assert_eq!(tree.root().aggregate(), &170);

    tree.filter_by(String::new())?;
    assert_eq!(tree.root().aggregate(), &1150);
    assert_eq!(tree.leaf_count(), 5);
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_directories_first_then_largest() -> Result<()> {
    let kind_then_size = SortBy::new(
        |a: &TreeNode<FileEntry, Sizes>, b: &TreeNode<FileEntry, Sizes>| {
            let size = |node: &TreeNode<FileEntry, Sizes>| match node.body() {
                Tagged::Page(page) => *page.aggregate(),
                Tagged::Leaf(entry) => entry.size,
            };
            a.kind()
                .cmp(&b.kind())
                .then_with(|| size(b).cmp(&size(a)))
        },
    );
    let mut tree = sized_tree().with_sort(kind_then_size)?;
    tree.upsert([
        file("small.txt", 1),
        file("big.txt", 99),
        file("lib/a.rs", 5),
        file("bin/b.rs", 50),
    ])?;
    assert_eq!(names(tree.root()), vec!["bin", "lib", "big.txt", "small.txt"]);
    assert_eq!(
        tree.root().child(1).map(|node| node.kind()),
        Some(NodeKind::Page)
    );

    tree.upsert([file("lib/c.rs", 60)])?;
    assert_eq!(names(tree.root()), vec!["lib", "bin", "big.txt", "small.txt"]);
    assert_eq!(tree.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_mixed_batch_keeps_the_page() -> Result<()> {
    let mut tree = sized_tree();
    tree.upsert([file("a/b/x", 1), file("a/b/y", 2)])?;
    let page_id = tree.page("a/b")?.id();
    let on_y = tree.persistent_ref("a/b", 1)?;

    tree.apply(TreeBatch {
        erased: vec!["a/b/x".to_string()],
        upserted: vec![file("a/b/w", 4)],
    })?;
    let b = tree.page("a/b")?;
    assert_eq!(b.id(), page_id);
    assert_eq!(names(b), vec!["y", "w"]);
    assert_eq!(b.aggregate(), &6);
    assert_eq!(tree.resolve(on_y)?, Some(("a/b".to_string(), 0)));
    assert_eq!(on_y.page(), page_id);

    let err = tree
        .apply(TreeBatch {
            erased: vec!["b/x".to_string(), "a/x".to_string()],
            upserted: Vec::new(),
        })
        .unwrap_err();
    assert!(err.is_precondition_violation());
    assert_eq!(tree.leaf_count(), 2);
    Ok(())
}
