//! Property tests: random operation sequences against simple models.
//!
//! Every step checks the structural invariants, compares the visible rows to
//! a model recomputed from scratch, and verifies that the reported position
//! map sends each surviving old row to the row now holding the same item.

use std::{cmp::Ordering, collections::BTreeSet};

use proptest::prelude::*;
use viewsync::{
    Result, Store, Tree,
    permutation::inverse_permutation,
    tree::{LeafCount, Node, TreeNode, TreePage},
    view::{Filter, SortBy, SortedView, TextFilter, ViewUpdate},
};

use crate::helpers::*;

#[derive(Debug, Clone)]
enum FlatOp {
    Upsert(Vec<i32>),
    Erase(Vec<i32>),
    Assign(Vec<i32>),
    Filter(String),
    Sort { descending: bool },
}

fn arb_flat_op() -> impl Strategy<Value = FlatOp> {
    let values = || prop::collection::vec(-50i32..50, 0..8);
    prop_oneof![
        3 => values().prop_map(FlatOp::Upsert),
        2 => values().prop_map(FlatOp::Erase),
        1 => values().prop_map(FlatOp::Assign),
        1 => "[0-9]{0,2}".prop_map(FlatOp::Filter),
        1 => any::<bool>().prop_map(|descending| FlatOp::Sort { descending }),
    ]
}

fn natural(descending: bool) -> SortBy<i32> {
    let sort = SortBy::natural();
    if descending { sort.descending() } else { sort }
}

fn apply_flat(
    op: &FlatOp,
    store: &mut Store<i32>,
    view: &mut SortedView<i32, TextFilter>,
) -> Result<ViewUpdate> {
    match op {
        FlatOp::Upsert(values) => {
            let changes = store.upsert(values.iter().copied())?;
            view.apply(store, &changes)
        }
        FlatOp::Erase(values) => {
            let changes = store.erase_keys(values.iter())?;
            view.apply(store, &changes)
        }
        FlatOp::Assign(values) => {
            let changes = store.assign(values.iter().copied())?;
            view.apply(store, &changes)
        }
        FlatOp::Filter(expr) => Ok(view.filter_by(store, expr.clone())?.1),
        FlatOp::Sort { descending } => view.sort_by(store, Some(natural(*descending))),
    }
}

fn flat_model(store: &Store<i32>, filter: &TextFilter, descending: bool) -> Vec<i32> {
    let mut expected: Vec<i32> = store
        .iter()
        .copied()
        .filter(|v| filter.matches(v))
        .collect();
    expected.sort_unstable();
    if descending {
        expected.reverse();
    }
    expected
}

#[derive(Debug, Clone)]
enum TreeOp {
    Upsert(Vec<String>),
    Erase(Vec<String>),
    Assign(Vec<String>),
    Filter(String),
    Sort(Option<bool>),
}

fn arb_tree_op() -> impl Strategy<Value = TreeOp> {
    let path = || "[abc](/[abc]){0,2}";
    prop_oneof![
        3 => prop::collection::vec(path(), 1..6).prop_map(TreeOp::Upsert),
        2 => prop::collection::vec(path(), 1..6).prop_map(TreeOp::Erase),
        1 => prop::collection::vec(path(), 0..8).prop_map(TreeOp::Assign),
        1 => "[abc/]{0,2}".prop_map(TreeOp::Filter),
        1 => prop::option::of(any::<bool>()).prop_map(TreeOp::Sort),
    ]
}

type PathNode = TreeNode<String, LeafCount>;

fn by_key(descending: bool) -> SortBy<PathNode> {
    let sort: SortBy<PathNode> = Node::by_key();
    if descending { sort.descending() } else { sort }
}

/// Walks the visible part of `page`: children in `sort` order, no empty
/// visible pages, and only leaves containing `needle`.
fn check_visible_pages(
    page: &TreePage<String, LeafCount>,
    sort: Option<&SortBy<PathNode>>,
    needle: &str,
) -> std::result::Result<(), TestCaseError> {
    let children: Vec<&PathNode> = page.children().collect();
    if let Some(sort) = sort {
        for pair in children.windows(2) {
            prop_assert_ne!(sort.compare(pair[0], pair[1]), Ordering::Greater);
        }
    }
    for child in children {
        if let Some(sub) = child.as_page() {
            prop_assert!(sub.nvisible() > 0, "visible page {} is empty", sub.path());
            check_visible_pages(sub, sort, needle)?;
        } else if let Some(leaf) = child.as_leaf() {
            prop_assert!(leaf.contains(needle), "{} shown under filter {:?}", leaf, needle);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn flat_view_matches_model(ops in prop::collection::vec(arb_flat_op(), 1..40)) {
        let mut store = Store::new();
        let mut view = SortedView::new(TextFilter::default()).with_sort(natural(false));
        view.attach(&store).unwrap();
        let mut descending = false;

        for op in &ops {
            let before = visible(&view, &store).unwrap();
            let update = apply_flat(op, &mut store, &mut view).unwrap();
            if let FlatOp::Sort { descending: d } = op {
                descending = *d;
            }
            let after = visible(&view, &store).unwrap();

            prop_assert_eq!(view.check_invariants(&store), Ok(()));
            prop_assert_eq!(&after, &flat_model(&store, view.filter(), descending));
            prop_assert_eq!(update.visible_before, before.len());
            prop_assert_eq!(update.visible_after, after.len());
            for (old, value) in before.iter().enumerate() {
                if let Some(new) = update.positions.new_index(old) {
                    prop_assert_eq!(after.get(new), Some(value));
                }
            }
        }
    }

    #[test]
    fn tree_leaves_match_model(ops in prop::collection::vec(arb_tree_op(), 1..30)) {
        let mut tree: Tree<String, TextFilter, LeafCount> =
            Tree::with_parts(TextFilter::default(), LeafCount);
        let mut model = BTreeSet::new();
        let mut needle = String::new();
        let mut sort = None;

        for op in &ops {
            match op {
                TreeOp::Upsert(paths) => {
                    tree.upsert(paths.iter().cloned()).unwrap();
                    model.extend(paths.iter().cloned());
                }
                TreeOp::Erase(paths) => {
                    tree.erase(paths.iter().cloned()).unwrap();
                    for path in paths {
                        model.remove(path);
                    }
                }
                TreeOp::Assign(paths) => {
                    tree.assign(paths.iter().cloned()).unwrap();
                    model = paths.iter().cloned().collect();
                }
                TreeOp::Filter(expr) => {
                    tree.filter_by(expr.clone()).unwrap();
                    needle = expr.clone();
                }
                TreeOp::Sort(order) => {
                    sort = order.map(by_key);
                    tree.sort_by(sort.clone()).unwrap();
                }
            }

            let leaves: BTreeSet<String> = tree.leaves().into_iter().cloned().collect();
            prop_assert_eq!(&leaves, &model);
            let shown = model.iter().filter(|path| path.contains(needle.as_str())).count();
            prop_assert_eq!(tree.root().aggregate(), &shown);
            check_visible_pages(tree.root(), sort.as_ref(), &needle)?;
            prop_assert_eq!(tree.check_invariants(), Ok(()));
        }
    }

    #[test]
    fn inverse_permutation_round_trips(
        order in (0usize..32).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
    ) {
        let inverse = inverse_permutation(&order).unwrap();
        for (new, old) in order.iter().enumerate() {
            prop_assert_eq!(inverse[*old], new);
        }
    }
}
