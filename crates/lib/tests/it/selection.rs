//! Grouping rows by selection.

use viewsync::{
    Result, Store,
    view::{SelectableView, SelectionOrder, SortBy},
};

use crate::helpers::*;

fn select_keys(view: &mut SelectableView<i32>, store: &Store<i32>, keys: &[i32]) -> Result<()> {
    for key in keys {
        let handle = store.find(key).unwrap();
        view.select(store, handle)?;
    }
    Ok(())
}

#[test]
fn test_selection_scenario() -> Result<()> {
    let mut store = Store::new();
    store.upsert([1, 2, 3, 4, 5])?;
    let mut view = SelectableView::unfiltered().with_selection_order(SelectionOrder::SelectedFirst);
    view.attach(&store)?;
    view.set_partition_by_selection(&store, true)?;

    select_keys(&mut view, &store, &[2, 4])?;
    assert_eq!(visible_keys(&view, &store)?, vec![2, 4, 1, 3, 5]);
    assert_eq!(view.selected_count(), 2);
    assert_consistent(&view, &store);
    Ok(())
}

#[test]
fn test_toggle_slides_across_the_boundary() -> Result<()> {
    let mut store = Store::new();
    store.upsert([1, 2, 3, 4, 5])?;
    let mut view = SelectableView::unfiltered().with_selection_order(SelectionOrder::SelectedLast);
    view.attach(&store)?;
    view.set_partition_by_selection(&store, true)?;

    // Each newly selected row lands right after the boundary.
    select_keys(&mut view, &store, &[1, 3])?;
    assert_eq!(visible_keys(&view, &store)?, vec![2, 4, 5, 3, 1]);

    let handle = store.find(&1).unwrap();
    let update = view.toggle(&store, handle)?;
    assert_eq!(visible_keys(&view, &store)?, vec![2, 4, 5, 1, 3]);
    assert_eq!(update.removed, 0);
    assert_eq!(update.inserted, 0);
    assert_eq!(update.positions.new_index(4), Some(3));
    assert_eq!(update.positions.new_index(3), Some(4));
    assert_eq!(update.positions.new_index(0), Some(0));
    assert_consistent(&view, &store);
    Ok(())
}

#[test]
fn test_turning_partition_off_restores_the_sort() -> Result<()> {
    let mut store = Store::new();
    store.upsert([5, 3, 1, 4, 2])?;
    let mut view = SelectableView::unfiltered().with_selection_order(SelectionOrder::SelectedFirst);
    view.attach(&store)?;
    view.sort_by(&store, Some(SortBy::natural()))?;
    view.set_partition_by_selection(&store, true)?;
    select_keys(&mut view, &store, &[4])?;
    assert_eq!(visible_keys(&view, &store)?, vec![4, 1, 2, 3, 5]);

    // Newcomers join the end of their group.
    let changes = store.upsert([0, 6])?;
    view.apply(&store, &changes)?;
    assert_eq!(visible_keys(&view, &store)?, vec![4, 1, 2, 3, 5, 0, 6]);

    view.set_partition_by_selection(&store, false)?;
    assert_eq!(visible_keys(&view, &store)?, vec![0, 1, 2, 3, 4, 5, 6]);
    assert!(view.is_selected(store.find(&4).unwrap()));
    assert_consistent(&view, &store);
    Ok(())
}

#[test]
fn test_partition_requires_an_order() -> Result<()> {
    let mut store = Store::new();
    store.upsert([1, 2])?;
    let mut view: SelectableView<i32> = SelectableView::unfiltered();
    view.attach(&store)?;

    let err = view.set_partition_by_selection(&store, true).unwrap_err();
    assert!(err.is_logic_error());
    assert!(!view.is_partitioned());

    // Erased items leave the selection.
    select_keys(&mut view, &store, &[2])?;
    let changes = store.erase(&2)?;
    view.apply(&store, &changes)?;
    assert_eq!(view.selected_count(), 0);
    assert_consistent(&view, &store);
    Ok(())
}
