//! SortedView driven by a store through a shared observer.

use viewsync::{
    Result, Store,
    view::{RefilterKind, SharedView, SortBy, SortedView, TextFilter},
};

use crate::helpers::*;

fn shared_contacts(
    store: &mut Store<Contact>,
) -> Result<SharedView<SortedView<Contact, TextFilter>>> {
    let view = SharedView::new(SortedView::new(TextFilter::default()).with_sort(by_score()));
    view.borrow_mut().attach(store)?;
    store.subscribe(Box::new(view.clone()));
    Ok(view)
}

#[test]
fn test_flat_scenario_through_subscription() -> Result<()> {
    let mut store = Store::new();
    let view = SharedView::new(SortedView::unfiltered().with_sort(SortBy::natural()));
    view.borrow_mut().attach(&store)?;
    store.subscribe(Box::new(view.clone()));

    store.assign([10, 15, 1, 25, 100])?;
    assert_eq!(visible(&*view.borrow(), &store)?, vec![1, 10, 15, 25, 100]);

    store.upsert([1, -100])?;
    assert_eq!(visible(&*view.borrow(), &store)?, vec![-100, 1, 10, 15, 25, 100]);

    store.assign([100, 25, 200, -100])?;
    assert_eq!(visible(&*view.borrow(), &store)?, vec![-100, 25, 100, 200]);

    store.erase(&100)?;
    store.erase(&-100)?;
    assert_eq!(visible(&*view.borrow(), &store)?, vec![25, 200]);
    assert_consistent(&*view.borrow(), &store);
    Ok(())
}

#[test]
fn test_filter_moves_items_between_visible_and_shadow() -> Result<()> {
    let mut store = Store::new();
    let view = shared_contacts(&mut store)?;
    store.upsert([
        contact(1, "Ada", 30),
        contact(2, "Bob", 10),
        contact(3, "Adele", 20),
        contact(4, "Cy", 5),
    ])?;
    assert_eq!(visible_keys(&*view.borrow(), &store)?, vec![4, 2, 3, 1]);

    let (kind, update) = view.borrow_mut().filter_by(&store, "ad".to_string())?;
    assert_eq!(kind, RefilterKind::Incremental);
    assert_eq!(update.visible_after, 2);
    assert_eq!(visible_keys(&*view.borrow(), &store)?, vec![3, 1]);
    assert_eq!(view.borrow().shadow().len(), 2);

    // Renaming a hidden item into the filter reveals it in sort order.
    store.upsert([contact(2, "Badger", 25)])?;
    assert_eq!(visible_keys(&*view.borrow(), &store)?, vec![3, 2, 1]);

    // Narrowing only rechecks the visible rows.
    let (kind, _) = view.borrow_mut().filter_by(&store, "ade".to_string())?;
    assert_eq!(kind, RefilterKind::Incremental);
    assert_eq!(visible_keys(&*view.borrow(), &store)?, vec![3]);

    let (kind, update) = view.borrow_mut().filter_by(&store, " ADE ".to_string())?;
    assert_eq!(kind, RefilterKind::Same);
    assert!(update.is_noop());

    let (kind, _) = view.borrow_mut().filter_by(&store, String::new())?;
    assert_eq!(kind, RefilterKind::Full);
    assert_eq!(visible_keys(&*view.borrow(), &store)?, vec![4, 3, 2, 1]);
    assert_consistent(&*view.borrow(), &store);
    Ok(())
}

#[test]
fn test_resort_reports_a_full_permutation() -> Result<()> {
    let mut store = Store::new();
    let view = shared_contacts(&mut store)?;
    store.upsert([
        contact(1, "cy", 1),
        contact(2, "ada", 2),
        contact(3, "bob", 3),
    ])?;

    let update = view.borrow_mut().sort_by(&store, Some(by_name()))?;
    assert_eq!(visible_keys(&*view.borrow(), &store)?, vec![2, 3, 1]);
    assert_eq!(update.positions.new_index(0), Some(2));
    assert_eq!(update.positions.new_index(1), Some(0));
    assert_eq!(update.positions.new_index(2), Some(1));
    assert_eq!(update.removed, 0);
    assert_eq!(update.inserted, 0);

    let update = view
        .borrow_mut()
        .sort_by(&store, Some(by_name().descending()))?;
    assert_eq!(visible_keys(&*view.borrow(), &store)?, vec![1, 3, 2]);
    assert!(update.is_structural());
    Ok(())
}

#[test]
fn test_view_rejects_a_foreign_store() -> Result<()> {
    let mut ours = Store::new();
    ours.upsert([1, 2])?;
    let mut theirs = Store::new();
    let changes = theirs.upsert([3])?;

    let mut view = SortedView::unfiltered();
    let err = view.apply(&ours, &changes).unwrap_err();
    assert!(err.is_logic_error());

    view.attach(&ours)?;
    let err = view.apply(&theirs, &changes).unwrap_err();
    assert_eq!(err.module(), "view");
    assert!(err.is_logic_error());
    assert_eq!(view.nvisible(), 2);

    let err = view.handle_at(7).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.is_precondition_violation());
    Ok(())
}
