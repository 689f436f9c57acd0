//! Table facade: bracketed notifications and persistent references.

use viewsync::{
    Result, Table,
    table::{InvalidationPolicy, RecordingObserver, RefState, ViewEvent},
    view::{RefilterKind, SelectableView, SelectionOrder, SortedView, TextFilter},
};

use crate::helpers::*;

type ContactTable = Table<Contact, SortedView<Contact, TextFilter>>;

fn contacts() -> Result<ContactTable> {
    let mut table =
        Table::with_view(SortedView::new(TextFilter::default()).with_sort(by_score()))?;
    table.assign([
        contact(1, "Ada", 30),
        contact(2, "Bob", 10),
        contact(3, "Adele", 20),
    ])?;
    Ok(table)
}

fn row_ids(table: &ContactTable) -> Result<Vec<u32>> {
    Ok(table.rows()?.into_iter().map(|c| c.id).collect())
}

#[test]
fn test_reference_follows_its_record() -> Result<()> {
    let mut table = contacts()?;
    assert_eq!(row_ids(&table)?, vec![2, 3, 1]);
    let ada = table.persistent_ref(2)?;

    table.upsert([contact(4, "Cy", 1), contact(5, "Di", 15)])?;
    assert_eq!(row_ids(&table)?, vec![4, 2, 5, 3, 1]);
    assert_eq!(table.resolve(ada)?, Some(4));

    table.upsert([contact(1, "Ada", 12)])?;
    assert_eq!(table.resolve(ada)?, Some(2));
    assert_eq!(table.row(2)?.name, "Ada");

    table.erase(&4)?;
    assert_eq!(table.resolve(ada)?, Some(1));
    assert_eq!(table.live_refs(), vec![(ada, 1)]);
    assert_eq!(table.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_filtered_out_reference_is_invalidated_or_parked() -> Result<()> {
    let mut table = contacts()?;
    let bob = table.persistent_ref(0)?;
    table.set_invalidation_policy(InvalidationPolicy::ParkPastEnd);
    let adele = table.persistent_ref(1)?;

    assert_eq!(table.filter_by("ad".to_string())?, RefilterKind::Incremental);
    assert_eq!(row_ids(&table)?, vec![3, 1]);
    // The policy in force during the change decides.
    assert_eq!(table.ref_state(bob)?, RefState::Parked(2));
    assert_eq!(table.resolve(adele)?, Some(0));

    table.set_invalidation_policy(InvalidationPolicy::Invalidate);
    table.filter_by("adel".to_string())?;
    assert_eq!(table.ref_state(bob)?, RefState::Parked(1));
    assert_eq!(table.resolve(adele)?, Some(0));

    table.filter_by("ada".to_string())?;
    assert_eq!(table.ref_state(adele)?, RefState::Invalid);
    assert_eq!(table.resolve(adele)?, None);

    // Coming back into view does not revive a reference.
    table.filter_by(String::new())?;
    assert_eq!(table.resolve(adele)?, None);
    assert_eq!(table.ref_state(bob)?, RefState::Parked(3));

    table.release(bob)?;
    let err = table.resolve(bob).unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[test]
fn test_observer_sees_bracketed_rows() -> Result<()> {
    let mut table = contacts()?;
    let recorder = RecordingObserver::new();
    table.subscribe(Box::new(recorder.clone()));

    table.erase(&3)?;
    let events = recorder.take();
    assert_eq!(events.first(), Some(&ViewEvent::Begin));
    assert_eq!(events.last(), Some(&ViewEvent::End));
    assert!(events.contains(&ViewEvent::Removed(1)));

    table.upsert([contact(2, "Bobby", 10)])?;
    assert_eq!(
        recorder.take(),
        vec![
            ViewEvent::Begin,
            ViewEvent::Changed(vec![0..1]),
            ViewEvent::End
        ]
    );

    let err = table.row(9).unwrap_err();
    assert_eq!(err.module(), "table");
    assert!(err.is_not_found());
    Ok(())
}

#[test]
fn test_selection_table_groups_by_key() -> Result<()> {
    let view = SelectableView::unfiltered().with_selection_order(SelectionOrder::SelectedFirst);
    let mut table = Table::with_view(view)?;
    table.assign([1, 2, 3, 4, 5])?;
    table.set_partition_by_selection(true)?;

    table.select(&2)?;
    table.select(&4)?;
    let rows: Vec<i32> = table.rows()?.into_iter().copied().collect();
    assert_eq!(rows, vec![2, 4, 1, 3, 5]);
    assert!(table.is_selected(&4));
    assert_eq!(table.selected_keys().len(), 2);

    let reference = table.persistent_ref(4)?;
    table.toggle(&2)?;
    let rows: Vec<i32> = table.rows()?.into_iter().copied().collect();
    assert_eq!(rows, vec![4, 2, 1, 3, 5]);
    assert_eq!(table.resolve(reference)?, Some(4));
    assert_eq!(table.check_invariants(), Ok(()));
    Ok(())
}

#[test]
fn test_policies_deserialize_from_config_names() -> Result<()> {
    let policy: InvalidationPolicy =
        serde_json::from_str("\"park_past_end\"").expect("policy parses");
    assert_eq!(policy, InvalidationPolicy::ParkPastEnd);
    assert_eq!(
        serde_json::to_string(&InvalidationPolicy::Invalidate).expect("policy serializes"),
        "\"invalidate\""
    );

    let order: SelectionOrder = serde_json::from_str("\"selected_last\"").expect("order parses");
    let view = SelectableView::unfiltered().with_selection_order(order);
    let mut table = Table::with_view(view)?;
    table.set_invalidation_policy(policy);
    table.assign([1, 2, 3])?;
    table.set_partition_by_selection(true)?;
    table.select(&1)?;
    let rows: Vec<i32> = table.rows()?.into_iter().copied().collect();
    assert_eq!(rows, vec![2, 3, 1]);
    Ok(())
}
