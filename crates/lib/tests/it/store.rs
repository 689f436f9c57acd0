//! Store behavior as seen by observers.

use std::{cell::RefCell, rc::Rc};

use viewsync::{ChangeSet, Result, Store, store::StoreError};

use crate::helpers::*;

#[test]
fn test_observers_see_every_change_set_in_order() -> Result<()> {
    let mut store = Store::new();
    let seen: Rc<RefCell<Vec<(usize, usize, usize, usize)>>> = Rc::default();
    let log = Rc::clone(&seen);
    store.subscribe(Box::new(
        move |store: &Store<Contact>, changes: &ChangeSet| -> Result<()> {
            log.borrow_mut().push((
                changes.erased().len(),
                changes.updated().len(),
                changes.inserted().len(),
                store.len(),
            ));
            Ok(())
        },
    ));

    store.upsert([contact(1, "ada", 3), contact(2, "bob", 1)])?;
    store.upsert([contact(2, "bob", 5), contact(3, "cy", 2)])?;
    store.erase(&1)?;
    store.assign([contact(3, "cy", 9), contact(4, "di", 0)])?;

    assert_eq!(
        *seen.borrow(),
        vec![(0, 0, 2, 2), (0, 1, 1, 3), (1, 0, 0, 2), (1, 1, 1, 2)]
    );
    Ok(())
}

#[test]
fn test_handles_survive_updates_but_not_erasure() -> Result<()> {
    let mut store = Store::new();
    store.upsert([contact(1, "ada", 3)])?;
    let handle = store.find(&1).unwrap();

    store.upsert([contact(1, "ada lovelace", 4)])?;
    assert_eq!(store.find(&1), Some(handle));
    assert_eq!(store.get(handle)?.name, "ada lovelace");

    store.erase(&1)?;
    let err = store.get(handle).unwrap_err();
    assert_eq!(err.module(), "store");
    assert!(err.is_logic_error());

    store.upsert([contact(1, "ada", 3)])?;
    let reborn = store.find(&1).unwrap();
    assert_ne!(reborn, handle);
    assert!(!store.contains(handle));
    Ok(())
}

#[test]
fn test_modify_reports_one_change_set() -> Result<()> {
    let mut store = Store::new();
    store.upsert([contact(1, "ada", 3), contact(2, "bob", 1), contact(3, "cy", 2)])?;
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    store.subscribe(Box::new(
        move |_: &Store<Contact>, _: &ChangeSet| -> Result<()> {
            *counter.borrow_mut() += 1;
            Ok(())
        },
    ));

    let changes = store.modify([&1, &3], [contact(3, "cy", 7), contact(5, "ed", 4)])?;
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(changes.erased().len(), 2);
    assert_eq!(changes.inserted().len(), 2);
    assert!(changes.updated().is_empty());
    let names: Vec<&str> = store.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["bob", "cy", "ed"]);
    Ok(())
}

#[test]
fn test_failing_observer_does_not_roll_back() -> Result<()> {
    let mut store = Store::new();
    store.upsert([1, 2, 3])?;
    store.subscribe(Box::new(
        |store: &Store<i32>, _: &ChangeSet| -> Result<()> {
            Err(StoreError::PositionOutOfBounds {
                position: store.len(),
                len: store.len(),
            }
            .into())
        },
    ));

    let err = store.upsert([4]).unwrap_err();
    assert!(err.is_precondition_violation());
    let applied = err.applied_changes().expect("change set travels with the error");
    assert_eq!(applied.inserted(), &[store.find(&4).expect("4 was inserted")]);
    assert_eq!(store.len(), 4);
    assert!(store.contains_key(&4));
    Ok(())
}

#[test]
fn test_unsubscribed_observer_is_not_called() -> Result<()> {
    let mut store = Store::new();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let id = store.subscribe(Box::new(
        move |_: &Store<i32>, _: &ChangeSet| -> Result<()> {
            *counter.borrow_mut() += 1;
            Ok(())
        },
    ));

    store.upsert([1])?;
    store.unsubscribe(id)?;
    store.upsert([2])?;
    assert_eq!(*calls.borrow(), 1);

    let err = store.unsubscribe(id).err().unwrap();
    assert!(err.is_logic_error());
    Ok(())
}
