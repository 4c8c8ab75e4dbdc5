use std::sync::Arc;

use ideograbber_core::contract::{Destination, InMemoryContent, MockDestination};
use ideograbber_core::selection::SelectionTarget;
use ideograbber_core::{Item, Location, SelectionError, SelectionModel, MAX_SELECTION};

fn item(id: u64) -> Item {
    Item::emoji(
        id,
        format!("emoji{id}"),
        false,
        Location::MessageBody,
        Arc::new(InMemoryContent(Vec::new())),
    )
}

fn destination(id: u64) -> Arc<dyn Destination> {
    let mut dest = MockDestination::new();
    dest.expect_id().return_const(id);
    dest.expect_name().return_const(format!("guild {id}"));
    Arc::new(dest)
}

fn model(items: u64, destinations: u64) -> SelectionModel {
    SelectionModel::new(
        (1..=items).map(item).collect(),
        (1..=destinations).map(|id| destination(1000 + id)).collect(),
    )
}

fn item_ids(model: &SelectionModel) -> Vec<u64> {
    model.commit().items.iter().map(Item::id).collect()
}

#[test]
fn test_commit_preserves_selection_order() {
    let mut model = model(5, 3);
    model.set_selected_items(&[3, 1, 5]).unwrap();
    model.set_selected_destinations(&[1003, 1001]).unwrap();

    let selection = model.commit();
    assert_eq!(
        selection.items.iter().map(Item::id).collect::<Vec<_>>(),
        vec![3, 1, 5]
    );
    assert_eq!(
        selection
            .destinations
            .iter()
            .map(|d| d.id())
            .collect::<Vec<_>>(),
        vec![1003, 1001]
    );
}

#[test]
fn test_commit_does_not_clear_state() {
    let mut model = model(2, 1);
    model.set_selected_items(&[2]).unwrap();
    model.set_selected_destinations(&[1001]).unwrap();

    let first = model.commit();
    let second = model.commit();
    assert_eq!(first.items.len(), 1);
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.destinations.len(), 1);
}

#[test]
fn test_new_selection_replaces_old_one() {
    let mut model = model(3, 1);
    model.set_selected_items(&[1, 2]).unwrap();
    model.set_selected_items(&[3]).unwrap();
    assert_eq!(item_ids(&model), vec![3]);
}

#[test]
fn test_repeated_ids_collapse() {
    let mut model = model(3, 1);
    model.set_selected_items(&[2, 2, 1, 2]).unwrap();
    assert_eq!(item_ids(&model), vec![2, 1]);
}

#[test]
fn test_more_than_cap_is_rejected_and_previous_selection_kept() {
    let mut model = model(30, 30);
    model.set_selected_items(&[1]).unwrap();

    let too_many: Vec<u64> = (1..=MAX_SELECTION as u64 + 1).collect();
    let err = model.set_selected_items(&too_many).unwrap_err();
    assert_eq!(
        err,
        SelectionError::TooMany {
            target: SelectionTarget::Items,
            requested: 26,
            max: 25,
        }
    );
    assert_eq!(item_ids(&model), vec![1]);

    let destinations: Vec<u64> = (1001..=1026).collect();
    assert!(model.set_selected_destinations(&destinations).is_err());

    let exactly_cap: Vec<u64> = (1..=MAX_SELECTION as u64).collect();
    model.set_selected_items(&exactly_cap).unwrap();
    assert_eq!(model.commit().items.len(), MAX_SELECTION);
}

#[test]
#[should_panic(expected = "not in the catalog")]
fn test_unknown_item_id_is_a_precondition_violation() {
    let mut model = model(2, 1);
    assert!(!model.has_item(99));
    let _ = model.set_selected_items(&[1, 99]);
}

#[test]
fn test_catalog_keeps_first_of_duplicate_ids() {
    let reaction = Item::emoji(
        1,
        "blob",
        false,
        Location::Reaction,
        Arc::new(InMemoryContent(Vec::new())),
    );
    let model = SelectionModel::new(
        vec![item(1), reaction, item(2)],
        vec![destination(7), destination(7)],
    );
    assert_eq!(model.items().len(), 2);
    assert_eq!(model.items()[0].location(), Location::MessageBody);
    assert_eq!(model.destinations().len(), 1);
    assert!(model.has_destination(7));
}

#[test]
fn test_select_all_respects_cap() {
    let mut small = model(3, 2);
    small.select_all().unwrap();
    let selection = small.commit();
    assert_eq!(selection.items.len(), 3);
    assert_eq!(selection.destinations.len(), 2);

    let mut large = model(26, 1);
    assert!(large.select_all().is_err());
}
