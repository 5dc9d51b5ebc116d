//! Integration tests for builder store invariants across longer edit
//! sessions: dense ordering, global key uniqueness, the one-section floor,
//! and save/load stability.

use formboard_engine::builder::{BuilderStore, Selected};
use formboard_engine::FormLayout;
use formboard_fields::FieldKind;

#[test]
fn test_long_edit_session_keeps_dense_order() {
    let mut store = BuilderStore::new();
    let s1 = store.section_ids()[0].clone();
    let s2 = store.add_section("Second");

    let fields: Vec<_> = (0..5)
        .map(|_| store.add_field(&s1, FieldKind::Text).unwrap())
        .collect();

    // Shuffle: move tail to front, drop the middle, drag one across.
    store.move_field_within(&s1, &fields[4], 0).unwrap();
    store.remove_node(&fields[2]).unwrap();
    store.move_field_across(&s1, &s2, &fields[0], 0).unwrap();

    for section in [&s1, &s2] {
        let children = store.child_ids(section);
        for (i, id) in children.iter().enumerate() {
            assert_eq!(store.order_of(id), Some(i), "dense order in {section}");
        }
    }
    assert_eq!(store.child_ids(&s1).len(), 3);
    assert_eq!(store.child_ids(&s2).len(), 1);
}

#[test]
fn test_keys_stay_unique_through_duplication() {
    let mut store = BuilderStore::new();
    let section = store.section_ids()[0].clone();
    store.add_field(&section, FieldKind::Text).unwrap();
    store.add_field(&section, FieldKind::Text).unwrap();

    let copy = store.duplicate_section(&section).unwrap();
    store.duplicate_section(&copy).unwrap();

    let mut keys: Vec<_> = store.collect_keys().into_iter().collect();
    keys.sort();
    assert_eq!(keys.len(), 6, "every field keeps a distinct key: {keys:?}");
}

#[test]
fn test_section_floor_survives_aggressive_deletion() {
    let mut store = BuilderStore::new();
    let s1 = store.section_ids()[0].clone();
    let s2 = store.add_section("Second");
    store.add_field(&s1, FieldKind::Text).unwrap();

    store.remove_section(&s1).unwrap();
    store.remove_section(&s2).unwrap();
    // Deleting everything still leaves an empty default section.
    let remaining = store.section_ids();
    assert_eq!(remaining.len(), 1);
    store.remove_section(&remaining[0].clone()).unwrap();
    assert_eq!(store.section_ids().len(), 1);
}

#[test]
fn test_selection_survives_unrelated_edits() {
    let mut store = BuilderStore::new();
    let s1 = store.section_ids()[0].clone();
    let f1 = store.add_field(&s1, FieldKind::Text).unwrap();
    let f2 = store.add_field(&s1, FieldKind::Number).unwrap();

    store.select_field(&f1).unwrap();
    store.remove_node(&f2).unwrap();
    assert_eq!(store.selected(), &Selected::Field(f1.clone()));

    store.remove_node(&f1).unwrap();
    assert_eq!(store.selected(), &Selected::None);
}

#[test]
fn test_save_load_cycle_is_stable_under_edits() {
    let mut store = BuilderStore::new();
    let s1 = store.section_ids()[0].clone();
    let rep = store.add_repeater(&s1, "Items").unwrap();
    store.add_field(&rep, FieldKind::Number).unwrap();
    store.add_field(&s1, FieldKind::Text).unwrap();

    // Two full persistence cycles must not reshuffle anything.
    let first = store.to_form_layout();
    let json = first.to_json_pretty().unwrap();
    let mut reloaded = BuilderStore::from_form_layout(&FormLayout::from_json(&json).unwrap()).unwrap();
    assert_eq!(reloaded.to_form_layout(), first);

    // Edits on the reloaded store behave like edits on the original.
    let section = reloaded.section_ids()[0].clone();
    let added = reloaded.add_field(&section, FieldKind::Number).unwrap();
    assert_eq!(reloaded.field_key(&added), Some("number_2"));

    let second = reloaded.to_form_layout();
    let reloaded_again = BuilderStore::from_form_layout(&second).unwrap();
    assert_eq!(reloaded_again.to_form_layout(), second);
}
