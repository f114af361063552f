// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use scp_core::{Id, Kind};

#[test]
fn module_id_round_trips_through_packed_form() {
    let id = Id::build_module(7).unwrap();
    assert_eq!(Id::from_packed(id.to_packed()), Some(id));
    assert_eq!(id.kind(), Kind::Module);
}

#[test]
fn element_id_round_trips_through_packed_form() {
    let id = Id::build_element(3, 200).unwrap();
    assert_eq!(Id::from_packed(id.to_packed()), Some(id));
    assert_eq!(id.module_index(), Some(3));
    assert_eq!(id.element_index(), Some(200));
}

#[test]
fn api_event_notification_ids_round_trip() {
    for id in [
        Id::build_api(1, 2).unwrap(),
        Id::build_event(1, 2).unwrap(),
        Id::build_notification(1, 2).unwrap(),
    ] {
        assert_eq!(Id::from_packed(id.to_packed()), Some(id));
    }
}

#[test]
fn only_module_and_element_ids_are_bindable_targets() {
    assert!(Id::build_module(0).unwrap().is_bindable_target());
    assert!(Id::build_element(0, 0).unwrap().is_bindable_target());
    assert!(!Id::build_api(0, 0).unwrap().is_bindable_target());
    assert!(!Id::build_event(0, 0).unwrap().is_bindable_target());
}

#[test]
fn element_index_above_max_is_rejected() {
    assert!(Id::build_element(0, scp_core::id::ELEMENT_INDEX_MAX + 1).is_none());
}

#[test]
fn none_id_has_no_module_index() {
    assert_eq!(Id::None.module_index(), None);
    assert_eq!(Id::None.kind(), Kind::None);
}
