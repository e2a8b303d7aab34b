// crates/lti-results-core/tests/memory_gradebook.rs
// ============================================================================
// Module: In-Memory Gradebook Tests
// Description: Lookups, line item visibility, and snapshot loading.
// Purpose: Validate the reference grade store used by service tests.
// Dependencies: lti-results-core
// ============================================================================
//! ## Overview
//! Ensures lookups fail closed on missing or foreign records and that grade
//! records come back in id order.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use lti_results_core::ContextId;
use lti_results_core::CourseLookup;
use lti_results_core::GradeFetch;
use lti_results_core::GradeItemLookup;
use lti_results_core::GradebookSnapshot;
use lti_results_core::InMemoryGradebook;
use lti_results_core::InstanceId;
use lti_results_core::ItemId;
use lti_results_core::LineItem;
use lti_results_core::LineItemResolver;
use lti_results_core::ToolCaller;
use lti_results_core::ToolInstanceLookup;
use lti_results_core::ToolProxyId;
use lti_results_core::TypeId;
use lti_results_core::line_item_visible_to;

use crate::common::graded;
use crate::common::sample_gradebook;
use crate::common::ungraded;

#[test]
fn course_and_grade_item_lookups() {
    let gradebook = sample_gradebook();
    assert!(gradebook.course(&ContextId::new("2")).unwrap().is_some());
    assert!(gradebook.course(&ContextId::new("3")).unwrap().is_none());
    assert!(gradebook.grade_item(&ItemId::new("7")).unwrap().is_some());
    assert!(gradebook.grade_item(&ItemId::new("8")).unwrap().is_none());
    let by_instance = gradebook
        .grade_item_for_instance(&ContextId::new("2"), &InstanceId::new("11"))
        .unwrap()
        .expect("grade item for instance");
    assert_eq!(by_instance.id, ItemId::new("7"));
}

#[test]
fn line_item_resolves_for_owning_proxy_and_type() {
    let gradebook = sample_gradebook();
    let context = ContextId::new("2");
    let item = ItemId::new("7");
    let proxy = ToolCaller::ToolProxy(ToolProxyId::new("p1"));
    let tool_type = ToolCaller::ToolType(TypeId::new("5"));
    assert!(gradebook.resolve_line_item(&context, &item, &proxy).unwrap().is_some());
    assert!(gradebook.resolve_line_item(&context, &item, &tool_type).unwrap().is_some());
}

#[test]
fn line_item_hidden_from_other_tools_and_courses() {
    let gradebook = sample_gradebook();
    let item = ItemId::new("7");
    let other = ToolCaller::ToolType(TypeId::new("6"));
    let proxy = ToolCaller::ToolProxy(ToolProxyId::new("p1"));
    assert!(gradebook.resolve_line_item(&ContextId::new("2"), &item, &other).unwrap().is_none());
    assert!(gradebook.resolve_line_item(&ContextId::new("9"), &item, &proxy).unwrap().is_none());
}

#[test]
fn registered_owner_overrides_instance_ownership() {
    let gradebook = sample_gradebook()
        .with_line_item_owner(ItemId::new("7"), ToolCaller::ToolType(TypeId::new("6")));
    let context = ContextId::new("2");
    let item = ItemId::new("7");
    let registered = ToolCaller::ToolType(TypeId::new("6"));
    let placed = ToolCaller::ToolType(TypeId::new("5"));
    assert!(gradebook.resolve_line_item(&context, &item, &registered).unwrap().is_some());
    assert!(gradebook.resolve_line_item(&context, &item, &placed).unwrap().is_none());
}

#[test]
fn line_item_without_owner_or_instance_is_not_visible() {
    let caller = ToolCaller::ToolProxy(ToolProxyId::new("p1"));
    assert!(!line_item_visible_to(None, None, &caller));

    let gradebook = InMemoryGradebook::new().with_line_item(LineItem {
        id: ItemId::new("1"),
        course_id: ContextId::new("2"),
        item_instance: None,
        label: String::new(),
        grade_max: 10.0,
    });
    let resolved = gradebook.resolve_line_item(&ContextId::new("2"), &ItemId::new("1"), &caller);
    assert!(resolved.unwrap().is_none());
}

#[test]
fn tool_instance_lookup_is_scoped_to_course() {
    let gradebook = sample_gradebook();
    let instance = InstanceId::new("11");
    assert!(gradebook.tool_instance(&instance, &ContextId::new("2")).unwrap().is_some());
    assert!(gradebook.tool_instance(&instance, &ContextId::new("3")).unwrap().is_none());
}

#[test]
fn grades_are_ordered_by_id() {
    let gradebook =
        sample_gradebook().with_grade(graded(5)).with_grade(ungraded(2)).with_grade(graded(1));
    let ids: Vec<u64> =
        gradebook.grades(&ItemId::new("7")).unwrap().iter().map(|grade| grade.id).collect();
    assert_eq!(ids, vec![1, 2, 5]);
    assert!(gradebook.grades(&ItemId::new("8")).unwrap().is_empty());
}

#[test]
fn grade_with_existing_id_replaces_earlier_record() {
    let gradebook = sample_gradebook().with_grade(graded(3)).with_grade(ungraded(3));
    let grades = gradebook.grades(&ItemId::new("7")).unwrap();
    assert_eq!(grades.len(), 1);
    assert!(!grades[0].is_graded());
}

#[test]
fn line_item_alone_is_not_a_grade_item() {
    let gradebook = sample_gradebook().with_line_item(LineItem {
        id: ItemId::new("12"),
        course_id: ContextId::new("2"),
        item_instance: Some(InstanceId::new("11")),
        label: "Orphan".to_string(),
        grade_max: 10.0,
    });
    assert!(gradebook.grade_item(&ItemId::new("12")).unwrap().is_none());
}

#[test]
fn snapshot_round_trips_into_gradebook() {
    let json = br#"{
        "courses": [{"id": "2", "name": "Physics"}],
        "grade_items": [{"id": "7", "course_id": "2", "item_instance": "11"}],
        "line_items": [{"id": "7", "course_id": "2", "item_instance": "11", "label": "Lab", "grade_max": 10.0}],
        "line_item_owners": [{"item_id": "7", "owner": {"kind": "tool_type", "id": "5"}}],
        "tool_instances": [{"id": "11", "course_id": "2", "type_id": "5"}],
        "grades": [{"id": 1, "item_id": "7", "user_id": "u1", "value": 8.0, "grade_max": 10.0, "time_modified": 1700000000}]
    }"#;
    let snapshot = GradebookSnapshot::from_json_slice(json).unwrap();
    let gradebook = InMemoryGradebook::from_snapshot(snapshot);
    let caller = ToolCaller::ToolType(TypeId::new("5"));
    assert!(
        gradebook
            .resolve_line_item(&ContextId::new("2"), &ItemId::new("7"), &caller)
            .unwrap()
            .is_some()
    );
    assert_eq!(gradebook.grades(&ItemId::new("7")).unwrap().len(), 1);
}

#[test]
fn snapshot_rejects_malformed_json() {
    assert!(GradebookSnapshot::from_json_slice(b"{\"courses\": 3}").is_err());
}
