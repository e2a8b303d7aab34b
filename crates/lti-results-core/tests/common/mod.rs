// crates/lti-results-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Fixtures
// Description: Shared grade record and gradebook builders.
// Purpose: Keep integration tests focused on behavior rather than setup.
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are not used by every test binary.")]

use lti_results_core::ContextId;
use lti_results_core::CourseRecord;
use lti_results_core::GradeItemRecord;
use lti_results_core::GradeRecord;
use lti_results_core::InMemoryGradebook;
use lti_results_core::InstanceId;
use lti_results_core::ItemId;
use lti_results_core::LineItem;
use lti_results_core::ToolInstance;
use lti_results_core::ToolProxyId;
use lti_results_core::TypeId;
use lti_results_core::UserId;

/// Builds a graded record for item `7`.
pub fn graded(id: u64) -> GradeRecord {
    GradeRecord {
        id,
        item_id: ItemId::new("7"),
        user_id: UserId::new(format!("user-{id}")),
        value: Some(80.0),
        grade_max: 100.0,
        feedback: None,
        time_modified: Some(1_700_000_000 + i64::try_from(id).unwrap_or_default()),
    }
}

/// Builds a never-modified record for item `7`.
pub fn ungraded(id: u64) -> GradeRecord {
    GradeRecord {
        value: None,
        time_modified: None,
        ..graded(id)
    }
}

/// Returns `count` graded records with ids `0..count`.
pub fn graded_records(count: u64) -> Vec<GradeRecord> {
    (0 .. count).map(graded).collect()
}

/// Course `2` with line item `7` placed by instance `11` of tool type `5`
/// (owned by tool proxy `p1`).
pub fn sample_gradebook() -> InMemoryGradebook {
    InMemoryGradebook::new()
        .with_course(CourseRecord {
            id: ContextId::new("2"),
            name: "Physics".to_string(),
        })
        .with_grade_item(GradeItemRecord {
            id: ItemId::new("7"),
            course_id: ContextId::new("2"),
            item_instance: Some(InstanceId::new("11")),
        })
        .with_line_item(LineItem {
            id: ItemId::new("7"),
            course_id: ContextId::new("2"),
            item_instance: Some(InstanceId::new("11")),
            label: "Lab 1".to_string(),
            grade_max: 100.0,
        })
        .with_tool_instance(ToolInstance {
            id: InstanceId::new("11"),
            course_id: ContextId::new("2"),
            type_id: TypeId::new("5"),
            tool_proxy_id: Some(ToolProxyId::new("p1")),
        })
}
