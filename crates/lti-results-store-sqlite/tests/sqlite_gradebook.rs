// crates/lti-results-store-sqlite/tests/sqlite_gradebook.rs
// ============================================================================
// Module: SQLite Gradebook Tests
// Description: Lookups, ordering, visibility, and schema guards.
// Purpose: Validate the SQLite gradebook against the in-memory reference.
// ============================================================================

//! ## Overview
//! Seeds a database from a snapshot and checks every lookup the Results
//! resource performs, plus path and schema-version rejection.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use lti_results_core::ContextId;
use lti_results_core::CourseLookup;
use lti_results_core::CourseRecord;
use lti_results_core::GradeFetch;
use lti_results_core::GradeItemLookup;
use lti_results_core::GradeItemRecord;
use lti_results_core::GradeRecord;
use lti_results_core::GradebookSnapshot;
use lti_results_core::InstanceId;
use lti_results_core::ItemId;
use lti_results_core::LineItem;
use lti_results_core::LineItemOwner;
use lti_results_core::LineItemResolver;
use lti_results_core::ToolCaller;
use lti_results_core::ToolInstance;
use lti_results_core::ToolInstanceLookup;
use lti_results_core::ToolProxyId;
use lti_results_core::TypeId;
use lti_results_core::UserId;
use lti_results_store_sqlite::SqliteGradebook;
use lti_results_store_sqlite::SqliteGradebookConfig;
use lti_results_store_sqlite::SqliteGradebookError;
use rusqlite::Connection;
use rusqlite::params;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn grade(id: u64, item: &str, time_modified: Option<i64>) -> GradeRecord {
    GradeRecord {
        id,
        item_id: ItemId::new(item),
        user_id: UserId::new(format!("u{id}")),
        value: time_modified.map(|_| 7.5),
        grade_max: 10.0,
        feedback: Some("ok".to_string()),
        time_modified,
    }
}

fn snapshot() -> GradebookSnapshot {
    GradebookSnapshot {
        courses: vec![CourseRecord {
            id: ContextId::new("2"),
            name: "Physics".to_string(),
        }],
        grade_items: vec![
            GradeItemRecord {
                id: ItemId::new("7"),
                course_id: ContextId::new("2"),
                item_instance: Some(InstanceId::new("11")),
            },
            GradeItemRecord {
                id: ItemId::new("8"),
                course_id: ContextId::new("2"),
                item_instance: None,
            },
        ],
        line_items: vec![
            LineItem {
                id: ItemId::new("7"),
                course_id: ContextId::new("2"),
                item_instance: Some(InstanceId::new("11")),
                label: "Lab 1".to_string(),
                grade_max: 10.0,
            },
            LineItem {
                id: ItemId::new("9"),
                course_id: ContextId::new("2"),
                item_instance: None,
                label: "Service column".to_string(),
                grade_max: 5.0,
            },
        ],
        line_item_owners: vec![LineItemOwner {
            item_id: ItemId::new("9"),
            owner: ToolCaller::ToolProxy(ToolProxyId::new("p1")),
        }],
        tool_instances: vec![ToolInstance {
            id: InstanceId::new("11"),
            course_id: ContextId::new("2"),
            type_id: TypeId::new("5"),
            tool_proxy_id: Some(ToolProxyId::new("p1")),
        }],
        grades: vec![
            grade(30, "7", Some(1_700_000_300)),
            grade(10, "7", Some(1_700_000_100)),
            grade(20, "7", None),
            grade(40, "8", Some(1_700_000_400)),
        ],
    }
}

fn seeded() -> (TempDir, SqliteGradebook) {
    let dir = TempDir::new().unwrap();
    let config = SqliteGradebookConfig::new(dir.path().join("gradebook.sqlite"));
    let gradebook = SqliteGradebook::open(&config).unwrap();
    gradebook.import_snapshot(&snapshot()).unwrap();
    (dir, gradebook)
}

// ============================================================================
// SECTION: Lookups
// ============================================================================

#[test]
fn course_lookup_reads_rows() {
    let (_dir, gradebook) = seeded();
    let course = gradebook.course(&ContextId::new("2")).unwrap().unwrap();
    assert_eq!(course.name, "Physics");
    assert!(gradebook.course(&ContextId::new("3")).unwrap().is_none());
}

#[test]
fn grade_items_and_line_items_are_separate_rows() {
    let (_dir, gradebook) = seeded();
    assert!(gradebook.grade_item(&ItemId::new("7")).unwrap().is_some());
    assert!(gradebook.grade_item(&ItemId::new("8")).unwrap().is_some());
    assert!(gradebook.grade_item(&ItemId::new("9")).unwrap().is_none());
    assert!(gradebook.grade_item(&ItemId::new("99")).unwrap().is_none());
    let line_item = gradebook
        .resolve_line_item(
            &ContextId::new("2"),
            &ItemId::new("7"),
            &ToolCaller::ToolProxy(ToolProxyId::new("p1")),
        )
        .unwrap()
        .unwrap();
    assert_eq!(line_item.label, "Lab 1");
    let by_instance = gradebook
        .grade_item_for_instance(&ContextId::new("2"), &InstanceId::new("11"))
        .unwrap()
        .unwrap();
    assert_eq!(by_instance.id, ItemId::new("7"));
}

#[test]
fn grades_are_ordered_by_id() {
    let (_dir, gradebook) = seeded();
    let ids: Vec<u64> =
        gradebook.grades(&ItemId::new("7")).unwrap().iter().map(|grade| grade.id).collect();
    assert_eq!(ids, vec![10, 20, 30]);
    let ungraded = gradebook.grades(&ItemId::new("7")).unwrap();
    assert!(ungraded.iter().any(|grade| grade.time_modified.is_none()));
}

#[test]
fn tool_instance_joins_type_proxy() {
    let (_dir, gradebook) = seeded();
    let instance =
        gradebook.tool_instance(&InstanceId::new("11"), &ContextId::new("2")).unwrap().unwrap();
    assert_eq!(instance.tool_proxy_id, Some(ToolProxyId::new("p1")));
    assert!(
        gradebook.tool_instance(&InstanceId::new("11"), &ContextId::new("3")).unwrap().is_none()
    );
}

#[test]
fn line_item_visibility_matches_owner_rules() {
    let (_dir, gradebook) = seeded();
    let context = ContextId::new("2");
    let proxy = ToolCaller::ToolProxy(ToolProxyId::new("p1"));
    let tool_type = ToolCaller::ToolType(TypeId::new("5"));
    let stranger = ToolCaller::ToolType(TypeId::new("6"));

    assert!(gradebook.resolve_line_item(&context, &ItemId::new("7"), &proxy).unwrap().is_some());
    assert!(
        gradebook.resolve_line_item(&context, &ItemId::new("7"), &tool_type).unwrap().is_some()
    );
    assert!(
        gradebook.resolve_line_item(&context, &ItemId::new("7"), &stranger).unwrap().is_none()
    );
    assert!(gradebook.resolve_line_item(&context, &ItemId::new("9"), &proxy).unwrap().is_some());
    assert!(
        gradebook.resolve_line_item(&context, &ItemId::new("9"), &tool_type).unwrap().is_none()
    );
    assert!(gradebook.resolve_line_item(&context, &ItemId::new("8"), &proxy).unwrap().is_none());
    assert!(
        gradebook
            .resolve_line_item(&ContextId::new("3"), &ItemId::new("7"), &proxy)
            .unwrap()
            .is_none()
    );
}

#[test]
fn reopen_keeps_data() {
    let dir = TempDir::new().unwrap();
    let config = SqliteGradebookConfig::new(dir.path().join("nested").join("gradebook.sqlite"));
    SqliteGradebook::open(&config).unwrap().import_snapshot(&snapshot()).unwrap();
    let reopened = SqliteGradebook::open(&config).unwrap();
    assert_eq!(reopened.grades(&ItemId::new("7")).unwrap().len(), 3);
}

// ============================================================================
// SECTION: Guards
// ============================================================================

#[test]
fn open_rejects_directory_path() {
    let dir = TempDir::new().unwrap();
    let config = SqliteGradebookConfig::new(dir.path());
    assert!(matches!(SqliteGradebook::open(&config), Err(SqliteGradebookError::Invalid(_))));
}

#[test]
fn open_rejects_overlong_component() {
    let dir = TempDir::new().unwrap();
    let config = SqliteGradebookConfig::new(dir.path().join("a".repeat(300)));
    assert!(matches!(SqliteGradebook::open(&config), Err(SqliteGradebookError::Invalid(_))));
}

#[test]
fn open_rejects_unknown_schema_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gradebook.sqlite");
    {
        let connection = Connection::open(&path).unwrap();
        connection.execute_batch("CREATE TABLE store_meta (version INTEGER NOT NULL);").unwrap();
        connection.execute("INSERT INTO store_meta (version) VALUES (?1)", params![99]).unwrap();
    }
    let result = SqliteGradebook::open(&SqliteGradebookConfig::new(&path));
    assert!(matches!(
        result,
        Err(SqliteGradebookError::Invalid(message)) if message.contains("99")
    ));
}

#[test]
fn import_rejects_non_finite_grades() {
    let dir = TempDir::new().unwrap();
    let gradebook =
        SqliteGradebook::open(&SqliteGradebookConfig::new(dir.path().join("g.sqlite"))).unwrap();
    let mut nan_value = snapshot();
    nan_value.grades.push(GradeRecord {
        value: Some(f64::NAN),
        ..grade(60, "7", Some(1_700_000_600))
    });
    assert!(matches!(
        gradebook.import_snapshot(&nan_value),
        Err(SqliteGradebookError::Invalid(message)) if message.contains("finite")
    ));
    let mut infinite_max = snapshot();
    infinite_max.line_items[0].grade_max = f64::INFINITY;
    assert!(gradebook.import_snapshot(&infinite_max).is_err());
    assert!(gradebook.course(&ContextId::new("2")).unwrap().is_none());
}

#[test]
fn negative_grade_id_is_reported_as_corruption() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gradebook.sqlite");
    let gradebook = SqliteGradebook::open(&SqliteGradebookConfig::new(&path)).unwrap();
    {
        let connection = Connection::open(&path).unwrap();
        connection
            .execute(
                "INSERT INTO grade_grades (id, item_id, user_id, grade_max) VALUES (-1, '7', 'u', 1)",
                params![],
            )
            .unwrap();
    }
    let result = gradebook.grades(&ItemId::new("7"));
    assert!(matches!(result, Err(lti_results_core::StoreError::Corrupt(_))));
}
