// crates/lti-results-service/tests/common/mod.rs
// ============================================================================
// Module: Service Test Fixtures
// Description: Shared gradebook, registry, audit, and metrics capture for tests.
// Purpose: Build a realistic course with owned, foreign, and orphan items.
// ============================================================================

//! ## Overview
//! Fixtures for resource and server tests: one course with items that cover
//! every authorization and ownership branch, plus the tool registry that
//! matches it.

#![allow(dead_code, reason = "Shared helpers are not used by every test binary.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::http::Method;
use lti_results_core::ContextId;
use lti_results_core::CourseRecord;
use lti_results_core::GradeItemRecord;
use lti_results_core::GradeRecord;
use lti_results_core::InMemoryGradebook;
use lti_results_core::InstanceId;
use lti_results_core::ItemId;
use lti_results_core::LineItem;
use lti_results_core::ToolCaller;
use lti_results_core::ToolInstance;
use lti_results_core::ToolProxyId;
use lti_results_core::TypeId;
use lti_results_core::UserId;
use lti_results_service::LtiResultsConfig;
use lti_results_service::RESULT_CONTAINER_MEDIA_TYPE;
use lti_results_service::RegistryToolAuthz;
use lti_results_service::RequestContext;
use lti_results_service::ResultsAuditEvent;
use lti_results_service::ResultsAuditSink;
use lti_results_service::ResultsMetricEvent;
use lti_results_service::ResultsMetrics;
use lti_results_service::ResultsResource;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Public base URL used by every fixture.
pub const BASE_URL: &str = "https://lms.example/lti/services";

/// Secret of tool proxy `p1`, which owns tool type `5`.
pub const PROXY_SECRET: &str = "proxy-secret-one";

/// Secret of tool proxy `p2`, which owns tool type `6`.
pub const OTHER_PROXY_SECRET: &str = "proxy-secret-two";

/// Secret of tool type `5` (grade synchronization enabled).
pub const TYPE_SECRET: &str = "type-secret-five";

/// Secret of tool type `6` (grade synchronization disabled).
pub const NO_SCOPE_TYPE_SECRET: &str = "type-secret-six";

/// Secret of tool type `8` (deployed in course `3` only).
pub const OTHER_COURSE_TYPE_SECRET: &str = "type-secret-eight";

/// Registry and server configuration shared by tests.
pub const CONFIG_TOML: &str = r#"
[server]
bind = "127.0.0.1:0"
path_prefix = "/lti/services"

[server.audit]
enabled = false

[service]
base_url = "https://lms.example/lti/services"

[[tool_proxies]]
id = "p1"
secret = "proxy-secret-one"

[[tool_proxies]]
id = "p2"
secret = "proxy-secret-two"

[[tool_types]]
id = "5"
secret = "type-secret-five"
tool_proxy_id = "p1"
grade_synchronization = 2

[[tool_types]]
id = "6"
secret = "type-secret-six"
tool_proxy_id = "p2"
grade_synchronization = 0

[[tool_types]]
id = "8"
secret = "type-secret-eight"
grade_synchronization = 1
course_ids = ["3"]
"#;

/// Parses the shared configuration.
pub fn config() -> LtiResultsConfig {
    LtiResultsConfig::from_toml_str(CONFIG_TOML).unwrap()
}

// ============================================================================
// SECTION: Gradebook
// ============================================================================

/// Builds a grade record for an item.
pub fn grade(id: u64, item: &str, time_modified: Option<i64>) -> GradeRecord {
    GradeRecord {
        id,
        item_id: ItemId::new(item),
        user_id: UserId::new(format!("{}", 100 + id)),
        value: Some(7.5),
        grade_max: 10.0,
        feedback: None,
        time_modified,
    }
}

/// Adds a course-2 grade item with its line item.
fn with_item(
    gradebook: InMemoryGradebook,
    item: &str,
    instance: Option<&str>,
) -> InMemoryGradebook {
    let instance = instance.map(InstanceId::new);
    gradebook
        .with_grade_item(GradeItemRecord {
            id: ItemId::new(item),
            course_id: ContextId::new("2"),
            item_instance: instance.clone(),
        })
        .with_line_item(LineItem {
            id: ItemId::new(item),
            course_id: ContextId::new("2"),
            item_instance: instance,
            label: format!("Item {item}"),
            grade_max: 10.0,
        })
}

/// Course `2` fixture:
///
/// - item `7`: placed by instance `11` of type `5` (proxy `p1`); seven graded
///   records interleaved with two ungraded ones
/// - item `8`: placed by instance `12` of type `6` (proxy `p2`)
/// - item `9`: grade item without a line item
/// - item `10`: line item pointing at a missing instance
/// - item `20`: no instance, registered to proxy `p1`, no grades
/// - item `21`: registered to proxy `p1` but placed by instance `12`
pub fn gradebook() -> InMemoryGradebook {
    let mut gradebook = InMemoryGradebook::new()
        .with_course(CourseRecord {
            id: ContextId::new("2"),
            name: "Physics".to_string(),
        })
        .with_tool_instance(ToolInstance {
            id: InstanceId::new("11"),
            course_id: ContextId::new("2"),
            type_id: TypeId::new("5"),
            tool_proxy_id: Some(ToolProxyId::new("p1")),
        })
        .with_tool_instance(ToolInstance {
            id: InstanceId::new("12"),
            course_id: ContextId::new("2"),
            type_id: TypeId::new("6"),
            tool_proxy_id: Some(ToolProxyId::new("p2")),
        })
        .with_grade_item(GradeItemRecord {
            id: ItemId::new("9"),
            course_id: ContextId::new("2"),
            item_instance: None,
        });
    gradebook = with_item(gradebook, "7", Some("11"));
    gradebook = with_item(gradebook, "8", Some("12"));
    gradebook = with_item(gradebook, "10", Some("99"));
    gradebook = with_item(gradebook, "20", None)
        .with_line_item_owner(ItemId::new("20"), ToolCaller::ToolProxy(ToolProxyId::new("p1")));
    gradebook = with_item(gradebook, "21", Some("12"))
        .with_line_item_owner(ItemId::new("21"), ToolCaller::ToolProxy(ToolProxyId::new("p1")));
    for id in 0 .. 9 {
        let time_modified = match id {
            2 => None,
            5 => Some(0),
            _ => Some(1_700_000_000 + i64::try_from(id).unwrap()),
        };
        gradebook = gradebook.with_grade(grade(id, "7", time_modified));
    }
    gradebook.with_grade(grade(50, "8", Some(1_700_000_000)))
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct CollectingAuditSink {
    /// Recorded events.
    events: Mutex<Vec<ResultsAuditEvent>>,
}

impl CollectingAuditSink {
    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<ResultsAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ResultsAuditSink for CollectingAuditSink {
    fn record(&self, event: &ResultsAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Metrics sink that keeps every observation in memory.
#[derive(Default)]
pub struct RecordingMetrics {
    /// Recorded request counter events.
    requests: Mutex<Vec<ResultsMetricEvent>>,
    /// Recorded latency observations.
    latencies: Mutex<Vec<(ResultsMetricEvent, Duration)>>,
}

impl RecordingMetrics {
    /// Returns a snapshot of the request counter events.
    pub fn requests(&self) -> Vec<ResultsMetricEvent> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns a snapshot of the latency observations.
    pub fn latencies(&self) -> Vec<(ResultsMetricEvent, Duration)> {
        self.latencies.lock().unwrap().clone()
    }
}

impl ResultsMetrics for RecordingMetrics {
    fn record_request(&self, event: ResultsMetricEvent) {
        self.requests.lock().unwrap().push(event);
    }

    fn record_latency(&self, event: ResultsMetricEvent, latency: Duration) {
        self.latencies.lock().unwrap().push((event, latency));
    }
}

/// Builds a resource over `gradebook` with the fixture registry.
pub fn resource_over(gradebook: InMemoryGradebook) -> ResultsResource {
    ResultsResource::new(
        Arc::new(gradebook),
        Arc::new(RegistryToolAuthz::from_config(&config())),
        BASE_URL,
    )
}

/// Builds the resource over the fixture gradebook.
pub fn resource() -> ResultsResource {
    resource_over(gradebook())
}

/// Builds the resource with an audit capture attached.
pub fn audited_resource() -> (ResultsResource, Arc<CollectingAuditSink>) {
    let sink = Arc::new(CollectingAuditSink::default());
    let resource = resource().with_audit_sink(sink.clone());
    (resource, sink)
}

/// Builds the resource with a metrics recorder attached.
pub fn metered_resource() -> (ResultsResource, Arc<RecordingMetrics>) {
    let metrics = Arc::new(RecordingMetrics::default());
    let resource = resource().with_metrics(metrics.clone());
    (resource, metrics)
}

/// GET request for a course and item, authenticated as proxy `p1`.
pub fn get(context: &str, item: &str) -> RequestContext {
    RequestContext::new(Method::GET, format!("/{context}/lineitems/{item}/results"))
        .with_accept(RESULT_CONTAINER_MEDIA_TYPE)
        .with_bearer(PROXY_SECRET)
}
