// crates/lti-results-core/src/core/gradebook.rs
// ============================================================================
// Module: Gradebook Records
// Description: Courses, grade items, line items, tool instances, and grades.
// Purpose: Read-only views of grade store records consumed by the resource.
// Dependencies: serde, crate::core::{access, identifiers}
// ============================================================================

//! ## Overview
//! These records mirror what the grade store returns. The resource never
//! mutates them. The only behavioral rule carried here is visibility: a
//! [`GradeRecord`] takes part in the Results collection only once it has been
//! modified.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::access::ToolCaller;
use crate::core::identifiers::ContextId;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::ItemId;
use crate::core::identifiers::ToolProxyId;
use crate::core::identifiers::TypeId;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Course and Grade Item
// ============================================================================

/// Course record used for existence checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course identifier.
    pub id: ContextId,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Grade item record used for existence checks and launch substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeItemRecord {
    /// Grade item identifier.
    pub id: ItemId,
    /// Course that owns the item.
    pub course_id: ContextId,
    /// Tool instance the item was created for, when any.
    #[serde(default)]
    pub item_instance: Option<InstanceId>,
}

// ============================================================================
// SECTION: Line Item
// ============================================================================

/// Gradebook column exposed to tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Grade item identifier.
    pub id: ItemId,
    /// Course (context) that owns the column.
    pub course_id: ContextId,
    /// Owning tool instance, when the column belongs to a tool placement.
    #[serde(default)]
    pub item_instance: Option<InstanceId>,
    /// Column label.
    #[serde(default)]
    pub label: String,
    /// Maximum achievable grade.
    #[serde(default)]
    pub grade_max: f64,
}

// ============================================================================
// SECTION: Tool Instance
// ============================================================================

/// Tool placement inside a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInstance {
    /// Instance identifier.
    pub id: InstanceId,
    /// Course hosting the placement.
    pub course_id: ContextId,
    /// Tool type the placement launches.
    pub type_id: TypeId,
    /// Tool proxy owning the tool type (LTI 2 registrations only).
    #[serde(default)]
    pub tool_proxy_id: Option<ToolProxyId>,
}

impl ToolInstance {
    /// Returns true when the placement belongs to the given caller.
    ///
    /// Tool proxies own placements through their tool type; tool types own
    /// placements that launch them directly.
    #[must_use]
    pub fn is_owned_by(&self, caller: &ToolCaller) -> bool {
        match caller {
            ToolCaller::ToolProxy(proxy) => self.tool_proxy_id.as_ref() == Some(proxy),
            ToolCaller::ToolType(type_id) => &self.type_id == type_id,
        }
    }
}

// ============================================================================
// SECTION: Grade Record
// ============================================================================

/// One learner's grade for a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    /// Grade record identifier.
    pub id: u64,
    /// Line item the grade belongs to.
    pub item_id: ItemId,
    /// Learner the grade belongs to.
    pub user_id: UserId,
    /// Final grade value, when one was recorded.
    #[serde(default)]
    pub value: Option<f64>,
    /// Maximum grade at the time of grading.
    #[serde(default)]
    pub grade_max: f64,
    /// Optional feedback text.
    #[serde(default)]
    pub feedback: Option<String>,
    /// Last modification time (unix seconds); `None` or `0` means never graded.
    #[serde(default)]
    pub time_modified: Option<i64>,
}

impl GradeRecord {
    /// Returns true when the grade has been modified at least once.
    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.time_modified.is_some_and(|time| time != 0)
    }
}
