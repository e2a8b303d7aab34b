// crates/lti-results-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Gradebook
// Description: Read-only gradebook held in ordered maps.
// Purpose: Back the Results resource without an external database.
// Dependencies: serde, serde_json, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryGradebook`] is built once (through builder methods or a
//! [`GradebookSnapshot`]) and then only read. Grade records are kept by id and
//! returned in id order, the natural order the paging engine relies on; a
//! record added with an existing id replaces the earlier one. Grade items and
//! line items are separate records: a line item alone is not a grade item.
//!
//! Line item visibility follows [`line_item_visible_to`]: an owner registered
//! by the gradebook service wins; otherwise the owning tool instance decides;
//! a line item with neither is not visible to any tool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::ContextId;
use crate::core::CourseRecord;
use crate::core::GradeItemRecord;
use crate::core::GradeRecord;
use crate::core::InstanceId;
use crate::core::ItemId;
use crate::core::LineItem;
use crate::core::ToolCaller;
use crate::core::ToolInstance;
use crate::interfaces::CourseLookup;
use crate::interfaces::GradeFetch;
use crate::interfaces::GradeItemLookup;
use crate::interfaces::LineItemResolver;
use crate::interfaces::StoreError;
use crate::interfaces::ToolInstanceLookup;

// ============================================================================
// SECTION: Visibility
// ============================================================================

/// Returns true when a line item is visible to the caller.
///
/// `owner` is the tool registered for the line item by the gradebook service;
/// `instance` is the tool placement the line item was created for.
#[must_use]
pub fn line_item_visible_to(
    owner: Option<&ToolCaller>,
    instance: Option<&ToolInstance>,
    caller: &ToolCaller,
) -> bool {
    match (owner, instance) {
        (Some(owner), _) => owner == caller,
        (None, Some(instance)) => instance.is_owned_by(caller),
        (None, None) => false,
    }
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Service-registered owner of a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemOwner {
    /// Line item the registration applies to.
    pub item_id: ItemId,
    /// Tool that created the line item.
    pub owner: ToolCaller,
}

/// Serializable gradebook contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradebookSnapshot {
    /// Courses.
    pub courses: Vec<CourseRecord>,
    /// Grade items.
    pub grade_items: Vec<GradeItemRecord>,
    /// Line items.
    pub line_items: Vec<LineItem>,
    /// Service-registered line item owners.
    pub line_item_owners: Vec<LineItemOwner>,
    /// Tool placements.
    pub tool_instances: Vec<ToolInstance>,
    /// Grade records; served in id order.
    pub grades: Vec<GradeRecord>,
}

impl GradebookSnapshot {
    /// Parses a snapshot from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when the bytes are not a valid snapshot.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, StoreError> {
        serde_json::from_slice(bytes).map_err(|err| StoreError::Corrupt(err.to_string()))
    }
}

// ============================================================================
// SECTION: In-Memory Gradebook
// ============================================================================

/// Read-only gradebook for tests and local deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGradebook {
    /// Courses keyed by context.
    courses: BTreeMap<ContextId, CourseRecord>,
    /// Grade items keyed by item.
    grade_items: BTreeMap<ItemId, GradeItemRecord>,
    /// Line items keyed by item.
    line_items: BTreeMap<ItemId, LineItem>,
    /// Registered line item owners keyed by item.
    owners: BTreeMap<ItemId, ToolCaller>,
    /// Tool placements keyed by instance.
    instances: BTreeMap<InstanceId, ToolInstance>,
    /// Grade records keyed by id.
    grades: BTreeMap<u64, GradeRecord>,
}

impl InMemoryGradebook {
    /// Creates an empty gradebook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a gradebook from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: GradebookSnapshot) -> Self {
        let mut gradebook = Self::new();
        for course in snapshot.courses {
            gradebook = gradebook.with_course(course);
        }
        for item in snapshot.grade_items {
            gradebook = gradebook.with_grade_item(item);
        }
        for line_item in snapshot.line_items {
            gradebook = gradebook.with_line_item(line_item);
        }
        for entry in snapshot.line_item_owners {
            gradebook = gradebook.with_line_item_owner(entry.item_id, entry.owner);
        }
        for instance in snapshot.tool_instances {
            gradebook = gradebook.with_tool_instance(instance);
        }
        for grade in snapshot.grades {
            gradebook = gradebook.with_grade(grade);
        }
        gradebook
    }

    /// Adds a course.
    #[must_use]
    pub fn with_course(mut self, course: CourseRecord) -> Self {
        self.courses.insert(course.id.clone(), course);
        self
    }

    /// Adds a grade item.
    #[must_use]
    pub fn with_grade_item(mut self, item: GradeItemRecord) -> Self {
        self.grade_items.insert(item.id.clone(), item);
        self
    }

    /// Adds a line item.
    #[must_use]
    pub fn with_line_item(mut self, line_item: LineItem) -> Self {
        self.line_items.insert(line_item.id.clone(), line_item);
        self
    }

    /// Registers the tool that created a line item.
    #[must_use]
    pub fn with_line_item_owner(mut self, item_id: ItemId, owner: ToolCaller) -> Self {
        self.owners.insert(item_id, owner);
        self
    }

    /// Adds a tool placement.
    #[must_use]
    pub fn with_tool_instance(mut self, instance: ToolInstance) -> Self {
        self.instances.insert(instance.id.clone(), instance);
        self
    }

    /// Adds a grade record, replacing any record with the same id.
    #[must_use]
    pub fn with_grade(mut self, grade: GradeRecord) -> Self {
        self.grades.insert(grade.id, grade);
        self
    }
}

impl CourseLookup for InMemoryGradebook {
    fn course(&self, context_id: &ContextId) -> Result<Option<CourseRecord>, StoreError> {
        Ok(self.courses.get(context_id).cloned())
    }
}

impl GradeItemLookup for InMemoryGradebook {
    fn grade_item(&self, item_id: &ItemId) -> Result<Option<GradeItemRecord>, StoreError> {
        Ok(self.grade_items.get(item_id).cloned())
    }

    fn grade_item_for_instance(
        &self,
        course_id: &ContextId,
        instance_id: &InstanceId,
    ) -> Result<Option<GradeItemRecord>, StoreError> {
        Ok(self
            .grade_items
            .values()
            .find(|item| {
                &item.course_id == course_id && item.item_instance.as_ref() == Some(instance_id)
            })
            .cloned())
    }
}

impl LineItemResolver for InMemoryGradebook {
    fn resolve_line_item(
        &self,
        context_id: &ContextId,
        item_id: &ItemId,
        caller: &ToolCaller,
    ) -> Result<Option<LineItem>, StoreError> {
        let Some(line_item) = self.line_items.get(item_id) else {
            return Ok(None);
        };
        if &line_item.course_id != context_id {
            return Ok(None);
        }
        let instance = line_item.item_instance.as_ref().and_then(|id| self.instances.get(id));
        if line_item_visible_to(self.owners.get(item_id), instance, caller) {
            Ok(Some(line_item.clone()))
        } else {
            Ok(None)
        }
    }
}

impl ToolInstanceLookup for InMemoryGradebook {
    fn tool_instance(
        &self,
        instance_id: &InstanceId,
        course_id: &ContextId,
    ) -> Result<Option<ToolInstance>, StoreError> {
        Ok(self
            .instances
            .get(instance_id)
            .filter(|instance| &instance.course_id == course_id)
            .cloned())
    }
}

impl GradeFetch for InMemoryGradebook {
    fn grades(&self, item_id: &ItemId) -> Result<Vec<GradeRecord>, StoreError> {
        Ok(self.grades.values().filter(|grade| &grade.item_id == item_id).cloned().collect())
    }
}
