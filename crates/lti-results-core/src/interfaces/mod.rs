// crates/lti-results-core/src/interfaces/mod.rs
// ============================================================================
// Module: LTI Results Interfaces
// Description: Grade store lookups and result mapping contracts.
// Purpose: Define the collaborator surfaces consumed by the Results resource.
// Dependencies: serde_json, thiserror, crate::core
// ============================================================================

//! ## Overview
//! The Results resource reads from a grade store it does not own. Each lookup
//! is its own trait so tests can stub a single concern; [`Gradebook`] bundles
//! them for stores that implement everything. Lookups return `Ok(None)` for a
//! missing record and reserve [`StoreError`] for backend failures, which the
//! resource reports as server errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::AuthorizationMode;
use crate::core::ContextId;
use crate::core::CourseRecord;
use crate::core::GradeItemRecord;
use crate::core::GradeRecord;
use crate::core::InstanceId;
use crate::core::ItemId;
use crate::core::LineItem;
use crate::core::ToolCaller;
use crate::core::ToolInstance;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Grade store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("grade store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or unreadable.
    #[error("grade store corruption: {0}")]
    Corrupt(String),
    /// Stored data is invalid.
    #[error("grade store invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Lookups
// ============================================================================

/// Course existence lookup.
pub trait CourseLookup {
    /// Loads a course by context identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn course(&self, context_id: &ContextId) -> Result<Option<CourseRecord>, StoreError>;
}

/// Grade item lookups.
pub trait GradeItemLookup {
    /// Loads a grade item by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn grade_item(&self, item_id: &ItemId) -> Result<Option<GradeItemRecord>, StoreError>;

    /// Loads the grade item created for a tool instance in a course.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn grade_item_for_instance(
        &self,
        course_id: &ContextId,
        instance_id: &InstanceId,
    ) -> Result<Option<GradeItemRecord>, StoreError>;
}

/// Resolves a line item visible to a caller.
pub trait LineItemResolver {
    /// Returns the line item for `(context, item)` when the caller may see it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn resolve_line_item(
        &self,
        context_id: &ContextId,
        item_id: &ItemId,
        caller: &ToolCaller,
    ) -> Result<Option<LineItem>, StoreError>;
}

/// Tool placement lookup.
pub trait ToolInstanceLookup {
    /// Loads a tool instance hosted by the given course.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn tool_instance(
        &self,
        instance_id: &InstanceId,
        course_id: &ContextId,
    ) -> Result<Option<ToolInstance>, StoreError>;
}

/// Grade record fetch.
pub trait GradeFetch {
    /// Returns every grade record for a line item in natural store order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn grades(&self, item_id: &ItemId) -> Result<Vec<GradeRecord>, StoreError>;
}

/// A grade store implementing every lookup the resource needs.
pub trait Gradebook:
    CourseLookup
    + GradeItemLookup
    + LineItemResolver
    + ToolInstanceLookup
    + GradeFetch
    + Send
    + Sync
{
}

impl<T> Gradebook for T where
    T: CourseLookup
        + GradeItemLookup
        + LineItemResolver
        + ToolInstanceLookup
        + GradeFetch
        + Send
        + Sync
{
}

// ============================================================================
// SECTION: Result Mapping
// ============================================================================

/// Converts a grade record into its wire JSON element.
pub trait GradeToJsonMapper: Send + Sync {
    /// Maps one graded record.
    ///
    /// `line_item_endpoint` is the absolute URL of the owning line item.
    fn map(&self, grade: &GradeRecord, line_item_endpoint: &str, mode: &AuthorizationMode)
    -> Value;
}
