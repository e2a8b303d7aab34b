// crates/lti-results-core/src/lib.rs
// ============================================================================
// Module: LTI Results Core Library
// Description: Public API surface for the LTI Results core.
// Purpose: Expose gradebook types, paging, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! LTI Results core holds the backend-agnostic half of the Results collection
//! resource: typed identifiers, gradebook records, the paging engine with its
//! navigation links, and the collaborator interfaces the resource consumes.
//! Storage engines and HTTP plumbing live in downstream crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CourseLookup;
pub use interfaces::GradeFetch;
pub use interfaces::GradeItemLookup;
pub use interfaces::GradeToJsonMapper;
pub use interfaces::Gradebook;
pub use interfaces::LineItemResolver;
pub use interfaces::StoreError;
pub use interfaces::ToolInstanceLookup;
pub use runtime::GradebookSnapshot;
pub use runtime::InMemoryGradebook;
pub use runtime::LineItemOwner;
pub use runtime::line_item_visible_to;
