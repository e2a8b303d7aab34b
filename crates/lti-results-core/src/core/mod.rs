// crates/lti-results-core/src/core/mod.rs
// ============================================================================
// Module: LTI Results Core Types
// Description: Identifiers, gradebook records, access modes, and paging.
// Purpose: Group the data model shared by stores and the HTTP resource.
// Dependencies: serde, url
// ============================================================================

//! ## Overview
//! Core types are plain data: they carry no storage or transport concerns.
//! Records are owned by the grade store and are only read by the resource.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod access;
pub mod gradebook;
pub mod identifiers;
pub mod paging;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AuthorizationMode;
pub use access::RESULT_COLLECTION_GET;
pub use access::ToolCaller;
pub use gradebook::CourseRecord;
pub use gradebook::GradeItemRecord;
pub use gradebook::GradeRecord;
pub use gradebook::LineItem;
pub use gradebook::ToolInstance;
pub use identifiers::ContextId;
pub use identifiers::InstanceId;
pub use identifiers::ItemId;
pub use identifiers::ToolProxyId;
pub use identifiers::TypeId;
pub use identifiers::UserId;
pub use paging::Page;
pub use paging::PageLinks;
pub use paging::PageRequest;
pub use paging::PageWindow;
pub use paging::PagingError;
pub use paging::paginate;
pub use paging::validate_paging_query_parameters;
