// crates/lti-results-core/src/runtime/mod.rs
// ============================================================================
// Module: LTI Results Runtime
// Description: In-memory gradebook and shared visibility helpers.
// Purpose: Provide a deterministic grade store for tests, demos, and fixtures.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules hold the store-agnostic helpers that every gradebook
//! backend shares, plus an in-memory backend seeded from a JSON snapshot.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use memory::GradebookSnapshot;
pub use memory::InMemoryGradebook;
pub use memory::LineItemOwner;
pub use memory::line_item_visible_to;
