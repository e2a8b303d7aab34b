// crates/lti-results-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Gradebook
// Description: Gradebook lookups backed by SQLite.
// Purpose: Serve courses, line items, tool placements, and grades from disk.
// Dependencies: lti-results-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`lti_results_core::Gradebook`]. The
//! Results resource only reads from it; [`SqliteGradebook::import_snapshot`]
//! exists to seed a database from a JSON gradebook snapshot.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteGradebook;
pub use store::SqliteGradebookConfig;
pub use store::SqliteGradebookError;
