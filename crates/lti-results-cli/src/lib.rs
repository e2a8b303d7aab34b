// crates/lti-results-cli/src/lib.rs
// ============================================================================
// Module: LTI Results CLI Library
// Description: Shared helpers for the LTI Results command-line interface.
// Purpose: Keep bind-safety policy testable outside the binary entry point.
// Dependencies: lti-results-config, thiserror
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) imports the serve policy from here
//! before starting the HTTP server.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Network exposure checks for `lti-results serve`.
pub mod serve_policy;
