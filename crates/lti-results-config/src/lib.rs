// crates/lti-results-config/src/lib.rs
// ============================================================================
// Module: LTI Results Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for lti-results.toml semantics.
// Dependencies: lti-results-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `lti-results-config` defines the configuration model for the Results
//! service: server binding, the service base URL, link header emission, the
//! grade store backend, and the tool registry used for authorization.
//!
//! Security posture: config inputs are untrusted and validated fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
