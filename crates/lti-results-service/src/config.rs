// crates/lti-results-service/src/config.rs
// ============================================================================
// Module: Service Configuration
// Description: Re-export of the canonical lti-results-config model.
// Purpose: Let service callers name config types without a second import path.
// Dependencies: lti-results-config
// ============================================================================

//! ## Overview
//! The configuration model lives in `lti-results-config`; this module
//! re-exports it so server and authorization code share one source of truth.

pub use lti_results_config::*;
