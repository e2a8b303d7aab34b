// crates/lti-results-service/src/lib.rs
// ============================================================================
// Module: LTI Results Service
// Description: Results collection resource and its HTTP server.
// Purpose: Serve paged grade results to authorized LTI tools.
// Dependencies: lti-results-core, lti-results-config, axum, tokio
// ============================================================================

//! ## Overview
//! LTI Results Service exposes one read-only resource,
//! `GET /{context_id}/lineitems/{item_id}/results`, which returns the graded
//! results of a gradebook line item as a paged result container. Tools
//! authenticate as a registered tool proxy or, with `typeid`, as a tool type
//! holding the `Result.collection:get` scope.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod config;
pub mod container;
pub mod resource;
pub mod server;
pub mod telemetry;
pub mod template;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ResultsAuditEvent;
pub use audit::ResultsAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthContext;
pub use auth::AuthError;
pub use auth::RegistryToolAuthz;
pub use auth::RequestContext;
pub use auth::ToolAuthz;
pub use config::LtiResultsConfig;
pub use container::ContainerError;
pub use container::LisResultMapper;
pub use container::RESULT_CONTAINER_MEDIA_TYPE;
pub use container::serialize_results;
pub use resource::LaunchContext;
pub use resource::RESULTS_RESOURCE;
pub use resource::ResourceDescriptor;
pub use resource::ResourceResponse;
pub use resource::ResultsError;
pub use resource::ResultsResource;
pub use resource::permissions;
pub use server::LINKS_HEADER;
pub use server::ResultsServer;
pub use server::ServerError;
pub use telemetry::NoopMetrics;
pub use telemetry::ResultsMetricEvent;
pub use telemetry::ResultsMetrics;
pub use telemetry::ResultsOutcome;
pub use template::TemplateResolver;
pub use template::UriTemplate;
