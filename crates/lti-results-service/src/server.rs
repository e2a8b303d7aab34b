// crates/lti-results-service/src/server.rs
// ============================================================================
// Module: Results HTTP Server
// Description: axum server exposing the Results collection resource.
// Purpose: Translate HTTP requests into resource calls and back.
// Dependencies: axum, tokio, lti-results-{config, core, store-sqlite}
// ============================================================================

//! ## Overview
//! The server mounts [`ResultsResource`] under `server.path_prefix` through a
//! single fallback handler, so every path (including unmatched ones) is
//! answered and audited by the resource. The resource call is synchronous and
//! is shifted onto a blocking-capable thread on the multi-thread runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::ACCEPT;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use lti_results_core::Gradebook;
use lti_results_core::GradebookSnapshot;
use lti_results_core::InMemoryGradebook;
use lti_results_store_sqlite::SqliteGradebook;
use lti_results_store_sqlite::SqliteGradebookConfig;
use thiserror::Error;

use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::ResultsAuditSink;
use crate::audit::StderrAuditSink;
use crate::auth::RegistryToolAuthz;
use crate::auth::RequestContext;
use crate::config::LtiResultsConfig;
use crate::config::ServerAuditConfig;
use crate::config::StoreType;
use crate::resource::ResourceResponse;
use crate::resource::ResultsError;
use crate::resource::ResultsResource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Response header carrying the navigation links.
pub const LINKS_HEADER: &str = "links";

/// Request header carrying a caller-supplied request identifier.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum gradebook snapshot size accepted by the memory store.
const MAX_SNAPSHOT_BYTES: u64 = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server hosting the Results resource.
pub struct ResultsServer {
    /// Server configuration.
    config: LtiResultsConfig,
    /// Resource serving every request.
    resource: Arc<ResultsResource>,
}

impl ResultsServer {
    /// Builds a server, its grade store, and its audit sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration or initialization fails.
    pub fn from_config(config: LtiResultsConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let gradebook = build_gradebook(&config)?;
        let authz = Arc::new(RegistryToolAuthz::from_config(&config));
        let audit = build_audit_sink(&config.server.audit)?;
        let resource = ResultsResource::new(gradebook, authz, config.service.endpoint_base())
            .with_emit_link_header(config.results.emit_link_header)
            .with_audit_sink(audit);
        Ok(Self::with_resource(config, resource))
    }

    /// Builds a server around an already-assembled resource.
    #[must_use]
    pub fn with_resource(config: LtiResultsConfig, resource: ResultsResource) -> Self {
        Self {
            config,
            resource: Arc::new(resource),
        }
    }

    /// Returns the axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            resource: Arc::clone(&self.resource),
            path_prefix: self.config.server.path_prefix.clone(),
            max_query_bytes: self.config.server.max_query_bytes,
        });
        Router::new().fallback(handle_request).with_state(state)
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Builds the grade store selected by configuration.
fn build_gradebook(config: &LtiResultsConfig) -> Result<Arc<dyn Gradebook>, ServerError> {
    match config.store.store_type {
        StoreType::Memory => {
            let gradebook = match &config.store.path {
                Some(path) => InMemoryGradebook::from_snapshot(read_snapshot(path)?),
                None => InMemoryGradebook::new(),
            };
            Ok(Arc::new(gradebook))
        }
        StoreType::Sqlite => {
            let path = config.store.path.clone().ok_or_else(|| {
                ServerError::Config("sqlite store requires path".to_string())
            })?;
            let sqlite_config = SqliteGradebookConfig {
                path,
                busy_timeout_ms: config.store.busy_timeout_ms,
            };
            let store = SqliteGradebook::open(&sqlite_config)
                .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Reads a JSON gradebook snapshot for the memory store.
fn read_snapshot(path: &Path) -> Result<GradebookSnapshot, ServerError> {
    let metadata = std::fs::metadata(path)
        .map_err(|err| ServerError::Init(format!("gradebook snapshot: {err}")))?;
    if metadata.len() > MAX_SNAPSHOT_BYTES {
        return Err(ServerError::Init("gradebook snapshot exceeds size limit".to_string()));
    }
    let bytes = std::fs::read(path)
        .map_err(|err| ServerError::Init(format!("gradebook snapshot: {err}")))?;
    GradebookSnapshot::from_json_slice(&bytes).map_err(|err| ServerError::Init(err.to_string()))
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(
    config: &ServerAuditConfig,
) -> Result<Arc<dyn ResultsAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Shared state for the request handler.
struct ServerState {
    /// Resource serving every request.
    resource: Arc<ResultsResource>,
    /// Mount point of the resource template.
    path_prefix: String,
    /// Maximum raw query string size.
    max_query_bytes: usize,
}

/// Handles every HTTP request.
async fn handle_request(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let raw_query = parts.uri.query().unwrap_or_default();
    let relative = strip_prefix(parts.uri.path(), &state.path_prefix);

    let mut context =
        request_context(parts.method.clone(), relative.unwrap_or_default(), &parts.headers);
    if let Some(peer) = peer {
        context = context.with_peer_ip(peer);
    }
    let response = if relative.is_none() {
        let error = ResultsError::NotFound("outside service prefix".to_string());
        state.resource.reject(&context, error)
    } else if raw_query.len() > state.max_query_bytes {
        state.resource.reject(&context, ResultsError::QueryTooLarge)
    } else {
        let context = context.with_query_string(raw_query);
        dispatch_with_blocking(&state.resource, &context)
    };
    into_http_response(response)
}

/// Runs the resource, shifting to a blocking context when available.
fn dispatch_with_blocking(
    resource: &ResultsResource,
    context: &RequestContext,
) -> ResourceResponse {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| resource.dispatch(context))
        }
        _ => resource.dispatch(context),
    }
}

/// Returns the path below the mount prefix, or `None` when outside it.
fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix).filter(|rest| rest.starts_with('/'))
}

/// Builds the request context from HTTP parts.
fn request_context(method: Method, path: &str, headers: &HeaderMap) -> RequestContext {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let mut context = RequestContext::new(method, path);
    if let Some(value) = header(AUTHORIZATION.as_str()) {
        context = context.with_auth_header(value);
    }
    if let Some(value) = header(ACCEPT.as_str()) {
        context = context.with_accept(value);
    }
    if let Some(value) = header(CONTENT_TYPE.as_str()) {
        context = context.with_content_type(value);
    }
    if let Some(value) = header(REQUEST_ID_HEADER) {
        context = context.with_request_id(value);
    }
    context
}

/// Converts a resource response into an HTTP response.
fn into_http_response(response: ResourceResponse) -> Response {
    let mut builder = Response::builder().status(response.status);
    if let Some(content_type) = response.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    if let Some(links) = response.link_header {
        builder = builder.header(LINKS_HEADER, links);
    }
    builder
        .body(Body::from(response.body.unwrap_or_default()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Results server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization failures.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
