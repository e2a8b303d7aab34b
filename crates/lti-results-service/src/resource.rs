// crates/lti-results-service/src/resource.rs
// ============================================================================
// Module: Results Collection Resource
// Description: Authorization, validation, paging, and serialization pipeline.
// Purpose: Serve `GET /{context_id}/lineitems/{item_id}/results`.
// Dependencies: axum (http types), lti-results-core, crate::{auth, audit,
//               container, telemetry, template}
// ============================================================================

//! ## Overview
//! [`ResultsResource`] runs a linear pipeline that stops at the first failed
//! check. Each check yields a [`ResultsError`] carrying its HTTP status; the
//! error is converted to a bodiless response exactly once, at the top of
//! [`ResultsResource::execute`]. The order is fixed:
//!
//! 1. authorization (tool proxy, or scoped tool type when `typeid` is set)
//! 2. context and content negotiation
//! 3. course and grade item existence
//! 4. line item resolution and tool instance ownership
//! 5. method gating
//! 6. paging parameter validation
//!
//! Every request produces one audit event and one metrics observation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::http::Method;
use axum::http::StatusCode;
use lti_results_core::AuthorizationMode;
use lti_results_core::ContextId;
use lti_results_core::GradeToJsonMapper;
use lti_results_core::Gradebook;
use lti_results_core::InstanceId;
use lti_results_core::ItemId;
use lti_results_core::PageLinks;
use lti_results_core::PagingError;
use lti_results_core::RESULT_COLLECTION_GET;
use lti_results_core::StoreError;
use lti_results_core::paginate;
use lti_results_core::validate_paging_query_parameters;
use thiserror::Error;

use crate::audit::NoopAuditSink;
use crate::audit::ResultsAuditEvent;
use crate::audit::ResultsAuditEventParams;
use crate::audit::ResultsAuditSink;
use crate::auth::AuthContext;
use crate::auth::AuthError;
use crate::auth::RequestContext;
use crate::auth::ToolAuthz;
use crate::container::LisResultMapper;
use crate::container::RESULT_CONTAINER_MEDIA_TYPE;
use crate::container::serialize_results;
use crate::telemetry::NoopMetrics;
use crate::telemetry::ResultsMetricEvent;
use crate::telemetry::ResultsMetrics;
use crate::telemetry::ResultsOutcome;
use crate::template::TemplateResolver;
use crate::template::UriTemplate;

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// Static declaration of a service resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Resource identifier.
    pub id: &'static str,
    /// Path template relative to the service base URL.
    pub template: &'static str,
    /// Launch substitution variables the resource supports.
    pub variables: &'static [&'static str],
    /// Media types the resource produces.
    pub formats: &'static [&'static str],
    /// HTTP methods the resource accepts.
    pub methods: &'static [&'static str],
}

/// The Results collection resource.
pub const RESULTS_RESOURCE: ResourceDescriptor = ResourceDescriptor {
    id: "Result.collection",
    template: "/{context_id}/lineitems/{item_id}/results",
    variables: &["Results.url"],
    formats: &[RESULT_CONTAINER_MEDIA_TYPE],
    methods: &["GET"],
};

/// Path template of the owning line item resource.
pub const LINE_ITEM_TEMPLATE: &str = "/{context_id}/lineitems/{item_id}/lineitem";

/// Launch variable replaced by the results endpoint.
const RESULTS_URL_VARIABLE: &str = "$Results.url";

/// Path variable carrying the course identifier.
const CONTEXT_ID_PARAM: &str = "context_id";

/// Path variable carrying the line item identifier.
const ITEM_ID_PARAM: &str = "item_id";

// ============================================================================
// SECTION: Permissions
// ============================================================================

/// Scopes the resource grants to a tool type with the given grade
/// synchronization setting.
#[must_use]
pub const fn permissions(grade_synchronization: u8) -> &'static [&'static str] {
    match grade_synchronization {
        1 | 2 => &[RESULT_COLLECTION_GET],
        _ => &[],
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures raised by the Results pipeline.
#[derive(Debug, Error)]
pub enum ResultsError {
    /// Caller failed the tool or scope check.
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    /// Missing context or unsupported media type.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Course, grade item, or route not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Line item not visible to the caller.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Method not accepted by the resource.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    /// Malformed `limit` or `from`.
    #[error("invalid paging parameters: {0}")]
    InvalidPaging(#[from] PagingError),
    /// Query string exceeds the configured limit.
    #[error("query string too large")]
    QueryTooLarge,
    /// Grade store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Endpoint or body could not be produced.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResultsError {
    /// Returns the HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::InvalidPaging(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::QueryTooLarge => StatusCode::URI_TOO_LONG,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a stable label for audit and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::InvalidPaging(_) => "invalid_paging",
            Self::QueryTooLarge => "query_too_large",
            Self::Store(_) => "store",
            Self::Internal(_) => "internal",
        }
    }
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Transport-neutral response produced by the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Content type of the body.
    pub content_type: Option<&'static str>,
    /// Response body; `None` on every failure.
    pub body: Option<String>,
    /// `links` header value for paged responses.
    pub link_header: Option<String>,
}

impl ResourceResponse {
    /// Builds a bodiless error response.
    fn from_error(error: &ResultsError) -> Self {
        Self {
            status: error.status(),
            content_type: None,
            body: None,
            link_header: None,
        }
    }
}

/// Launch state used for custom parameter substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    /// Course the tool is launched from.
    pub course_id: ContextId,
    /// Tool placement being launched, when any.
    pub instance_id: Option<InstanceId>,
}

/// Details gathered while a request moves through the pipeline.
#[derive(Debug, Default)]
struct RequestTrace {
    /// Path course identifier.
    context_id: Option<String>,
    /// Path line item identifier.
    item_id: Option<String>,
    /// Selected authorization mode.
    auth_mode: Option<&'static str>,
    /// Authenticated caller.
    auth: Option<AuthContext>,
    /// Results on the returned page.
    result_count: Option<usize>,
    /// Graded results available.
    total_count: Option<usize>,
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Results collection resource bound to its collaborators.
pub struct ResultsResource {
    /// Grade store.
    gradebook: Arc<dyn Gradebook>,
    /// Tool authorization.
    authz: Arc<dyn ToolAuthz>,
    /// Grade to JSON mapper.
    mapper: Arc<dyn GradeToJsonMapper>,
    /// Resource path template.
    template: Arc<dyn TemplateResolver>,
    /// Owning line item template.
    line_item_template: UriTemplate,
    /// Absolute service base URL.
    base_url: String,
    /// Emit the `links` header on paged responses.
    emit_link_header: bool,
    /// Audit sink.
    audit: Arc<dyn ResultsAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn ResultsMetrics>,
}

impl ResultsResource {
    /// Creates the resource with default mapping, no audit, and no metrics.
    #[must_use]
    pub fn new(
        gradebook: Arc<dyn Gradebook>,
        authz: Arc<dyn ToolAuthz>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            gradebook,
            authz,
            mapper: Arc::new(LisResultMapper),
            template: Arc::new(UriTemplate::new(RESULTS_RESOURCE.template)),
            line_item_template: UriTemplate::new(LINE_ITEM_TEMPLATE),
            base_url: base_url.into(),
            emit_link_header: true,
            audit: Arc::new(NoopAuditSink),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Replaces the grade mapper.
    #[must_use]
    pub fn with_mapper(mut self, mapper: Arc<dyn GradeToJsonMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Replaces the template resolver.
    #[must_use]
    pub fn with_template(mut self, template: Arc<dyn TemplateResolver>) -> Self {
        self.template = template;
        self
    }

    /// Enables or disables the `links` header.
    #[must_use]
    pub const fn with_emit_link_header(mut self, emit: bool) -> Self {
        self.emit_link_header = emit;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn ResultsAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ResultsMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Returns the resource declaration.
    #[must_use]
    pub const fn descriptor(&self) -> &'static ResourceDescriptor {
        &RESULTS_RESOURCE
    }

    /// Routes a request: unmatched paths get 404, undeclared methods 405,
    /// and everything else runs the full pipeline.
    #[must_use]
    pub fn dispatch(&self, ctx: &RequestContext) -> ResourceResponse {
        let Some(params) = self.template.parse(&ctx.path) else {
            let error = ResultsError::NotFound("no resource matches path".to_string());
            return self.reject(ctx, error);
        };
        if !self.accepts_method(&ctx.method) {
            let started = Instant::now();
            let trace = RequestTrace {
                context_id: params.get(CONTEXT_ID_PARAM).cloned(),
                item_id: params.get(ITEM_ID_PARAM).cloned(),
                ..RequestTrace::default()
            };
            let error = ResultsError::MethodNotAllowed(ctx.method.to_string());
            return self.finish(ctx, trace, Err(error), started);
        }
        self.execute(ctx, &params)
    }

    /// Runs the pipeline for already-resolved path parameters.
    #[must_use]
    pub fn execute(
        &self,
        ctx: &RequestContext,
        params: &BTreeMap<String, String>,
    ) -> ResourceResponse {
        let started = Instant::now();
        let mut trace = RequestTrace {
            context_id: params.get(CONTEXT_ID_PARAM).cloned(),
            item_id: params.get(ITEM_ID_PARAM).cloned(),
            ..RequestTrace::default()
        };
        let result = self.handle(ctx, &mut trace);
        self.finish(ctx, trace, result, started)
    }

    /// Records and renders a rejection raised outside the pipeline.
    #[must_use]
    pub fn reject(&self, ctx: &RequestContext, error: ResultsError) -> ResourceResponse {
        self.finish(ctx, RequestTrace::default(), Err(error), Instant::now())
    }

    /// Returns the absolute results endpoint for a course and line item.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::Internal`] when the base URL cannot be expanded.
    pub fn endpoint(
        &self,
        context_id: &ContextId,
        item_id: &ItemId,
    ) -> Result<String, ResultsError> {
        expand_for(self.template.as_ref(), &self.base_url, context_id, item_id)
    }

    /// Returns the absolute endpoint of the owning line item.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::Internal`] when the base URL cannot be expanded.
    pub fn line_item_endpoint(
        &self,
        context_id: &ContextId,
        item_id: &ItemId,
    ) -> Result<String, ResultsError> {
        expand_for(&self.line_item_template, &self.base_url, context_id, item_id)
    }

    /// Replaces `$Results.url` in a custom launch parameter.
    ///
    /// The variable resolves to the results endpoint of the grade item created
    /// for the launched tool instance, or to an empty string when there is no
    /// such item. Values without the variable are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError`] when the store or endpoint expansion fails.
    pub fn parse_value(&self, value: &str, launch: &LaunchContext) -> Result<String, ResultsError> {
        if !value.contains(RESULTS_URL_VARIABLE) {
            return Ok(value.to_string());
        }
        let item = match &launch.instance_id {
            Some(instance_id) => {
                self.gradebook.grade_item_for_instance(&launch.course_id, instance_id)?
            }
            None => None,
        };
        let replacement = match item {
            Some(item) => self.endpoint(&launch.course_id, &item.id)?,
            None => String::new(),
        };
        Ok(value.replace(RESULTS_URL_VARIABLE, &replacement))
    }

    /// Runs every pipeline step after routing.
    fn handle(
        &self,
        ctx: &RequestContext,
        trace: &mut RequestTrace,
    ) -> Result<ResourceResponse, ResultsError> {
        let negotiated = ctx.negotiated_content_type();
        let mode = AuthorizationMode::from_type_param(ctx.query_param("typeid"));
        trace.auth_mode = Some(mode.label());
        let context_id = ContextId::new(trace.context_id.clone().unwrap_or_default());
        let item_id = ItemId::new(trace.item_id.clone().unwrap_or_default());

        let auth = match &mode {
            AuthorizationMode::ToolProxy => self.authz.check_tool_proxy(ctx)?,
            AuthorizationMode::ToolType(type_id) => {
                self.authz.check_type(type_id, &context_id, RESULT_COLLECTION_GET, ctx)?
            }
        };
        let caller = auth.caller.clone();
        trace.auth = Some(auth);

        if context_id.is_blank() {
            return Err(ResultsError::BadRequest("missing context".to_string()));
        }
        if let Some(media_type) = negotiated
            && !supports_format(media_type)
        {
            return Err(ResultsError::BadRequest(format!("unsupported media type: {media_type}")));
        }

        if self.gradebook.course(&context_id)?.is_none() {
            return Err(ResultsError::NotFound("course".to_string()));
        }
        if self.gradebook.grade_item(&item_id)?.is_none() {
            return Err(ResultsError::NotFound("grade item".to_string()));
        }
        let line_item = self
            .gradebook
            .resolve_line_item(&context_id, &item_id, &caller)?
            .ok_or_else(|| ResultsError::Forbidden("line item not resolvable".to_string()))?;
        if let Some(instance_id) = &line_item.item_instance {
            let owned = self
                .gradebook
                .tool_instance(instance_id, &context_id)?
                .is_some_and(|instance| instance.is_owned_by(&caller));
            if !owned {
                return Err(ResultsError::Forbidden("line item owned by another tool".to_string()));
            }
        }

        if ctx.method != Method::GET {
            return Err(ResultsError::MethodNotAllowed(ctx.method.to_string()));
        }

        let request =
            validate_paging_query_parameters(ctx.query_param("limit"), ctx.query_param("from"))?;

        let page = paginate(self.gradebook.grades(&item_id)?, request);
        trace.result_count = Some(page.items.len());
        trace.total_count = Some(page.total_count);
        let endpoint = self.endpoint(&context_id, &item_id)?;
        let line_item_endpoint = self.line_item_endpoint(&context_id, &item_id)?;
        let body = serialize_results(&page.items, &line_item_endpoint, &mode, self.mapper.as_ref())
            .map_err(|err| ResultsError::Internal(err.to_string()))?;
        let link_header = page
            .window
            .filter(|_| self.emit_link_header)
            .map(|window| PageLinks::build(&endpoint, &mode, &window).header_value());
        Ok(ResourceResponse {
            status: StatusCode::OK,
            content_type: Some(RESULT_CONTAINER_MEDIA_TYPE),
            body: Some(body),
            link_header,
        })
    }

    /// Returns true when the method is declared by the resource.
    fn accepts_method(&self, method: &Method) -> bool {
        self.descriptor().methods.iter().any(|declared| *declared == method.as_str())
    }

    /// Converts the outcome to a response and records audit and metrics.
    fn finish(
        &self,
        ctx: &RequestContext,
        trace: RequestTrace,
        result: Result<ResourceResponse, ResultsError>,
        started: Instant,
    ) -> ResourceResponse {
        let (response, error_kind) = match result {
            Ok(response) => (response, None),
            Err(error) => (ResourceResponse::from_error(&error), Some(error.kind())),
        };
        let status = response.status.as_u16();
        let (caller, token_fingerprint) = trace.auth.map_or((None, None), |auth| {
            (Some(auth.caller.id().to_string()), Some(auth.token_fingerprint))
        });
        self.audit.record(&ResultsAuditEvent::new(ResultsAuditEventParams {
            request_id: ctx.request_id.clone(),
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            method: ctx.method.to_string(),
            context_id: trace.context_id,
            item_id: trace.item_id,
            auth_mode: trace.auth_mode,
            caller,
            token_fingerprint,
            status,
            error_kind,
            result_count: trace.result_count,
            total_count: trace.total_count,
        }));
        let event = ResultsMetricEvent {
            status,
            outcome: ResultsOutcome::from_status(status),
            auth_mode: trace.auth_mode,
            error_kind,
            result_count: trace.result_count.unwrap_or(0),
        };
        self.metrics.record_request(event.clone());
        self.metrics.record_latency(event, started.elapsed());
        response
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Expands a course and line item template under the base URL.
fn expand_for(
    template: &dyn TemplateResolver,
    base_url: &str,
    context_id: &ContextId,
    item_id: &ItemId,
) -> Result<String, ResultsError> {
    let params = BTreeMap::from([
        (CONTEXT_ID_PARAM.to_string(), context_id.to_string()),
        (ITEM_ID_PARAM.to_string(), item_id.to_string()),
    ]);
    template
        .expand(base_url, &params)
        .ok_or_else(|| ResultsError::Internal(format!("cannot expand {}", template.template())))
}

/// Returns true when a negotiated media type is one the resource produces.
///
/// Parameters such as `charset` are ignored; comparison is case-insensitive.
fn supports_format(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    RESULTS_RESOURCE.formats.iter().any(|format| format.eq_ignore_ascii_case(essence))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
