// crates/lti-results-service/src/auth.rs
// ============================================================================
// Module: Tool Authentication
// Description: Request context, bearer credential parsing, and tool checks.
// Purpose: Authorize callers as a tool proxy or as a scoped tool type.
// Dependencies: axum (http types), lti-results-core, sha2, subtle, url
// ============================================================================

//! ## Overview
//! Every request carries a [`RequestContext`] built by the server. The
//! resource authorizes it through [`ToolAuthz`] in exactly one of two ways:
//! as a registered tool proxy, or as a tool type permitted to perform a named
//! scope in a course. [`RegistryToolAuthz`] implements both against the
//! configured tool registry. Secrets are compared in constant time and only a
//! SHA-256 fingerprint of the presented credential is kept for auditing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::http::Method;
use lti_results_core::ContextId;
use lti_results_core::ToolCaller;
use lti_results_core::ToolProxyId;
use lti_results_core::TypeId;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::form_urlencoded;

use crate::config::LtiResultsConfig;
use crate::config::ToolTypeConfig;
use crate::resource::permissions;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header size.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request state used for authorization, validation, and auditing.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Request path relative to the resource mount point.
    pub path: String,
    /// Decoded query parameters (last occurrence wins).
    pub query: BTreeMap<String, String>,
    /// `Accept` header value.
    pub accept: Option<String>,
    /// `Content-Type` header value.
    pub content_type: Option<String>,
    /// `Authorization` header value.
    pub auth_header: Option<String>,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a context for a method and relative path.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            accept: None,
            content_type: None,
            auth_header: None,
            peer_ip: None,
            request_id: None,
        }
    }

    /// Returns a copy with query parameters decoded from a raw query string.
    #[must_use]
    pub fn with_query_string(mut self, raw: &str) -> Self {
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            self.query.insert(key.into_owned(), value.into_owned());
        }
        self
    }

    /// Returns a copy with a single query parameter set.
    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with the `Accept` header set.
    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Returns a copy with the `Content-Type` header set.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns a copy with the raw `Authorization` header set.
    #[must_use]
    pub fn with_auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = Some(header.into());
        self
    }

    /// Returns a copy carrying `Authorization: Bearer <secret>`.
    #[must_use]
    pub fn with_bearer(self, secret: &str) -> Self {
        self.with_auth_header(format!("Bearer {secret}"))
    }

    /// Returns a copy with the peer IP set.
    #[must_use]
    pub const fn with_peer_ip(mut self, peer_ip: IpAddr) -> Self {
        self.peer_ip = Some(peer_ip);
        self
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns a query parameter value.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns the media type the request negotiates: `Accept` for GET,
    /// `Content-Type` otherwise. Blank values count as absent.
    #[must_use]
    pub fn negotiated_content_type(&self) -> Option<&str> {
        let value = if self.method == Method::GET {
            self.accept.as_deref()
        } else {
            self.content_type.as_deref()
        };
        value.map(str::trim).filter(|value| !value.is_empty())
    }
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Authenticated caller context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Tool identity that passed the check.
    pub caller: ToolCaller,
    /// SHA-256 fingerprint of the presented credential.
    pub token_fingerprint: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication or authorization errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Missing or invalid credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Credentials are valid but the tool may not perform the action.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Tool authorization interface.
pub trait ToolAuthz: Send + Sync {
    /// Checks that the caller is a registered tool proxy.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the credential does not identify a proxy.
    fn check_tool_proxy(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError>;

    /// Checks that the caller is `type_id` and may perform `scope` in the course.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the credential or scope check fails.
    fn check_type(
        &self,
        type_id: &TypeId,
        context_id: &ContextId,
        scope: &str,
        ctx: &RequestContext,
    ) -> Result<AuthContext, AuthError>;
}

// ============================================================================
// SECTION: Registry Authz
// ============================================================================

/// Tool authorization backed by the configured registry.
pub struct RegistryToolAuthz {
    /// Tool proxies and their secrets.
    proxies: Vec<(ToolProxyId, String)>,
    /// Tool types keyed by identifier.
    types: BTreeMap<TypeId, ToolTypeConfig>,
}

impl RegistryToolAuthz {
    /// Builds the registry from configuration.
    #[must_use]
    pub fn from_config(config: &LtiResultsConfig) -> Self {
        let proxies = config
            .tool_proxies
            .iter()
            .map(|proxy| (proxy.id.clone(), proxy.secret.clone()))
            .collect();
        let types =
            config.tool_types.iter().map(|entry| (entry.id.clone(), entry.clone())).collect();
        Self {
            proxies,
            types,
        }
    }
}

impl ToolAuthz for RegistryToolAuthz {
    fn check_tool_proxy(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError> {
        let token = parse_bearer_token(ctx.auth_header.as_deref())?;
        let mut matched: Option<&ToolProxyId> = None;
        for (id, secret) in &self.proxies {
            if bool::from(secret.as_bytes().ct_eq(token.as_bytes())) && matched.is_none() {
                matched = Some(id);
            }
        }
        let id = matched.ok_or_else(|| {
            AuthError::Unauthenticated("unknown tool proxy credential".to_string())
        })?;
        Ok(AuthContext {
            caller: ToolCaller::ToolProxy(id.clone()),
            token_fingerprint: token_fingerprint(&token),
        })
    }

    fn check_type(
        &self,
        type_id: &TypeId,
        context_id: &ContextId,
        scope: &str,
        ctx: &RequestContext,
    ) -> Result<AuthContext, AuthError> {
        let token = parse_bearer_token(ctx.auth_header.as_deref())?;
        let entry = self
            .types
            .get(type_id)
            .ok_or_else(|| AuthError::Unauthenticated("unknown tool type".to_string()))?;
        if !bool::from(entry.secret.as_bytes().ct_eq(token.as_bytes())) {
            return Err(AuthError::Unauthenticated("invalid tool type credential".to_string()));
        }
        if !permissions(entry.grade_synchronization).contains(&scope) {
            return Err(AuthError::Unauthorized(format!("scope not granted: {scope}")));
        }
        if !entry.allows_course(context_id) {
            return Err(AuthError::Unauthorized("tool type not deployed in course".to_string()));
        }
        Ok(AuthContext {
            caller: ToolCaller::ToolType(type_id.clone()),
            token_fingerprint: token_fingerprint(&token),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the bearer token from an `Authorization` header.
fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Returns the hex SHA-256 fingerprint of a credential.
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex_encode(&digest)
}

/// Lowercase hex encoding.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::parse_bearer_token;
    use super::token_fingerprint;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(parse_bearer_token(Some("bearer abc")), Ok("abc".to_string()));
        assert_eq!(parse_bearer_token(Some("  BEARER   abc ")), Ok("abc".to_string()));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert!(parse_bearer_token(None).is_err());
        assert!(parse_bearer_token(Some("Basic abc")).is_err());
        assert!(parse_bearer_token(Some("Bearer")).is_err());
        assert!(parse_bearer_token(Some(&"x".repeat(9 * 1024))).is_err());
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            token_fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
