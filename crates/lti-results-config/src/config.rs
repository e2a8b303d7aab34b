// crates/lti-results-config/src/config.rs
// ============================================================================
// Module: LTI Results Configuration
// Description: Configuration loading and validation for the Results service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: lti-results-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Tool registry entries carry
//! shared secrets, so they are length-checked and never echoed in errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use lti_results_core::ContextId;
use lti_results_core::ToolProxyId;
use lti_results_core::TypeId;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "lti-results.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "LTI_RESULTS_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of tool proxy or tool type entries.
pub(crate) const MAX_TOOL_ENTRIES: usize = 1024;
/// Maximum length of a tool identifier.
pub(crate) const MAX_TOOL_ID_LENGTH: usize = 128;
/// Maximum length of a tool shared secret.
pub(crate) const MAX_SECRET_LENGTH: usize = 256;
/// Maximum number of courses in a tool type allow-list.
pub(crate) const MAX_COURSE_ALLOWLIST: usize = 4096;
/// Upper bound for `server.max_query_bytes`.
pub(crate) const MAX_QUERY_BYTES_LIMIT: usize = 64 * 1024;
/// Highest grade synchronization setting.
pub(crate) const MAX_GRADE_SYNCHRONIZATION: u8 = 2;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// LTI Results service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LtiResultsConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Public service settings.
    pub service: ServiceConfig,
    /// Results resource behavior.
    #[serde(default)]
    pub results: ResultsConfig,
    /// Grade store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Registered LTI 2 tool proxies.
    #[serde(default)]
    pub tool_proxies: Vec<ToolProxyConfig>,
    /// LTI 1.x tool types.
    #[serde(default)]
    pub tool_types: Vec<ToolTypeConfig>,
}

impl LtiResultsConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.service.validate()?;
        self.store.validate()?;
        validate_tool_proxies(&self.tool_proxies)?;
        validate_tool_types(&self.tool_types, &self.tool_proxies)?;
        Ok(())
    }

    /// Returns the configured tool type with the given identifier.
    #[must_use]
    pub fn tool_type(&self, type_id: &TypeId) -> Option<&ToolTypeConfig> {
        self.tool_types.iter().find(|entry| &entry.id == type_id)
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path prefix the resource template is mounted under.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    /// Maximum raw query string size in bytes.
    #[serde(default = "default_max_query_bytes")]
    pub max_query_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path_prefix: default_path_prefix(),
            max_query_bytes: default_max_query_bytes(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        let prefix = self.path_prefix.as_str();
        if !prefix.is_empty() {
            if !prefix.starts_with('/') {
                return Err(ConfigError::Invalid(
                    "server.path_prefix must start with '/'".to_string(),
                ));
            }
            if prefix.ends_with('/') {
                return Err(ConfigError::Invalid(
                    "server.path_prefix must not end with '/'".to_string(),
                ));
            }
            if prefix.contains(['?', '#', '{', '}']) {
                return Err(ConfigError::Invalid(
                    "server.path_prefix contains reserved characters".to_string(),
                ));
            }
        }
        if self.max_query_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_query_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_query_bytes > MAX_QUERY_BYTES_LIMIT {
            return Err(ConfigError::Invalid("max_query_bytes too large".to_string()));
        }
        self.audit.validate()
    }
}

/// Structured audit log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Service and Results
// ============================================================================

/// Public service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Absolute base URL that resource templates are appended to.
    pub base_url: String,
}

impl ServiceConfig {
    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn endpoint_base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Validates service settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("service.base_url must be set".to_string()));
        }
        let url = Url::parse(trimmed)
            .map_err(|err| ConfigError::Invalid(format!("invalid service.base_url: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "service.base_url must use http or https".to_string(),
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "service.base_url must not carry a query or fragment".to_string(),
            ));
        }
        Ok(())
    }
}

/// Results resource behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsConfig {
    /// Emit the `links` navigation header on paged responses.
    #[serde(default = "default_emit_link_header")]
    pub emit_link_header: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            emit_link_header: default_emit_link_header(),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Grade store backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path, or an optional JSON snapshot for memory stores.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Validates grade store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("store.path", &path.to_string_lossy())?;
        }
        match self.store_type {
            StoreType::Memory => Ok(()),
            StoreType::Sqlite => {
                if self.path.is_none() {
                    return Err(ConfigError::Invalid("sqlite store requires path".to_string()));
                }
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store.busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Grade store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory gradebook, optionally seeded from a JSON snapshot.
    #[default]
    Memory,
    /// `SQLite` gradebook database.
    Sqlite,
}

// ============================================================================
// SECTION: Tool Registry
// ============================================================================

/// Registered LTI 2 tool proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolProxyConfig {
    /// Tool proxy identifier.
    pub id: ToolProxyId,
    /// Shared secret presented as a bearer credential.
    pub secret: String,
}

/// LTI 1.x tool type deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolTypeConfig {
    /// Tool type identifier.
    pub id: TypeId,
    /// Shared secret presented as a bearer credential.
    pub secret: String,
    /// Tool proxy that owns this type, for LTI 2 registrations.
    #[serde(default)]
    pub tool_proxy_id: Option<ToolProxyId>,
    /// Grade synchronization setting (0 disabled, 1 or 2 enabled).
    #[serde(default)]
    pub grade_synchronization: u8,
    /// Courses the type is deployed in; unset allows every course.
    #[serde(default)]
    pub course_ids: Option<Vec<ContextId>>,
}

impl ToolTypeConfig {
    /// Returns true when the type is deployed in the given course.
    #[must_use]
    pub fn allows_course(&self, context_id: &ContextId) -> bool {
        self.course_ids.as_ref().is_none_or(|courses| courses.contains(context_id))
    }
}

/// Validates tool proxy entries.
fn validate_tool_proxies(proxies: &[ToolProxyConfig]) -> Result<(), ConfigError> {
    if proxies.len() > MAX_TOOL_ENTRIES {
        return Err(ConfigError::Invalid("too many tool_proxies entries".to_string()));
    }
    let mut seen = BTreeSet::new();
    for proxy in proxies {
        validate_tool_id("tool_proxies.id", proxy.id.as_str())?;
        validate_secret("tool_proxies", proxy.id.as_str(), &proxy.secret)?;
        if !seen.insert(proxy.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate tool proxy: {}", proxy.id)));
        }
    }
    Ok(())
}

/// Validates tool type entries against the proxy registry.
fn validate_tool_types(
    types: &[ToolTypeConfig],
    proxies: &[ToolProxyConfig],
) -> Result<(), ConfigError> {
    if types.len() > MAX_TOOL_ENTRIES {
        return Err(ConfigError::Invalid("too many tool_types entries".to_string()));
    }
    let mut seen = BTreeSet::new();
    for entry in types {
        validate_tool_id("tool_types.id", entry.id.as_str())?;
        validate_secret("tool_types", entry.id.as_str(), &entry.secret)?;
        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate tool type: {}", entry.id)));
        }
        if entry.grade_synchronization > MAX_GRADE_SYNCHRONIZATION {
            return Err(ConfigError::Invalid(format!(
                "tool type {} grade_synchronization must be 0, 1, or 2",
                entry.id
            )));
        }
        if let Some(proxy_id) = &entry.tool_proxy_id
            && !proxies.iter().any(|proxy| &proxy.id == proxy_id)
        {
            return Err(ConfigError::Invalid(format!(
                "tool type {} references unknown tool proxy {proxy_id}",
                entry.id
            )));
        }
        if let Some(courses) = &entry.course_ids {
            if courses.len() > MAX_COURSE_ALLOWLIST {
                return Err(ConfigError::Invalid(format!(
                    "tool type {} course_ids too long",
                    entry.id
                )));
            }
            if courses.iter().any(ContextId::is_blank) {
                return Err(ConfigError::Invalid(format!(
                    "tool type {} course_ids must be non-empty",
                    entry.id
                )));
            }
        }
    }
    Ok(())
}

/// Validates a tool identifier.
fn validate_tool_id(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_TOOL_ID_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} too long")));
    }
    Ok(())
}

/// Validates a shared secret without echoing it.
fn validate_secret(section: &str, id: &str, secret: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{section} {id} secret must be non-empty")));
    }
    if secret.len() > MAX_SECRET_LENGTH {
        return Err(ConfigError::Invalid(format!("{section} {id} secret too long")));
    }
    if secret.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!(
            "{section} {id} secret must not contain whitespace"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default resource path prefix.
fn default_path_prefix() -> String {
    "/lti/services".to_string()
}

/// Default maximum query string size.
const fn default_max_query_bytes() -> usize {
    4 * 1024
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Link headers are emitted unless disabled.
const fn default_emit_link_header() -> bool {
    true
}

/// Default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}
