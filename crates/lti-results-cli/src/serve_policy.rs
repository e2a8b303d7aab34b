// crates/lti-results-cli/src/serve_policy.rs
// ============================================================================
// Module: Serve Policy
// Description: Network exposure policy checks for the CLI server launcher.
// Purpose: Keep the results server on loopback unless exposure is opted into.
// Dependencies: lti-results-config, thiserror
// ============================================================================

//! ## Overview
//! Binding the results server to a non-loopback address serves grade data to
//! the network. The policy fails closed: the operator must opt in with
//! `--allow-non-loopback` or [`ALLOW_NON_LOOPBACK_ENV`].

use std::env;
use std::net::SocketAddr;

use lti_results_config::LtiResultsConfig;
use thiserror::Error;

/// Environment variable enabling non-loopback server binds.
pub const ALLOW_NON_LOOPBACK_ENV: &str = "LTI_RESULTS_ALLOW_NON_LOOPBACK";

/// Bind outcome metadata for startup warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    /// Socket address the server will bind.
    pub bind_addr: SocketAddr,
    /// True when the server is bound to a non-loopback address.
    pub network_exposed: bool,
    /// Whether audit logging is enabled.
    pub audit_enabled: bool,
}

/// Serve policy failures for bind safety.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServePolicyError {
    /// Environment variable was set to an invalid value.
    #[error("{env} must be a boolean, got '{value}'", env = ALLOW_NON_LOOPBACK_ENV)]
    InvalidEnv {
        /// Raw environment value.
        value: String,
    },
    /// Bind string failed to parse.
    #[error("invalid bind address '{bind}': {error}")]
    InvalidBind {
        /// Raw bind value.
        bind: String,
        /// Parse error message.
        error: String,
    },
    /// Non-loopback binding requires explicit opt-in.
    #[error(
        "refusing to bind non-loopback address {bind}; pass --allow-non-loopback or set {env}=1",
        env = ALLOW_NON_LOOPBACK_ENV
    )]
    NonLoopbackOptInRequired {
        /// Bind address.
        bind: String,
    },
}

/// Resolves the non-loopback opt-in flag from CLI and environment.
///
/// # Errors
/// Returns [`ServePolicyError::InvalidEnv`] when the environment value is invalid.
pub fn resolve_allow_non_loopback(flag: bool) -> Result<bool, ServePolicyError> {
    if flag {
        return Ok(true);
    }
    let Some(value) = env::var_os(ALLOW_NON_LOOPBACK_ENV) else {
        return Ok(false);
    };
    let value = value.to_string_lossy().to_string();
    parse_allow_non_loopback_value(&value)
}

/// Enforces the loopback-only default for the results server.
///
/// # Errors
/// Returns [`ServePolicyError`] when the bind address is invalid or exposes
/// the server without opt-in.
pub fn enforce_local_only(
    config: &LtiResultsConfig,
    allow_non_loopback: bool,
) -> Result<BindOutcome, ServePolicyError> {
    let bind = config.server.bind.trim();
    let addr: SocketAddr =
        bind.parse().map_err(|err: std::net::AddrParseError| ServePolicyError::InvalidBind {
            bind: bind.to_string(),
            error: err.to_string(),
        })?;
    let network_exposed = !addr.ip().is_loopback();
    if network_exposed && !allow_non_loopback {
        return Err(ServePolicyError::NonLoopbackOptInRequired {
            bind: bind.to_string(),
        });
    }
    Ok(BindOutcome {
        bind_addr: addr,
        network_exposed,
        audit_enabled: config.server.audit.enabled,
    })
}

/// Parses a bool-ish string (true/false/1/0/yes/no/on/off).
fn parse_boolish(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parses an env value for allow-non-loopback.
fn parse_allow_non_loopback_value(value: &str) -> Result<bool, ServePolicyError> {
    parse_boolish(value).ok_or_else(|| ServePolicyError::InvalidEnv {
        value: value.to_string(),
    })
}
