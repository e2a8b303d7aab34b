// crates/lti-results-core/src/core/access.rs
// ============================================================================
// Module: Access Modes
// Description: Authorization mode selection and authenticated caller identity.
// Purpose: Keep the LTI 2 (tool proxy) and LTI 1.x (tool type) paths distinct.
// Dependencies: crate::core::identifiers
// ============================================================================

//! ## Overview
//! A request is authorized either as a tool proxy (LTI 2 registration) or as a
//! tool type (LTI 1.x), never both. [`AuthorizationMode`] is selected before
//! authentication from the presence of a `typeid` query parameter and also
//! decides the shape of generated URLs. [`ToolCaller`] is the identity that the
//! authorization check resolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ToolProxyId;
use crate::core::identifiers::TypeId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scoped action required to read the Results collection in LTI 1.x mode.
pub const RESULT_COLLECTION_GET: &str = "Result.collection:get";

// ============================================================================
// SECTION: Authorization Mode
// ============================================================================

/// Authorization path selected for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationMode {
    /// LTI 2: caller is checked as a registered tool proxy.
    ToolProxy,
    /// LTI 1.x: caller is checked as the given tool type.
    ToolType(TypeId),
}

impl AuthorizationMode {
    /// Selects the mode from an optional `typeid` query value.
    #[must_use]
    pub fn from_type_param(type_id: Option<&str>) -> Self {
        type_id.map_or(Self::ToolProxy, |value| Self::ToolType(TypeId::new(value)))
    }

    /// Returns the tool type when operating in LTI 1.x mode.
    #[must_use]
    pub const fn type_id(&self) -> Option<&TypeId> {
        match self {
            Self::ToolProxy => None,
            Self::ToolType(type_id) => Some(type_id),
        }
    }

    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ToolProxy => "tool_proxy",
            Self::ToolType(_) => "tool_type",
        }
    }
}

// ============================================================================
// SECTION: Caller Identity
// ============================================================================

/// Authenticated tool identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ToolCaller {
    /// A registered tool proxy.
    ToolProxy(ToolProxyId),
    /// A tool type deployment.
    ToolType(TypeId),
}

impl ToolCaller {
    /// Returns the caller identifier as a string slice.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::ToolProxy(id) => id.as_str(),
            Self::ToolType(id) => id.as_str(),
        }
    }
}
