// crates/lti-results-core/src/core/identifiers.rs
// ============================================================================
// Module: LTI Results Identifiers
// Description: Opaque identifiers for courses, grade items, tools, and users.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers arrive as URL path segments or query parameters, so they are
//! carried as opaque strings. They serialize transparently. Validation (for
//! example, rejecting an empty context) happens at the resource boundary rather
//! than inside these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier with the standard conversions.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier!(
    /// Course (context) identifier taken from the `{context_id}` path segment.
    ContextId
);

string_identifier!(
    /// Grade item identifier taken from the `{item_id}` path segment.
    ItemId
);

string_identifier!(
    /// Tool type identifier for LTI 1.x deployments (`typeid` query parameter).
    TypeId
);

string_identifier!(
    /// Tool proxy identifier for LTI 2 registrations.
    ToolProxyId
);

string_identifier!(
    /// Tool placement (activity instance) identifier inside a course.
    InstanceId
);

string_identifier!(
    /// Learner identifier a grade belongs to.
    UserId
);

impl ContextId {
    /// Returns true when the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::ContextId;
    use super::TypeId;

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let encoded = serde_json::to_string(&TypeId::new("42")).unwrap_or_default();
        assert_eq!(encoded, "\"42\"");
    }

    #[test]
    fn blank_context_detects_whitespace() {
        assert!(ContextId::new("  ").is_blank());
        assert!(!ContextId::new("7").is_blank());
    }
}
