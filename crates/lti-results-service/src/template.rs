// crates/lti-results-service/src/template.rs
// ============================================================================
// Module: URI Templates
// Description: Path template matching and URL expansion for resources.
// Purpose: Resolve path parameters and build absolute resource endpoints.
// Dependencies: url, urlencoding
// ============================================================================

//! ## Overview
//! Resource paths are declared as simple level-1 templates such as
//! `/{context_id}/lineitems/{item_id}/results`. A variable covers exactly one
//! non-empty path segment. Matching percent-decodes each request segment
//! before comparing or capturing it; expansion percent-encodes variable values
//! as path segments under a base URL, so a parsed value expands back to the
//! same path. Segments that do not decode to UTF-8 never match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use url::Url;
use urlencoding::decode;

// ============================================================================
// SECTION: Resolver Trait
// ============================================================================

/// Resolves request paths against a template and expands it back into URLs.
pub trait TemplateResolver: Send + Sync {
    /// Returns the raw template string.
    fn template(&self) -> &str;

    /// Extracts variables from a path; `None` when the path does not match.
    fn parse(&self, path: &str) -> Option<BTreeMap<String, String>>;

    /// Expands the template under `base_url`; `None` when a variable is
    /// missing or the base URL cannot carry a path.
    fn expand(&self, base_url: &str, params: &BTreeMap<String, String>) -> Option<String>;
}

// ============================================================================
// SECTION: Uri Template
// ============================================================================

/// One template path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Fixed text.
    Literal(String),
    /// Named variable.
    Variable(String),
}

/// Level-1 path template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    /// Template as declared.
    raw: String,
    /// Parsed segments (leading slash dropped).
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Parses a template such as `/{context_id}/lineitems/{item_id}/results`.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        let raw = template.into();
        let segments = split_path(&raw)
            .map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                    .map_or_else(
                        || Segment::Literal(segment.to_string()),
                        |name| Segment::Variable(name.to_string()),
                    )
            })
            .collect();
        Self {
            raw,
            segments,
        }
    }

    /// Returns the variable names in declaration order.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Variable(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

impl TemplateResolver for UriTemplate {
    fn template(&self) -> &str {
        &self.raw
    }

    fn parse(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            let part = decode(part).ok()?;
            match segment {
                Segment::Literal(text) if *text == part => {}
                Segment::Literal(_) => return None,
                Segment::Variable(_) if part.is_empty() => return None,
                Segment::Variable(name) => {
                    params.insert(name.clone(), part.into_owned());
                }
            }
        }
        Some(params)
    }

    fn expand(&self, base_url: &str, params: &BTreeMap<String, String>) -> Option<String> {
        let mut url = Url::parse(base_url).ok()?;
        {
            let mut path = url.path_segments_mut().ok()?;
            path.pop_if_empty();
            for segment in &self.segments {
                match segment {
                    Segment::Literal(text) => {
                        path.push(text);
                    }
                    Segment::Variable(name) => {
                        path.push(params.get(name)?);
                    }
                }
            }
        }
        Some(url.to_string())
    }
}

/// Splits a path into segments after its leading slash.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
