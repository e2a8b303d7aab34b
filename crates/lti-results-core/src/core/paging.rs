// crates/lti-results-core/src/core/paging.rs
// ============================================================================
// Module: Results Paging
// Description: Offset/limit slicing and RFC 5988 style navigation links.
// Purpose: Page the graded subset of a line item's results deterministically.
// Dependencies: thiserror, url, crate::core::{access, gradebook}
// ============================================================================

//! ## Overview
//! Paging operates on the *graded* subset of a line item's records: ungraded
//! rows are filtered first so offsets index a stable, store-ordered sequence.
//! A zero `limit` means unpaged. For paged requests the engine computes a
//! [`PageWindow`] (previous, next, and last offsets plus an out-of-range flag)
//! and [`PageLinks`] renders the five navigation URLs from it.
//!
//! The boundary arithmetic is fixed:
//! - `last = max(total - limit + 1, 0)`
//! - `prev = max(offset - limit, 0)`, present only when `offset > 0`
//! - `next = offset + limit`, present only when `next <= total - 1`
//! - out-of-range (`offset >= total`) suppresses prev and next but keeps
//!   first, canonical, and last.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use url::form_urlencoded;

use crate::core::access::AuthorizationMode;
use crate::core::gradebook::GradeRecord;

// ============================================================================
// SECTION: Page Request
// ============================================================================

/// Validated paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    /// Page size; zero disables paging.
    pub limit: usize,
    /// Zero-based offset into the graded result set.
    pub offset: usize,
}

impl PageRequest {
    /// Returns a request for the full, unpaged result set.
    #[must_use]
    pub const fn unpaged() -> Self {
        Self {
            limit: 0,
            offset: 0,
        }
    }

    /// Returns a paged request.
    #[must_use]
    pub const fn paged(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
        }
    }

    /// Returns true when a page size was requested.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.limit > 0
    }
}

/// Paging parameter validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagingError {
    /// `limit` is not a positive integer.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// `from` is not a non-negative integer.
    #[error("invalid from: {0}")]
    InvalidFrom(String),
    /// `from` was supplied without a `limit`.
    #[error("from requires limit")]
    FromWithoutLimit,
}

/// Validates raw `limit` and `from` query values.
///
/// `limit` must be a positive integer when present. `from` is validated
/// jointly with `limit`: it requires a limit and must be a non-negative
/// integer. Absent values default to an unpaged request starting at zero.
///
/// # Errors
///
/// Returns [`PagingError`] when either value is malformed.
pub fn validate_paging_query_parameters(
    limit: Option<&str>,
    from: Option<&str>,
) -> Result<PageRequest, PagingError> {
    let limit = match limit {
        Some(raw) => {
            let parsed = parse_unsigned(raw)
                .filter(|value| *value > 0)
                .ok_or_else(|| PagingError::InvalidLimit(raw.to_string()))?;
            Some(parsed)
        }
        None => None,
    };
    let offset = match from {
        Some(raw) => {
            if limit.is_none() {
                return Err(PagingError::FromWithoutLimit);
            }
            parse_unsigned(raw).ok_or_else(|| PagingError::InvalidFrom(raw.to_string()))?
        }
        None => 0,
    };
    Ok(PageRequest::paged(limit.unwrap_or(0), offset))
}

/// Parses a decimal, unsigned integer with surrounding whitespace allowed.
fn parse_unsigned(raw: &str) -> Option<usize> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<usize>().ok()
}

// ============================================================================
// SECTION: Page Window
// ============================================================================

/// Offsets derived for a paged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Page size.
    pub limit: usize,
    /// Requested offset (canonical page).
    pub offset: usize,
    /// True when `offset` does not address any graded record.
    pub out_of_range: bool,
    /// Offset of the previous page, when one is linked.
    pub prev_offset: Option<usize>,
    /// Offset of the next page, when one is linked.
    pub next_offset: Option<usize>,
    /// Offset of the last page.
    pub last_offset: usize,
}

impl PageWindow {
    /// Computes the window for a graded total, page size, and offset.
    #[must_use]
    pub const fn compute(total_count: usize, limit: usize, offset: usize) -> Self {
        let out_of_range = offset >= total_count;
        let prev_offset = if offset > 0 && !out_of_range {
            Some(offset.saturating_sub(limit))
        } else {
            None
        };
        let candidate = offset.saturating_add(limit);
        let next_offset =
            if candidate < total_count && !out_of_range { Some(candidate) } else { None };
        let last_offset = (total_count + 1).saturating_sub(limit);
        Self {
            limit,
            offset,
            out_of_range,
            prev_offset,
            next_offset,
            last_offset,
        }
    }
}

// ============================================================================
// SECTION: Pagination
// ============================================================================

/// A page of graded results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records on this page, in store order.
    pub items: Vec<GradeRecord>,
    /// Number of graded records across all pages.
    pub total_count: usize,
    /// Navigation window; `None` for unpaged requests or an empty graded set.
    pub window: Option<PageWindow>,
}

/// Filters ungraded records and slices the remainder.
#[must_use]
pub fn paginate(records: Vec<GradeRecord>, request: PageRequest) -> Page {
    let graded: Vec<GradeRecord> = records.into_iter().filter(GradeRecord::is_graded).collect();
    let total_count = graded.len();
    if !request.is_paged() {
        return Page {
            items: graded,
            total_count,
            window: None,
        };
    }
    let items: Vec<GradeRecord> =
        graded.into_iter().skip(request.offset).take(request.limit).collect();
    let window = if total_count == 0 {
        None
    } else {
        Some(PageWindow::compute(total_count, request.limit, request.offset))
    };
    Page {
        items,
        total_count,
        window,
    }
}

// ============================================================================
// SECTION: Navigation Links
// ============================================================================

/// Navigation URLs for a paged response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLinks {
    /// First page (`from=0`).
    pub first: String,
    /// Previous page.
    pub prev: Option<String>,
    /// The requested page.
    pub canonical: String,
    /// Next page.
    pub next: Option<String>,
    /// Last page.
    pub last: String,
}

impl PageLinks {
    /// Builds the links for a window against the resource endpoint.
    #[must_use]
    pub fn build(endpoint: &str, mode: &AuthorizationMode, window: &PageWindow) -> Self {
        let url = |from: usize| page_url(endpoint, mode, window.limit, from);
        Self {
            first: url(0),
            prev: window.prev_offset.map(url),
            canonical: url(window.offset),
            next: window.next_offset.map(url),
            last: url(window.last_offset),
        }
    }

    /// Renders the links as a `<url>; rel="..."` list.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut entries = Vec::with_capacity(5);
        entries.push(link_entry(&self.first, "first"));
        if let Some(prev) = &self.prev {
            entries.push(link_entry(prev, "prev"));
        }
        entries.push(link_entry(&self.canonical, "canonical"));
        if let Some(next) = &self.next {
            entries.push(link_entry(next, "next"));
        }
        entries.push(link_entry(&self.last, "last"));
        entries.join(", ")
    }
}

/// Builds a page URL with `typeid` (1.x only), `limit`, and `from` in order.
fn page_url(endpoint: &str, mode: &AuthorizationMode, limit: usize, from: usize) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(type_id) = mode.type_id() {
        query.append_pair("typeid", type_id.as_str());
    }
    query.append_pair("limit", &limit.to_string());
    query.append_pair("from", &from.to_string());
    format!("{endpoint}?{}", query.finish())
}

/// Formats a single link relation.
fn link_entry(url: &str, rel: &str) -> String {
    format!("<{url}>; rel=\"{rel}\"")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::parse_unsigned;

    #[test]
    fn parse_unsigned_rejects_signs_and_fractions() {
        assert_eq!(parse_unsigned("-1"), None);
        assert_eq!(parse_unsigned("+1"), None);
        assert_eq!(parse_unsigned("1.5"), None);
        assert_eq!(parse_unsigned(""), None);
        assert_eq!(parse_unsigned(" 12 "), Some(12));
    }
}
