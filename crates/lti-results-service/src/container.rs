// crates/lti-results-service/src/container.rs
// ============================================================================
// Module: Result Container Serialization
// Description: LIS result mapping and result container JSON bodies.
// Purpose: Turn a page of grade records into the Results wire format.
// Dependencies: lti-results-core, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! The response body is a result container: an object with a single
//! `results` array. Each element is produced by a [`GradeToJsonMapper`];
//! [`LisResultMapper`] is the default and emits LIS result objects with a
//! fixed key order. Ungraded records are dropped again here so no response
//! path can leak them. Graded records whose score is not a finite number, or
//! whose modification time is outside the representable range, fail the whole
//! container instead of being rendered as `null` or silently trimmed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use lti_results_core::AuthorizationMode;
use lti_results_core::GradeRecord;
use lti_results_core::GradeToJsonMapper;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::form_urlencoded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of the result container.
pub const RESULT_CONTAINER_MEDIA_TYPE: &str = "application/vnd.ims.lis.v1.resultcontainer+json";

/// JSON-LD type of a single result.
const LIS_RESULT_TYPE: &str = "LISResult";

// ============================================================================
// SECTION: Mapper
// ============================================================================

/// Maps grade records to LIS result objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct LisResultMapper;

impl GradeToJsonMapper for LisResultMapper {
    fn map(
        &self,
        grade: &GradeRecord,
        line_item_endpoint: &str,
        mode: &AuthorizationMode,
    ) -> Value {
        let suffix = type_query_suffix(mode);
        let mut result = Map::new();
        result.insert("@type".to_string(), Value::from(LIS_RESULT_TYPE));
        result.insert(
            "@id".to_string(),
            Value::from(format!("{line_item_endpoint}/results/{}{suffix}", grade.user_id)),
        );
        result.insert("resultOf".to_string(), Value::from(format!("{line_item_endpoint}{suffix}")));
        result.insert("resultAgent".to_string(), json!({ "userId": grade.user_id.as_str() }));
        if let Some(score) = grade.value {
            result.insert("resultScore".to_string(), json!(score));
            result.insert("resultMaximum".to_string(), json!(grade.grade_max));
            if let Some(comment) = grade.feedback.as_deref().filter(|text| !text.is_empty()) {
                result.insert("comment".to_string(), Value::from(comment));
            }
            if let Some(timestamp) = grade.time_modified.and_then(format_timestamp) {
                result.insert("timestamp".to_string(), Value::from(timestamp));
            }
        }
        Value::Object(result)
    }
}

/// Returns `?typeid=<id>` in tool type mode, empty otherwise.
fn type_query_suffix(mode: &AuthorizationMode) -> String {
    mode.type_id().map_or_else(String::new, |type_id| {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair("typeid", type_id.as_str())
            .finish();
        format!("?{encoded}")
    })
}

/// Formats unix seconds as an RFC 3339 UTC timestamp.
fn format_timestamp(seconds: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(seconds).ok()?.format(&Rfc3339).ok()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Result container rendering errors.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A graded record carries a NaN or infinite score or maximum.
    #[error("grade {grade_id} has a non-finite {field}")]
    NonFinite {
        /// Offending grade record.
        grade_id: u64,
        /// Field holding the non-finite value.
        field: &'static str,
    },
    /// A graded record carries a modification time outside the RFC 3339 range.
    #[error("grade {grade_id} has an unrepresentable timestamp {seconds}")]
    Timestamp {
        /// Offending grade record.
        grade_id: u64,
        /// Stored unix seconds.
        seconds: i64,
    },
    /// JSON rendering failed.
    #[error("result container encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Checks that a graded record renders without losing data.
fn validate_grade(grade: &GradeRecord) -> Result<(), ContainerError> {
    if let Some(score) = grade.value {
        let non_finite = if score.is_finite() {
            (!grade.grade_max.is_finite()).then_some("maximum")
        } else {
            Some("score")
        };
        if let Some(field) = non_finite {
            return Err(ContainerError::NonFinite {
                grade_id: grade.id,
                field,
            });
        }
    }
    if let Some(seconds) = grade.time_modified
        && format_timestamp(seconds).is_none()
    {
        return Err(ContainerError::Timestamp {
            grade_id: grade.id,
            seconds,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Serialization
// ============================================================================

/// Serializes graded records into a pretty-printed result container.
///
/// # Errors
///
/// Returns [`ContainerError`] when a graded record cannot be rendered
/// faithfully or the container cannot be encoded.
pub fn serialize_results(
    grades: &[GradeRecord],
    line_item_endpoint: &str,
    mode: &AuthorizationMode,
    mapper: &dyn GradeToJsonMapper,
) -> Result<String, ContainerError> {
    let mut results = Vec::new();
    for grade in grades.iter().filter(|grade| grade.is_graded()) {
        validate_grade(grade)?;
        results.push(mapper.map(grade, line_item_endpoint, mode));
    }
    let mut container = Map::new();
    container.insert("results".to_string(), Value::Array(results));
    Ok(serde_json::to_string_pretty(&Value::Object(container))?)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
