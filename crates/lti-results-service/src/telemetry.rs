// crates/lti-results-service/src/telemetry.rs
// ============================================================================
// Module: Results Telemetry
// Description: Request counters and latency hooks for the Results resource.
// Purpose: Expose a metrics seam without tying deployments to a backend.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The resource reports one [`ResultsMetricEvent`] per request, plus a latency
//! observation. Deployments plug in their own [`ResultsMetrics`]; the default
//! is [`NoopMetrics`]. Labels never carry credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Request outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsOutcome {
    /// Request served.
    Ok,
    /// Request rejected with a client error.
    Rejected,
    /// Request failed with a server error.
    Error,
}

impl ResultsOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }

    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        if status >= 500 {
            Self::Error
        } else if status >= 400 {
            Self::Rejected
        } else {
            Self::Ok
        }
    }
}

/// Results request metric event payload.
#[derive(Debug, Clone)]
pub struct ResultsMetricEvent {
    /// HTTP status returned.
    pub status: u16,
    /// Request outcome.
    pub outcome: ResultsOutcome,
    /// Authorization mode label when selected.
    pub auth_mode: Option<&'static str>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Number of results returned.
    pub result_count: usize,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for Results requests and latencies.
pub trait ResultsMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: ResultsMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: ResultsMetricEvent, latency: Duration);
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl ResultsMetrics for NoopMetrics {
    fn record_request(&self, _event: ResultsMetricEvent) {}

    fn record_latency(&self, _event: ResultsMetricEvent, _latency: Duration) {}
}
