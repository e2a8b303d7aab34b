// crates/lti-results-service/src/audit.rs
// ============================================================================
// Module: Results Audit Logging
// Description: Structured audit events for Results collection requests.
// Purpose: Emit one JSON-line record per request without exposing secrets.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every request that reaches the resource produces exactly one
//! [`ResultsAuditEvent`], whether it succeeds or is rejected. Events carry the
//! credential fingerprint only. Sinks write JSON lines to stderr or to an
//! append-only file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Audit record for one Results collection request.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Timestamp (ms since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Peer IP address when known.
    pub peer_ip: Option<String>,
    /// HTTP method.
    pub method: String,
    /// Course (context) identifier from the path.
    pub context_id: Option<String>,
    /// Line item identifier from the path.
    pub item_id: Option<String>,
    /// Authorization mode label.
    pub auth_mode: Option<&'static str>,
    /// Authenticated caller identifier.
    pub caller: Option<String>,
    /// Credential fingerprint.
    pub token_fingerprint: Option<String>,
    /// HTTP status returned.
    pub status: u16,
    /// Outcome label.
    pub outcome: &'static str,
    /// Error kind label for rejected requests.
    pub error_kind: Option<&'static str>,
    /// Number of results returned.
    pub result_count: Option<usize>,
    /// Number of graded results available.
    pub total_count: Option<usize>,
}

/// Inputs for building a [`ResultsAuditEvent`].
pub struct ResultsAuditEventParams {
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Peer IP address when known.
    pub peer_ip: Option<String>,
    /// HTTP method.
    pub method: String,
    /// Course (context) identifier from the path.
    pub context_id: Option<String>,
    /// Line item identifier from the path.
    pub item_id: Option<String>,
    /// Authorization mode label.
    pub auth_mode: Option<&'static str>,
    /// Authenticated caller identifier.
    pub caller: Option<String>,
    /// Credential fingerprint.
    pub token_fingerprint: Option<String>,
    /// HTTP status returned.
    pub status: u16,
    /// Error kind label for rejected requests.
    pub error_kind: Option<&'static str>,
    /// Number of results returned.
    pub result_count: Option<usize>,
    /// Number of graded results available.
    pub total_count: Option<usize>,
}

impl ResultsAuditEvent {
    /// Creates a new audit event stamped with the current time.
    #[must_use]
    pub fn new(params: ResultsAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let outcome = if params.error_kind.is_some() { "rejected" } else { "ok" };
        Self {
            event: "results_request",
            timestamp_ms,
            request_id: params.request_id,
            peer_ip: params.peer_ip,
            method: params.method,
            context_id: params.context_id,
            item_id: params.item_id,
            auth_mode: params.auth_mode,
            caller: params.caller,
            token_fingerprint: params.token_fingerprint,
            status: params.status,
            outcome,
            error_kind: params.error_kind,
            result_count: params.result_count,
            total_count: params.total_count,
        }
    }
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Audit sink for Results requests.
pub trait ResultsAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &ResultsAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ResultsAuditSink for StderrAuditSink {
    fn record(&self, event: &ResultsAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// Shared file handle guarded for concurrent writes.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens an audit sink that appends to the provided path.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] when the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ResultsAuditSink for FileAuditSink {
    fn record(&self, event: &ResultsAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ResultsAuditSink for NoopAuditSink {
    fn record(&self, _event: &ResultsAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
