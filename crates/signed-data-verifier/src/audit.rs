// crates/signed-data-verifier/src/audit.rs
// ============================================================================
// Module: Verification Audit Logging
// Description: Structured audit events for signed-data verification.
// Purpose: Emit redacted audit logs without hard dependencies.
// Dependencies: signed-data-core, serde, serde_json
// ============================================================================

//! ## Overview
//! One JSON-line event is written per verification call. Events carry labels,
//! the failure detail, and a SHA-256 digest of the chain fingerprint; raw
//! certificates and claim values are never logged. Sinks swallow their own
//! I/O errors so auditing can never change a verification result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use signed_data_core::Environment;
use signed_data_core::HashDigest;
use signed_data_core::PayloadKind;
use signed_data_core::VerificationStatus;

use crate::cache::CacheDisposition;
use crate::telemetry::VerificationOutcome;
use crate::verifier::VerificationStage;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Verification audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Payload kind requested by the caller.
    pub kind: PayloadKind,
    /// Verification outcome.
    pub outcome: VerificationOutcome,
    /// Failure status when rejected.
    pub status: Option<VerificationStatus>,
    /// Failure detail when rejected.
    pub reason: Option<String>,
    /// Last stage reached before completion or rejection.
    pub stage: VerificationStage,
    /// Configured environment.
    pub environment: Environment,
    /// Whether online checks were enabled.
    pub online: bool,
    /// Cache participation.
    pub cache: CacheDisposition,
    /// Digest of the chain fingerprint when a chain was decoded.
    pub chain_digest: Option<HashDigest>,
}

/// Inputs for constructing a verification audit event.
#[derive(Debug, Clone)]
pub struct VerificationAuditEventParams {
    /// Payload kind requested by the caller.
    pub kind: PayloadKind,
    /// Verification outcome.
    pub outcome: VerificationOutcome,
    /// Failure status when rejected.
    pub status: Option<VerificationStatus>,
    /// Failure detail when rejected.
    pub reason: Option<String>,
    /// Last stage reached.
    pub stage: VerificationStage,
    /// Configured environment.
    pub environment: Environment,
    /// Whether online checks were enabled.
    pub online: bool,
    /// Cache participation.
    pub cache: CacheDisposition,
    /// Digest of the chain fingerprint.
    pub chain_digest: Option<HashDigest>,
}

impl VerificationAuditEvent {
    /// Builds an audit event stamped with the current time.
    #[must_use]
    pub fn new(params: VerificationAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "signed_data_verification",
            timestamp_ms,
            kind: params.kind,
            outcome: params.outcome,
            status: params.status,
            reason: params.reason,
            stage: params.stage,
            environment: params.environment,
            online: params.online,
            cache: params.cache,
            chain_digest: params.chain_digest,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for verification events.
pub trait VerificationAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &VerificationAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl VerificationAuditSink for StderrAuditSink {
    fn record(&self, event: &VerificationAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl VerificationAuditSink for FileAuditSink {
    fn record(&self, event: &VerificationAuditEvent) {
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

impl VerificationAuditSink for NoopAuditSink {
    fn record(&self, _event: &VerificationAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
