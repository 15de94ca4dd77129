// crates/signed-data-verifier/src/telemetry.rs
// ============================================================================
// Module: Verification Telemetry
// Description: Metric hooks for verification outcomes and latency.
// Purpose: Provide counters and latency buckets without hard dependencies.
// Dependencies: signed-data-core
// ============================================================================

//! ## Overview
//! A thin metrics interface so deployments can route verification counters
//! and latency histograms to Prometheus or OpenTelemetry. Labels are closed
//! vocabularies; claim values and certificates never reach a metric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;
use signed_data_core::PayloadKind;
use signed_data_core::VerificationStatus;

use crate::cache::CacheDisposition;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for verification histograms.
pub const VERIFICATION_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Verification outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Payload verified, authorized, and decoded.
    Verified,
    /// Payload rejected.
    Rejected,
}

impl VerificationOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

/// Verification metric event payload.
///
/// # Invariants
/// - `status` is `None` exactly when `outcome` is `Verified`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationMetricEvent {
    /// Payload kind requested by the caller.
    pub kind: PayloadKind,
    /// Outcome classification.
    pub outcome: VerificationOutcome,
    /// Failure status when rejected.
    pub status: Option<VerificationStatus>,
    /// Cache participation.
    pub cache: CacheDisposition,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for verification calls.
pub trait VerificationMetrics: Send + Sync {
    /// Records a counter event.
    fn record_verification(&self, event: VerificationMetricEvent);
    /// Records a latency observation for the call.
    fn record_latency(&self, event: VerificationMetricEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl VerificationMetrics for NoopMetrics {
    fn record_verification(&self, _event: VerificationMetricEvent) {}

    fn record_latency(&self, _event: VerificationMetricEvent, _latency: Duration) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::VERIFICATION_LATENCY_BUCKETS_MS;

    #[test]
    fn latency_buckets_ascend_to_thirty_seconds() {
        assert!(VERIFICATION_LATENCY_BUCKETS_MS.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(VERIFICATION_LATENCY_BUCKETS_MS.first(), Some(&1));
        assert_eq!(VERIFICATION_LATENCY_BUCKETS_MS.last(), Some(&30_000));
    }
}
