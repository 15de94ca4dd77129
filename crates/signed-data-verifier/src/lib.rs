// crates/signed-data-verifier/src/lib.rs
// ============================================================================
// Module: Signed Data Verifier Library
// Description: Verification engine for store-signed JWS payloads.
// Purpose: Expose the verifier, its collaborators, and observability seams.
// Dependencies: signed-data-core, signed-data-config, x509-parser, ring
// ============================================================================

//! ## Overview
//! `signed-data-verifier` decides whether a compact JWS produced by the store
//! is authentic and addressed to the configured app. A token is accepted only
//! when its embedded `x5c` chain terminates in a configured trust anchor, the
//! chain carries the store's marker extensions, revocation status is good
//! (online mode), the ES256 signature verifies under the leaf key, and the
//! decoded claims name the configured bundle, app, and environment.
//!
//! Every failure is terminal and typed; see
//! [`signed_data_core::VerificationStatus`].
//!
//! Security posture: tokens, certificates, and OCSP responses are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod anchors;
pub mod audit;
pub mod authorizer;
pub mod cache;
pub mod chain;
pub mod clock;
pub mod revocation;
pub mod telemetry;
pub mod token;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use anchors::TrustAnchorSet;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::VerificationAuditEvent;
pub use audit::VerificationAuditSink;
pub use authorizer::PayloadAuthorizer;
pub use cache::CacheDisposition;
pub use cache::ChainCache;
pub use cache::ChainFingerprint;
pub use chain::ChainValidator;
pub use chain::LeafKey;
pub use chain::X509ChainValidator;
pub use clock::Clock;
pub use clock::SystemClock;
pub use revocation::HttpOcspTransport;
pub use revocation::OcspRevocationChecker;
pub use revocation::OcspTransport;
pub use revocation::OcspTransportError;
pub use revocation::RevocationChecker;
pub use telemetry::NoopMetrics;
pub use telemetry::VerificationMetricEvent;
pub use telemetry::VerificationMetrics;
pub use telemetry::VerificationOutcome;
pub use token::DecodedToken;
pub use token::JwsHeader;
pub use verifier::SignedDataVerifier;
pub use verifier::SignedDataVerifierBuilder;
pub use verifier::VerifierBuildError;
pub use verifier::VerificationStage;
