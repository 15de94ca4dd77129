// crates/signed-data-verifier/src/verifier.rs
// ============================================================================
// Module: Signed Data Verifier
// Description: Orchestrates decoding, chain resolution, signature, and
//              authorization for each payload kind.
// Purpose: Single entry point that either returns a trusted payload or a
//          typed rejection.
// Dependencies: signed-data-config, signed-data-core, crate collaborators
// ============================================================================

//! ## Overview
//! Every call walks the same stages:
//!
//! `Received → HeaderDecoded → ChainResolved → SignatureVerified → Authorized → Decoded`
//!
//! and stops at the first failure. Nothing is retried. Exactly one audit
//! event and one metric event are emitted per call, after the outcome is
//! known.
//!
//! The effective validation date is the verifier clock in online mode. In
//! offline mode it is the token's `signedDate` (or `receiptCreationDate`)
//! claim, read from the still-unverified claims, falling back to the clock.
//! The chain cache is consulted only in online mode.
//!
//! `LocalTesting` gets no special treatment: such tokens must still carry a
//! chain rooted in a configured anchor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use signed_data_config::AuditConfig;
use signed_data_config::AuditSinkKind;
use signed_data_config::ConfigError;
use signed_data_config::VerifierConfig;
use signed_data_core::Environment;
use signed_data_core::HashDigest;
use signed_data_core::NotificationBodyError;
use signed_data_core::NotificationPayload;
use signed_data_core::PayloadKind;
use signed_data_core::RawNotificationPayload;
use signed_data_core::RenewalInfoPayload;
use signed_data_core::TransactionPayload;
use signed_data_core::VerificationError;
use thiserror::Error;
use time::OffsetDateTime;

use crate::anchors::TrustAnchorSet;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::audit::VerificationAuditEvent;
use crate::audit::VerificationAuditEventParams;
use crate::audit::VerificationAuditSink;
use crate::authorizer::PayloadAuthorizer;
use crate::cache::CacheDisposition;
use crate::cache::ChainCache;
use crate::cache::ChainFingerprint;
use crate::cache::DEFAULT_CACHE_MAX_ENTRIES;
use crate::cache::DEFAULT_CACHE_TTL;
use crate::chain::ChainValidator;
use crate::chain::LeafKey;
use crate::chain::X509ChainValidator;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::revocation::HttpOcspTransport;
use crate::revocation::OcspRevocationChecker;
use crate::revocation::OcspTransportError;
use crate::revocation::RevocationChecker;
use crate::telemetry::NoopMetrics;
use crate::telemetry::VerificationMetricEvent;
use crate::telemetry::VerificationMetrics;
use crate::telemetry::VerificationOutcome;
use crate::token;
use crate::token::DecodedToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Claim preferred for the offline effective date.
const SIGNED_DATE_CLAIM: &str = "signedDate";
/// Fallback claim for the offline effective date.
const RECEIPT_CREATION_DATE_CLAIM: &str = "receiptCreationDate";
/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i128 = 1_000_000;

// ============================================================================
// SECTION: Stages
// ============================================================================

/// Progress of a single verification call.
///
/// # Invariants
/// - Stages only advance; a rejection reports the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStage {
    /// Token accepted for processing.
    Received,
    /// Header parsed and algorithm accepted.
    HeaderDecoded,
    /// Leaf key resolved from the cache or the chain validator.
    ChainResolved,
    /// Signature verified and claims deserialized.
    SignatureVerified,
    /// Identity checks passed.
    Authorized,
    /// Payload handed back to the caller.
    Decoded,
}

impl VerificationStage {
    /// Returns a stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::HeaderDecoded => "header_decoded",
            Self::ChainResolved => "chain_resolved",
            Self::SignatureVerified => "signature_verified",
            Self::Authorized => "authorized",
            Self::Decoded => "decoded",
        }
    }
}

/// Bookkeeping for one call.
struct Attempt {
    /// Last stage reached.
    stage: VerificationStage,
    /// Cache participation.
    cache: CacheDisposition,
    /// Digest of the chain fingerprint, once the chain is known.
    chain_digest: Option<HashDigest>,
}

impl Attempt {
    /// Starts a fresh attempt.
    const fn new() -> Self {
        Self {
            stage: VerificationStage::Received,
            cache: CacheDisposition::Bypass,
            chain_digest: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while constructing a verifier.
#[derive(Debug, Error)]
pub enum VerifierBuildError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A configured root certificate is unusable.
    #[error("invalid trust anchors: {0}")]
    TrustAnchors(VerificationError),
    /// The OCSP transport could not be built.
    #[error(transparent)]
    Transport(#[from] OcspTransportError),
    /// The audit sink could not be opened.
    #[error("audit sink unavailable: {0}")]
    Audit(String),
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`SignedDataVerifier`] with injectable collaborators.
pub struct SignedDataVerifierBuilder {
    /// Validated-on-build configuration.
    config: VerifierConfig,
    /// Replacement chain validator.
    validator: Option<Arc<dyn ChainValidator>>,
    /// Replacement revocation checker (online mode only).
    revocation: Option<Arc<dyn RevocationChecker>>,
    /// Replacement clock.
    clock: Option<Arc<dyn Clock>>,
    /// Replacement audit sink.
    audit: Option<Arc<dyn VerificationAuditSink>>,
    /// Replacement metrics sink.
    metrics: Option<Arc<dyn VerificationMetrics>>,
    /// Cache capacity.
    cache_max_entries: usize,
    /// Cache entry lifetime.
    cache_ttl: Duration,
}

impl SignedDataVerifierBuilder {
    /// Starts a builder from configuration.
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            validator: None,
            revocation: None,
            clock: None,
            audit: None,
            metrics: None,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Replaces the X.509 chain validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ChainValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Replaces the OCSP revocation checker used in online mode.
    #[must_use]
    pub fn with_revocation_checker(mut self, checker: Arc<dyn RevocationChecker>) -> Self {
        self.revocation = Some(checker);
        self
    }

    /// Replaces the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces the configured audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn VerificationAuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Installs a metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn VerificationMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Overrides cache capacity and entry lifetime.
    #[must_use]
    pub fn with_cache_limits(mut self, max_entries: usize, ttl: Duration) -> Self {
        self.cache_max_entries = max_entries;
        self.cache_ttl = ttl;
        self
    }

    /// Validates configuration and assembles the verifier.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierBuildError`] when configuration is invalid, a root
    /// certificate does not parse, or a configured sink cannot be opened.
    pub fn build(self) -> Result<SignedDataVerifier, VerifierBuildError> {
        self.config.validate()?;
        let anchors = TrustAnchorSet::from_der(self.config.root_certificates.clone())
            .map_err(VerifierBuildError::TrustAnchors)?;
        let online = self.config.enable_online_checks;

        let validator: Arc<dyn ChainValidator> = match self.validator {
            Some(validator) => validator,
            None => {
                let revocation = if online {
                    match self.revocation {
                        Some(checker) => Some(checker),
                        None => {
                            let transport = HttpOcspTransport::new(&self.config.ocsp)?;
                            Some(Arc::new(OcspRevocationChecker::new(Arc::new(transport)))
                                as Arc<dyn RevocationChecker>)
                        }
                    }
                } else {
                    None
                };
                Arc::new(X509ChainValidator::new(anchors, revocation))
            }
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let audit = match self.audit {
            Some(sink) => sink,
            None => build_audit_sink(&self.config.audit)?,
        };

        Ok(SignedDataVerifier {
            environment: self.config.environment,
            online,
            authorizer: PayloadAuthorizer::new(
                self.config.bundle_id,
                self.config.app_apple_id,
                self.config.environment,
            ),
            validator,
            cache: ChainCache::new(self.cache_max_entries, self.cache_ttl, Arc::clone(&clock)),
            clock,
            audit,
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoopMetrics)),
        })
    }
}

/// Builds the audit sink named by configuration.
fn build_audit_sink(
    config: &AuditConfig,
) -> Result<Arc<dyn VerificationAuditSink>, VerifierBuildError> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                VerifierBuildError::Audit("file sink requires a path".to_string())
            })?;
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| VerifierBuildError::Audit(err.to_string()))?;
            Ok(Arc::new(sink))
        }
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifies and decodes store-signed payloads.
///
/// # Invariants
/// - Shareable across threads; the chain cache is the only mutable state.
/// - A payload is returned only after chain, signature, and identity checks
///   all pass.
pub struct SignedDataVerifier {
    /// Configured environment.
    environment: Environment,
    /// Whether revocation checks and the cache are active.
    online: bool,
    /// Identity checks.
    authorizer: PayloadAuthorizer,
    /// Chain validator.
    validator: Arc<dyn ChainValidator>,
    /// Validated-chain cache.
    cache: ChainCache,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Audit sink.
    audit: Arc<dyn VerificationAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn VerificationMetrics>,
}

impl SignedDataVerifier {
    /// Builds a verifier from configuration with default collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierBuildError`] when construction fails.
    pub fn new(config: VerifierConfig) -> Result<Self, VerifierBuildError> {
        SignedDataVerifierBuilder::new(config).build()
    }

    /// Starts a builder for injecting collaborators.
    #[must_use]
    pub fn builder(config: VerifierConfig) -> SignedDataVerifierBuilder {
        SignedDataVerifierBuilder::new(config)
    }

    /// Returns the configured environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns true when revocation checks and chain caching are enabled.
    #[must_use]
    pub const fn online_checks_enabled(&self) -> bool {
        self.online
    }

    /// Returns the chain cache.
    #[must_use]
    pub const fn cache(&self) -> &ChainCache {
        &self.cache
    }

    /// Verifies a signed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] describing the first failed check.
    pub fn verify_and_decode_transaction(
        &self,
        token: &str,
    ) -> Result<TransactionPayload, VerificationError> {
        self.verify(PayloadKind::Transaction, token, |payload: TransactionPayload| {
            self.authorizer.authorize_transaction(&payload)?;
            Ok(payload)
        })
    }

    /// Verifies signed subscription renewal info.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] describing the first failed check.
    pub fn verify_and_decode_renewal_info(
        &self,
        token: &str,
    ) -> Result<RenewalInfoPayload, VerificationError> {
        self.verify(PayloadKind::RenewalInfo, token, |payload: RenewalInfoPayload| {
            self.authorizer.authorize_renewal_info(&payload)?;
            Ok(payload)
        })
    }

    /// Verifies a signed server notification.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::NoUsablePayloadData`] when no body record
    /// is present, [`VerificationError::MalformedToken`] when several are, and
    /// otherwise the first failed check.
    pub fn verify_and_decode_notification(
        &self,
        token: &str,
    ) -> Result<NotificationPayload, VerificationError> {
        self.verify(PayloadKind::Notification, token, |raw: RawNotificationPayload| {
            let payload = NotificationPayload::try_from(raw).map_err(|err| match err {
                NotificationBodyError::Missing => VerificationError::NoUsablePayloadData,
                NotificationBodyError::Ambiguous(_) => {
                    VerificationError::MalformedToken(err.to_string())
                }
            })?;
            self.authorizer.authorize_notification(&payload)?;
            Ok(payload)
        })
    }

    /// Runs the stage pipeline and records the outcome.
    fn verify<W, T, F>(
        &self,
        kind: PayloadKind,
        token: &str,
        accept: F,
    ) -> Result<T, VerificationError>
    where
        W: DeserializeOwned,
        F: FnOnce(W) -> Result<T, VerificationError>,
    {
        let started = Instant::now();
        let mut attempt = Attempt::new();
        let result = self.run(token, &mut attempt, accept);
        if result.is_ok() {
            attempt.stage = VerificationStage::Decoded;
        }
        self.record(kind, &attempt, result.as_ref().err(), started);
        result
    }

    /// Advances through the stages, stopping at the first failure.
    fn run<W, T, F>(
        &self,
        token: &str,
        attempt: &mut Attempt,
        accept: F,
    ) -> Result<T, VerificationError>
    where
        W: DeserializeOwned,
        F: FnOnce(W) -> Result<T, VerificationError>,
    {
        let wire: W = token::decode_and_verify(token, |decoded| {
            attempt.stage = VerificationStage::HeaderDecoded;
            let chain = decoded.header.certificate_chain()?;
            let effective_date = self.effective_date(decoded);
            let key = self.resolve_key(chain, effective_date, attempt)?;
            attempt.stage = VerificationStage::ChainResolved;
            Ok(key)
        })?;
        attempt.stage = VerificationStage::SignatureVerified;
        let payload = accept(wire)?;
        attempt.stage = VerificationStage::Authorized;
        Ok(payload)
    }

    /// Picks the instant certificates must be valid at.
    fn effective_date(&self, decoded: &DecodedToken<'_>) -> OffsetDateTime {
        let now = self.clock.now();
        if self.online {
            return now;
        }
        decoded
            .claim(SIGNED_DATE_CLAIM)
            .or_else(|| decoded.claim(RECEIPT_CREATION_DATE_CLAIM))
            .and_then(Value::as_f64)
            .and_then(instant_from_millis)
            .unwrap_or(now)
    }

    /// Resolves the leaf key through the cache (online) or the validator.
    fn resolve_key(
        &self,
        chain: &[String],
        effective_date: OffsetDateTime,
        attempt: &mut Attempt,
    ) -> Result<LeafKey, VerificationError> {
        let fingerprint = ChainFingerprint::from_chain(chain);
        attempt.chain_digest = Some(fingerprint.digest());
        if !self.online {
            return self.validator.verify_chain(chain, effective_date);
        }
        if let Some(key) = self.cache.get_if_present(&fingerprint) {
            attempt.cache = CacheDisposition::Hit;
            return Ok(key);
        }
        attempt.cache = CacheDisposition::Miss;
        let key = self.validator.verify_chain(chain, effective_date)?;
        self.cache.put(fingerprint, key.clone());
        Ok(key)
    }

    /// Emits the audit and metric events for a finished call.
    fn record(
        &self,
        kind: PayloadKind,
        attempt: &Attempt,
        failure: Option<&VerificationError>,
        started: Instant,
    ) {
        let outcome = if failure.is_some() {
            VerificationOutcome::Rejected
        } else {
            VerificationOutcome::Verified
        };
        let status = failure.map(VerificationError::status);
        self.audit.record(&VerificationAuditEvent::new(VerificationAuditEventParams {
            kind,
            outcome,
            status,
            reason: failure.map(ToString::to_string),
            stage: attempt.stage,
            environment: self.environment,
            online: self.online,
            cache: attempt.cache,
            chain_digest: attempt.chain_digest.clone(),
        }));
        let event = VerificationMetricEvent {
            kind,
            outcome,
            status,
            cache: attempt.cache,
        };
        self.metrics.record_verification(event.clone());
        self.metrics.record_latency(event, started.elapsed());
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a millisecond date claim, truncating any fraction.
fn instant_from_millis(millis: f64) -> Option<OffsetDateTime> {
    if !millis.is_finite() {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Float-to-int casts saturate; out-of-range dates fail the conversion below."
    )]
    let whole = millis.trunc() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(whole.checked_mul(NANOS_PER_MILLI)?).ok()
}
