// crates/signed-data-verifier/src/revocation/mod.rs
// ============================================================================
// Module: Revocation Checker
// Description: OCSP status confirmation for chain certificates.
// Purpose: Reject chains whose leaf or intermediate is not confirmed good.
// Dependencies: x509-parser, x509-ocsp, reqwest, signed-data-core
// ============================================================================

//! ## Overview
//! In online mode every accepted chain needs a good OCSP status for the leaf
//! (issued by the intermediate) and the intermediate (issued by the root).
//! Responders come from the subject's Authority Information Access extension
//! and are tried in order:
//!
//! - transport failures, non-200 replies, and unusable or unverifiable
//!   responses move on to the next responder;
//! - a verified response with a status other than good is terminal;
//! - running out of responders is terminal.
//!
//! No call is made when online checks are disabled.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod http;
mod ocsp;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use signed_data_core::VerificationError;
use time::OffsetDateTime;
use x509_parser::prelude::FromDer;
use x509_parser::prelude::X509Certificate;

pub use self::http::HttpOcspTransport;
pub use self::http::OcspTransport;
pub use self::http::OcspTransportError;
use self::ocsp::ResponseVerdict;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of responders tried per certificate.
pub const MAX_OCSP_RESPONDERS: usize = 4;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Confirms that a certificate has not been revoked.
pub trait RevocationChecker: Send + Sync {
    /// Checks `subject_der` (issued by `issuer_der`) at `effective_date`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Revocation`] unless status is confirmed good.
    fn check_revocation(
        &self,
        subject_der: &[u8],
        issuer_der: &[u8],
        effective_date: OffsetDateTime,
    ) -> Result<(), VerificationError>;
}

// ============================================================================
// SECTION: OCSP Checker
// ============================================================================

/// OCSP-backed revocation checker.
pub struct OcspRevocationChecker {
    /// Transport used to reach responders.
    transport: Arc<dyn OcspTransport>,
}

impl OcspRevocationChecker {
    /// Creates a checker using `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn OcspTransport>) -> Self {
        Self {
            transport,
        }
    }
}

impl RevocationChecker for OcspRevocationChecker {
    fn check_revocation(
        &self,
        subject_der: &[u8],
        issuer_der: &[u8],
        effective_date: OffsetDateTime,
    ) -> Result<(), VerificationError> {
        let subject = parse(subject_der, "subject")?;
        let issuer = parse(issuer_der, "issuer")?;
        let responders = ocsp::responder_urls(&subject);
        if responders.is_empty() {
            return Err(revocation("certificate names no OCSP responder"));
        }
        let cert_id = ocsp::cert_id(&subject, &issuer)
            .map_err(|err| revocation(&format!("cannot build OCSP cert id: {err}")))?;
        let request = ocsp::encode_request(&cert_id)
            .map_err(|err| revocation(&format!("cannot encode OCSP request: {err}")))?;

        let at = effective_date.unix_timestamp();
        let mut last_failure = String::from("no OCSP responder was reachable");
        for url in responders.iter().take(MAX_OCSP_RESPONDERS) {
            let body = match self.transport.post(url, &request) {
                Ok(body) => body,
                Err(err) => {
                    last_failure = err.to_string();
                    continue;
                }
            };
            match ocsp::evaluate_response(&body, &cert_id, &issuer, at) {
                Ok(ResponseVerdict::Good) => return Ok(()),
                Ok(ResponseVerdict::NotGood(status)) => {
                    return Err(revocation(&format!("certificate status is {status}")));
                }
                Err(err) => last_failure = err.to_string(),
            }
        }
        Err(revocation(&last_failure))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a certificate handed to the checker.
fn parse<'a>(der: &'a [u8], role: &str) -> Result<X509Certificate<'a>, VerificationError> {
    X509Certificate::from_der(der)
        .map(|(_, certificate)| certificate)
        .map_err(|err| revocation(&format!("cannot parse {role} certificate: {err}")))
}

/// Builds a revocation failure.
fn revocation(detail: &str) -> VerificationError {
    VerificationError::Revocation(detail.to_string())
}
