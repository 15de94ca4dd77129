// crates/signed-data-verifier/tests/ocsp_revocation.rs
// ============================================================================
// Module: OCSP Revocation Tests
// Description: Online verification against local OCSP responders.
// Purpose: Ensure only confirmed-good chains pass in online mode.
// Dependencies: signed-data-verifier, tiny_http, x509-ocsp, rcgen
// ============================================================================

//! ## Overview
//! Each test binds one or more `tiny_http` responders, mints a chain whose
//! Authority Information Access names them, and drives an online verifier
//! with the real HTTP transport. Responders decode the request, pick the CA
//! whose key hash matches, and answer with a signed basic response.
//!
//! Security posture: responder replies are untrusted; forged and unusable
//! replies must never admit a chain.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use der::Decode;
use der::Encode;
use der::asn1::BitString;
use der::asn1::GeneralizedTime;
use der::asn1::Null;
use der::asn1::ObjectIdentifier;
use der::asn1::OctetString;
use sha1::Digest;
use sha1::Sha1;
use signed_data_core::VerificationError;
use signed_data_core::VerificationStatus;
use signed_data_verifier::RevocationChecker;
use signed_data_verifier::SignedDataVerifier;
use time::OffsetDateTime;
use tiny_http::Response;
use tiny_http::Server;
use x509_cert::Certificate;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_ocsp::BasicOcspResponse;
use x509_ocsp::CertStatus;
use x509_ocsp::OcspGeneralizedTime;
use x509_ocsp::OcspRequest;
use x509_ocsp::OcspResponse;
use x509_ocsp::OcspResponseStatus;
use x509_ocsp::ResponderId;
use x509_ocsp::ResponseBytes;
use x509_ocsp::ResponseData;
use x509_ocsp::RevokedInfo;
use x509_ocsp::SingleResponse;
use x509_ocsp::Version;

use crate::common::PkiOptions;
use crate::common::RecordingAuditSink;
use crate::common::TestCertificate;
use crate::common::TestPki;
use crate::common::sandbox_config;
use crate::common::transaction_claims;

// ============================================================================
// SECTION: Responder
// ============================================================================

/// `ecdsa-with-SHA256`.
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
/// `id-pkix-ocsp-basic`.
const BASIC_RESPONSE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.1");

/// Certificate status a responder reports.
#[derive(Clone, Copy)]
enum Reported {
    /// `good`.
    Good,
    /// `unknown`.
    Unknown,
    /// `revoked`.
    Revoked,
}

/// How a responder answers.
#[derive(Clone, Copy)]
enum Behavior {
    /// Signed by the issuing CA with the given status.
    Answer(Reported),
    /// Signed `good` by a key unrelated to the chain.
    Forged,
    /// HTTP 500 with no body.
    ServerError,
}

/// A bound responder waiting for its chain.
struct Responder {
    /// Listening server.
    server: Server,
    /// URL to embed in certificates.
    url: String,
}

impl Responder {
    /// Binds a responder on an ephemeral loopback port.
    fn bind() -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        Self {
            server,
            url: format!("http://{addr}/ocsp"),
        }
    }

    /// Starts answering for `pki`; returns the request counter.
    fn serve(self, pki: &TestPki, behavior: Behavior) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let intermediate = pki.intermediate.clone();
        let root = pki.root.clone();
        let forger = TestPki::generate().root;
        thread::spawn(move || {
            for mut request in self.server.incoming_requests() {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);
                let response = match behavior {
                    Behavior::ServerError => Response::from_data(Vec::new()).with_status_code(500),
                    Behavior::Answer(reported) => Response::from_data(answer(
                        &body,
                        &intermediate,
                        &root,
                        None,
                        reported,
                    )),
                    Behavior::Forged => Response::from_data(answer(
                        &body,
                        &intermediate,
                        &root,
                        Some(&forger),
                        Reported::Good,
                    )),
                };
                let _ = request.respond(response);
            }
        });
        hits
    }
}

/// Builds a DER `OCSPResponse` for the single request in `request_der`.
fn answer(
    request_der: &[u8],
    intermediate: &TestCertificate,
    root: &TestCertificate,
    forger: Option<&TestCertificate>,
    reported: Reported,
) -> Vec<u8> {
    let request = OcspRequest::from_der(request_der).unwrap();
    let cert_id = request.tbs_request.request_list[0].req_cert.clone();
    let intermediate_key_hash = Sha1::digest(intermediate.public_point());
    let issuer = if cert_id.issuer_key_hash.as_bytes() == intermediate_key_hash.as_slice() {
        intermediate
    } else {
        root
    };
    let signer = forger.unwrap_or(issuer);
    let issuer_name = Certificate::from_der(&issuer.der).unwrap().tbs_certificate.subject;

    let cert_status = match reported {
        Reported::Good => CertStatus::Good(Null),
        Reported::Unknown => CertStatus::Unknown(Null),
        Reported::Revoked => CertStatus::Revoked(RevokedInfo {
            revocation_time: now(),
            revocation_reason: None,
        }),
    };
    let tbs = ResponseData {
        version: Version::V1,
        responder_id: ResponderId::ByName(issuer_name),
        produced_at: now(),
        responses: vec![SingleResponse {
            cert_id,
            cert_status,
            this_update: now(),
            next_update: None,
            single_extensions: None,
        }],
        response_extensions: None,
    };
    let signature = signer.sign_asn1(&tbs.to_der().unwrap());
    let basic = BasicOcspResponse {
        tbs_response_data: tbs,
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: ECDSA_WITH_SHA256,
            parameters: None,
        },
        signature: BitString::from_bytes(&signature).unwrap(),
        certs: None,
    };
    OcspResponse {
        response_status: OcspResponseStatus::Successful,
        response_bytes: Some(ResponseBytes {
            response_type: BASIC_RESPONSE,
            response: OctetString::new(basic.to_der().unwrap()).unwrap(),
        }),
    }
    .to_der()
    .unwrap()
}

/// Current time truncated to whole seconds.
fn now() -> OcspGeneralizedTime {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let time = GeneralizedTime::from_unix_duration(Duration::from_secs(secs)).unwrap();
    OcspGeneralizedTime::from(time)
}

/// URL on a loopback port nothing listens on.
fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/ocsp")
}

/// Online verifier using the real OCSP transport.
fn online_verifier(pki: &TestPki) -> SignedDataVerifier {
    SignedDataVerifier::builder(sandbox_config(pki, "com.example", true))
        .with_audit_sink(RecordingAuditSink::new())
        .build()
        .unwrap()
}

/// Chain whose leaf and intermediate name the given responders.
fn pki_with_responders(leaf: &[&str], intermediate: &[&str]) -> TestPki {
    TestPki::with_options(&PkiOptions {
        leaf_ocsp_urls: leaf.iter().map(ToString::to_string).collect(),
        intermediate_ocsp_urls: intermediate.iter().map(ToString::to_string).collect(),
        ..PkiOptions::default()
    })
}

/// Verifies a fresh sandbox transaction token.
fn verify(
    verifier: &SignedDataVerifier,
    pki: &TestPki,
) -> Result<signed_data_core::TransactionPayload, VerificationError> {
    verifier.verify_and_decode_transaction(&pki.sign(&transaction_claims("com.example", "Sandbox")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn good_status_admits_chain_and_result_is_cached() {
    let responder = Responder::bind();
    let url = responder.url.clone();
    let pki = pki_with_responders(&[&url], &[&url]);
    let hits = responder.serve(&pki, Behavior::Answer(Reported::Good));
    let verifier = online_verifier(&pki);

    verify(&verifier, &pki).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    verify(&verifier, &pki).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn unknown_status_is_terminal() {
    let unknown = Responder::bind();
    let good = Responder::bind();
    let (unknown_url, good_url) = (unknown.url.clone(), good.url.clone());
    let pki = pki_with_responders(&[&unknown_url, &good_url], &[&good_url]);
    let unknown_hits = unknown.serve(&pki, Behavior::Answer(Reported::Unknown));
    let good_hits = good.serve(&pki, Behavior::Answer(Reported::Good));
    let verifier = online_verifier(&pki);

    let err = verify(&verifier, &pki).unwrap_err();
    assert_eq!(err.status(), VerificationStatus::RevocationFailure);
    assert_eq!(err, VerificationError::Revocation("certificate status is unknown".to_string()));
    assert_eq!(unknown_hits.load(Ordering::SeqCst), 1);
    assert_eq!(good_hits.load(Ordering::SeqCst), 0);
    assert!(verifier.cache().is_empty());
}

#[test]
fn revoked_intermediate_is_rejected() {
    let good = Responder::bind();
    let revoked = Responder::bind();
    let (good_url, revoked_url) = (good.url.clone(), revoked.url.clone());
    let pki = pki_with_responders(&[&good_url], &[&revoked_url]);
    good.serve(&pki, Behavior::Answer(Reported::Good));
    revoked.serve(&pki, Behavior::Answer(Reported::Revoked));

    let err = verify(&online_verifier(&pki), &pki).unwrap_err();
    assert_eq!(err, VerificationError::Revocation("certificate status is revoked".to_string()));
}

#[test]
fn failing_responders_fall_through_to_the_next() {
    let failing = Responder::bind();
    let good = Responder::bind();
    let (failing_url, good_url) = (failing.url.clone(), good.url.clone());
    let dead_url = unreachable_url();
    let pki = pki_with_responders(&[&dead_url, &failing_url, &good_url], &[&good_url]);
    let failing_hits = failing.serve(&pki, Behavior::ServerError);
    let good_hits = good.serve(&pki, Behavior::Answer(Reported::Good));

    verify(&online_verifier(&pki), &pki).unwrap();
    assert_eq!(failing_hits.load(Ordering::SeqCst), 1);
    assert_eq!(good_hits.load(Ordering::SeqCst), 2);
}

#[test]
fn exhausted_responders_are_a_revocation_failure() {
    let failing = Responder::bind();
    let failing_url = failing.url.clone();
    let dead_url = unreachable_url();
    let pki = pki_with_responders(&[&failing_url, &dead_url], &[&failing_url]);
    failing.serve(&pki, Behavior::ServerError);

    let err = verify(&online_verifier(&pki), &pki).unwrap_err();
    assert_eq!(err.status(), VerificationStatus::RevocationFailure);
}

#[test]
fn forged_response_is_never_accepted() {
    let forged = Responder::bind();
    let url = forged.url.clone();
    let pki = pki_with_responders(&[&url], &[&url]);
    forged.serve(&pki, Behavior::Forged);

    let err = verify(&online_verifier(&pki), &pki).unwrap_err();
    assert_eq!(err.status(), VerificationStatus::RevocationFailure);
}

#[test]
fn certificate_without_responder_fails_online() {
    let pki = TestPki::generate();
    let err = verify(&online_verifier(&pki), &pki).unwrap_err();
    assert_eq!(
        err,
        VerificationError::Revocation("certificate names no OCSP responder".to_string())
    );
}

// ============================================================================
// SECTION: Mode Gating
// ============================================================================

/// Revocation checker that approves everything and counts calls.
#[derive(Default)]
struct CountingChecker {
    /// Calls observed.
    calls: AtomicUsize,
}

impl RevocationChecker for CountingChecker {
    fn check_revocation(
        &self,
        _subject_der: &[u8],
        _issuer_der: &[u8],
        _effective_date: OffsetDateTime,
    ) -> Result<(), VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn offline_mode_never_checks_revocation() {
    let pki = TestPki::generate();
    let checker = Arc::new(CountingChecker::default());
    let verifier = SignedDataVerifier::builder(sandbox_config(&pki, "com.example", false))
        .with_revocation_checker(checker.clone())
        .with_audit_sink(RecordingAuditSink::new())
        .build()
        .unwrap();

    verify(&verifier, &pki).unwrap();
    assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn online_mode_checks_leaf_and_intermediate() {
    let pki = TestPki::generate();
    let checker = Arc::new(CountingChecker::default());
    let verifier = SignedDataVerifier::builder(sandbox_config(&pki, "com.example", true))
        .with_revocation_checker(checker.clone())
        .with_audit_sink(RecordingAuditSink::new())
        .build()
        .unwrap();

    verify(&verifier, &pki).unwrap();
    assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
}
