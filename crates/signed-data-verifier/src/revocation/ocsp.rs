// crates/signed-data-verifier/src/revocation/ocsp.rs
// ============================================================================
// Module: OCSP Codec
// Description: Request construction and response evaluation for RFC 6960.
// Purpose: Turn a subject/issuer pair into a request and a reply into a verdict.
// Dependencies: der, x509-cert, x509-ocsp, x509-parser, sha1, ring
// ============================================================================

//! ## Overview
//! Requests carry a single SHA-1 `CertID`. Responses are accepted only when
//! they are `successful` basic responses signed by the issuer, or by a
//! delegated responder certificate that the issuer signed for OCSP signing.
//! Freshness fields (`thisUpdate`/`nextUpdate`) are not evaluated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use der::Decode;
use der::Encode;
use der::asn1::Any;
use der::asn1::Null;
use der::asn1::ObjectIdentifier;
use der::asn1::OctetString;
use ring::signature;
use ring::signature::UnparsedPublicKey;
use ring::signature::VerificationAlgorithm;
use sha1::Digest;
use sha1::Sha1;
use thiserror::Error;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_ocsp::BasicOcspResponse;
use x509_ocsp::CertId;
use x509_ocsp::CertStatus;
use x509_ocsp::OcspRequest;
use x509_ocsp::OcspResponse;
use x509_ocsp::OcspResponseStatus;
use x509_ocsp::Request;
use x509_ocsp::TbsRequest;
use x509_ocsp::Version;
use x509_parser::extensions::GeneralName;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::FromDer;
use x509_parser::prelude::X509Certificate;
use x509_parser::x509::SubjectPublicKeyInfo;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// SHA-1 digest algorithm used in `CertID`.
const SHA1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
/// Access method naming an OCSP responder in Authority Information Access.
const OCSP_ACCESS_METHOD_OID: &str = "1.3.6.1.5.5.7.48.1";
/// `id-pkix-ocsp-basic` response type.
const BASIC_RESPONSE_OID: &str = "1.3.6.1.5.5.7.48.1.1";
/// `ecdsa-with-SHA256`.
const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
/// `ecdsa-with-SHA384`.
const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
/// `sha256WithRSAEncryption`.
const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
/// `sha384WithRSAEncryption`.
const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
/// `sha512WithRSAEncryption`.
const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
/// Uncompressed P-256 point length.
const P256_POINT_LEN: usize = 65;
/// Uncompressed P-384 point length.
const P384_POINT_LEN: usize = 97;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Status carried by a verified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResponseVerdict {
    /// The certificate is confirmed good.
    Good,
    /// The responder reported `revoked` or `unknown`.
    NotGood(&'static str),
}

/// Reasons a response cannot be used. The next responder is tried.
#[derive(Debug, Error)]
pub(crate) enum ResponseError {
    /// DER decoding failed.
    #[error("undecodable OCSP response: {0}")]
    Decode(String),
    /// Response status other than `successful`.
    #[error("OCSP responder declined the request")]
    Unsuccessful,
    /// Response type other than basic.
    #[error("unsupported OCSP response type {0}")]
    UnsupportedType(String),
    /// No acceptable signer verified the response.
    #[error("OCSP response signature does not verify")]
    Unverified,
    /// The response does not mention the requested certificate.
    #[error("OCSP response does not cover the requested certificate")]
    MissingStatus,
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Extracts OCSP responder URLs from the subject's AIA extension.
pub(crate) fn responder_urls(subject: &X509Certificate<'_>) -> Vec<String> {
    let mut urls = Vec::new();
    for extension in subject.extensions() {
        let ParsedExtension::AuthorityInfoAccess(aia) = extension.parsed_extension() else {
            continue;
        };
        for description in &aia.accessdescs {
            if description.access_method.to_id_string() == OCSP_ACCESS_METHOD_OID
                && let GeneralName::URI(uri) = &description.access_location
            {
                urls.push((*uri).to_string());
            }
        }
    }
    urls
}

/// Builds the SHA-1 `CertID` for `subject` under `issuer`.
pub(crate) fn cert_id(
    subject: &X509Certificate<'_>,
    issuer: &X509Certificate<'_>,
) -> Result<CertId, der::Error> {
    let name_hash = Sha1::digest(issuer.subject().as_raw());
    let key_hash = Sha1::digest(issuer.public_key().subject_public_key.data.as_ref());
    Ok(CertId {
        hash_algorithm: AlgorithmIdentifierOwned {
            oid: SHA1_OID,
            parameters: Some(Any::encode_from(&Null)?),
        },
        issuer_name_hash: OctetString::new(name_hash.to_vec())?,
        issuer_key_hash: OctetString::new(key_hash.to_vec())?,
        serial_number: SerialNumber::new(subject.raw_serial())?,
    })
}

/// Encodes an unsigned single-certificate request.
pub(crate) fn encode_request(cert_id: &CertId) -> Result<Vec<u8>, der::Error> {
    let request = OcspRequest {
        tbs_request: TbsRequest {
            version: Version::V1,
            requestor_name: None,
            request_list: vec![Request {
                req_cert: cert_id.clone(),
                single_request_extensions: None,
            }],
            request_extensions: None,
        },
        optional_signature: None,
    };
    request.to_der()
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Decodes and verifies a response, returning the status for `cert_id`.
pub(crate) fn evaluate_response(
    body: &[u8],
    cert_id: &CertId,
    issuer: &X509Certificate<'_>,
    at: i64,
) -> Result<ResponseVerdict, ResponseError> {
    let response = OcspResponse::from_der(body).map_err(decode_error)?;
    if !matches!(response.response_status, OcspResponseStatus::Successful) {
        return Err(ResponseError::Unsuccessful);
    }
    let bytes = response.response_bytes.ok_or(ResponseError::Unsuccessful)?;
    let response_type = bytes.response_type.to_string();
    if response_type != BASIC_RESPONSE_OID {
        return Err(ResponseError::UnsupportedType(response_type));
    }
    let basic = BasicOcspResponse::from_der(bytes.response.as_bytes()).map_err(decode_error)?;
    let signed = basic.tbs_response_data.to_der().map_err(decode_error)?;
    let signature = basic.signature.as_bytes().ok_or(ResponseError::Unverified)?;
    let algorithm = basic.signature_algorithm.oid.to_string();
    verify_signer(&basic, issuer, &algorithm, &signed, signature, at)?;

    let single = basic
        .tbs_response_data
        .responses
        .iter()
        .find(|single| same_certificate(&single.cert_id, cert_id))
        .ok_or(ResponseError::MissingStatus)?;
    Ok(match single.cert_status {
        CertStatus::Good(_) => ResponseVerdict::Good,
        CertStatus::Revoked(_) => ResponseVerdict::NotGood("revoked"),
        CertStatus::Unknown(_) => ResponseVerdict::NotGood("unknown"),
    })
}

/// Compares cert ids by hashes and serial; parameter encodings vary.
fn same_certificate(left: &CertId, right: &CertId) -> bool {
    left.hash_algorithm.oid == right.hash_algorithm.oid
        && left.issuer_name_hash == right.issuer_name_hash
        && left.issuer_key_hash == right.issuer_key_hash
        && left.serial_number == right.serial_number
}

/// Accepts a signature by the issuer or an authorized delegate.
fn verify_signer(
    basic: &BasicOcspResponse,
    issuer: &X509Certificate<'_>,
    algorithm: &str,
    message: &[u8],
    signature: &[u8],
    at: i64,
) -> Result<(), ResponseError> {
    if verify_with_key(issuer.public_key(), algorithm, message, signature) {
        return Ok(());
    }
    for delegate in basic.certs.iter().flatten() {
        let Ok(der) = delegate.to_der() else {
            continue;
        };
        let Ok((_, parsed)) = X509Certificate::from_der(&der) else {
            continue;
        };
        if is_authorized_delegate(&parsed, issuer, at)
            && verify_with_key(parsed.public_key(), algorithm, message, signature)
        {
            return Ok(());
        }
    }
    Err(ResponseError::Unverified)
}

/// A delegate must be issued and signed by the issuer, carry the OCSP
/// signing extended key usage, and be valid at `at`.
fn is_authorized_delegate(
    delegate: &X509Certificate<'_>,
    issuer: &X509Certificate<'_>,
    at: i64,
) -> bool {
    let validity = delegate.validity();
    if at < validity.not_before.timestamp() || at > validity.not_after.timestamp() {
        return false;
    }
    if delegate.issuer().as_raw() != issuer.subject().as_raw() {
        return false;
    }
    if delegate.verify_signature(Some(issuer.public_key())).is_err() {
        return false;
    }
    matches!(delegate.extended_key_usage(), Ok(Some(eku)) if eku.value.ocsp_signing)
}

/// Verifies `signature` over `message` with the given key and algorithm OID.
fn verify_with_key(
    key: &SubjectPublicKeyInfo<'_>,
    algorithm: &str,
    message: &[u8],
    signature: &[u8],
) -> bool {
    let bytes = key.subject_public_key.data.as_ref();
    let verifier: &'static dyn VerificationAlgorithm = match (algorithm, bytes.len()) {
        (ECDSA_WITH_SHA256, P256_POINT_LEN) => &signature::ECDSA_P256_SHA256_ASN1,
        (ECDSA_WITH_SHA256, P384_POINT_LEN) => &signature::ECDSA_P384_SHA256_ASN1,
        (ECDSA_WITH_SHA384, P256_POINT_LEN) => &signature::ECDSA_P256_SHA384_ASN1,
        (ECDSA_WITH_SHA384, P384_POINT_LEN) => &signature::ECDSA_P384_SHA384_ASN1,
        (SHA256_WITH_RSA, _) => &signature::RSA_PKCS1_2048_8192_SHA256,
        (SHA384_WITH_RSA, _) => &signature::RSA_PKCS1_2048_8192_SHA384,
        (SHA512_WITH_RSA, _) => &signature::RSA_PKCS1_2048_8192_SHA512,
        _ => return false,
    };
    UnparsedPublicKey::new(verifier, bytes).verify(message, signature).is_ok()
}

/// Maps a DER failure into a response error.
fn decode_error(err: der::Error) -> ResponseError {
    ResponseError::Decode(err.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use der::Encode;
    use x509_ocsp::OcspResponse;
    use x509_ocsp::OcspResponseStatus;

    use super::ResponseError;

    #[test]
    fn unsuccessful_status_is_not_a_verdict() {
        let response = OcspResponse {
            response_status: OcspResponseStatus::TryLater,
            response_bytes: None,
        };
        let der = response.to_der().unwrap();
        let issuer = dummy_issuer();
        let cert_id = super::cert_id(&issuer, &issuer).unwrap();
        let err = super::evaluate_response(&der, &cert_id, &issuer, 0).unwrap_err();
        assert!(matches!(err, ResponseError::Unsuccessful));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let issuer = dummy_issuer();
        let cert_id = super::cert_id(&issuer, &issuer).unwrap();
        let err = super::evaluate_response(b"not der", &cert_id, &issuer, 0).unwrap_err();
        assert!(matches!(err, ResponseError::Decode(_)));
    }

    #[test]
    fn request_round_trips_through_der() {
        let issuer = dummy_issuer();
        let cert_id = super::cert_id(&issuer, &issuer).unwrap();
        let der = super::encode_request(&cert_id).unwrap();
        let decoded = <x509_ocsp::OcspRequest as der::Decode>::from_der(&der).unwrap();
        assert_eq!(decoded.tbs_request.request_list.len(), 1);
        assert_eq!(decoded.tbs_request.request_list[0].req_cert, cert_id);
    }

    /// Self-signed certificate standing in for an issuer.
    fn dummy_issuer() -> x509_parser::prelude::X509Certificate<'static> {
        use x509_parser::prelude::FromDer;
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["ocsp.test".to_string()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        let der: &'static [u8] = Box::leak(cert.der().to_vec().into_boxed_slice());
        x509_parser::prelude::X509Certificate::from_der(der).unwrap().1
    }
}
