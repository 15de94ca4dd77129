// crates/signed-data-verifier/src/chain.rs
// ============================================================================
// Module: Chain Validator
// Description: x5c chain parsing, path validation, and marker-extension checks.
// Purpose: Turn an untrusted three-certificate chain into a trusted leaf key.
// Dependencies: base64, ring, time, x509-parser, signed-data-core
// ============================================================================

//! ## Overview
//! The header chain must be exactly `[leaf, intermediate, root]`. Validation
//! runs in a fixed order and stops at the first failure:
//!
//! 1. anchors configured, chain length three;
//! 2. each entry decodes (standard base64) and parses as X.509;
//! 3. root is byte-identical to a trust anchor;
//! 4. validity windows, issuer linkage, signatures, and CA constraints hold at
//!    the effective date;
//! 5. leaf and intermediate carry their marker extensions;
//! 6. the leaf key is an uncompressed P-256 point;
//! 7. revocation status is good for leaf and intermediate (online mode).
//!
//! The effective date is supplied by the caller. Offline verification passes
//! the token's signing date so historic tokens stay verifiable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::signature::ECDSA_P256_SHA256_FIXED;
use ring::signature::UnparsedPublicKey;
use signed_data_core::CertificatePosition;
use signed_data_core::VerificationError;
use time::OffsetDateTime;
use x509_parser::der_parser::oid::Oid;
use x509_parser::prelude::FromDer;
use x509_parser::prelude::X509Certificate;

use crate::anchors::TrustAnchorSet;
use crate::revocation::RevocationChecker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Required number of certificates in the header chain.
pub const CHAIN_LENGTH: usize = 3;
/// Marker extension every signing leaf must carry.
pub const LEAF_POLICY_OID: &str = "1.2.840.113635.100.6.11.1";
/// Marker extension every intermediate must carry.
pub const INTERMEDIATE_POLICY_OID: &str = "1.2.840.113635.100.6.2.1";
/// `id-ecPublicKey`.
const EC_PUBLIC_KEY_OID: &str = "1.2.840.10045.2.1";
/// `prime256v1` / `secp256r1`.
const P256_CURVE_OID: &str = "1.2.840.10045.3.1.7";
/// Length of an uncompressed SEC1 P-256 point.
const P256_POINT_LEN: usize = 65;
/// SEC1 tag for an uncompressed point.
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

// ============================================================================
// SECTION: Leaf Key
// ============================================================================

/// Public key of a validated leaf certificate.
///
/// # Invariants
/// - Holds a 65-byte uncompressed SEC1 point; cloning shares the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafKey {
    /// Uncompressed SEC1 point bytes.
    point: Arc<[u8]>,
}

impl LeafKey {
    /// Wraps an uncompressed P-256 point.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::InvalidCertificate`] for any other shape.
    pub fn from_sec1_point(point: &[u8]) -> Result<Self, VerificationError> {
        if point.len() != P256_POINT_LEN || point.first() != Some(&SEC1_UNCOMPRESSED_TAG) {
            return Err(VerificationError::InvalidCertificate {
                position: CertificatePosition::Leaf,
                reason: "leaf key is not an uncompressed P-256 point".to_string(),
            });
        }
        Ok(Self {
            point: Arc::from(point),
        })
    }

    /// Returns the SEC1 point bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.point
    }

    /// Verifies a JWS ES256 signature (`r || s`, 64 bytes) over `message`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Signature`] when verification fails.
    pub fn verify_es256(&self, message: &[u8], signature: &[u8]) -> Result<(), VerificationError> {
        UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, self.as_bytes())
            .verify(message, signature)
            .map_err(|_| {
                VerificationError::Signature("token signature does not match leaf key".to_string())
            })
    }
}

// ============================================================================
// SECTION: Validator Trait
// ============================================================================

/// Resolves a trusted leaf key from a header certificate chain.
pub trait ChainValidator: Send + Sync {
    /// Validates `certificates` (base64 DER, leaf first) at `effective_date`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] describing the first failed check.
    fn verify_chain(
        &self,
        certificates: &[String],
        effective_date: OffsetDateTime,
    ) -> Result<LeafKey, VerificationError>;
}

// ============================================================================
// SECTION: X.509 Validator
// ============================================================================

/// Chain validator backed by `x509-parser`.
pub struct X509ChainValidator {
    /// Roots a chain must terminate in.
    anchors: TrustAnchorSet,
    /// Revocation checker; `None` disables revocation checks.
    revocation: Option<Arc<dyn RevocationChecker>>,
}

impl X509ChainValidator {
    /// Creates a validator. Pass a revocation checker only in online mode.
    #[must_use]
    pub fn new(anchors: TrustAnchorSet, revocation: Option<Arc<dyn RevocationChecker>>) -> Self {
        Self {
            anchors,
            revocation,
        }
    }
}

impl ChainValidator for X509ChainValidator {
    fn verify_chain(
        &self,
        certificates: &[String],
        effective_date: OffsetDateTime,
    ) -> Result<LeafKey, VerificationError> {
        if self.anchors.is_empty() {
            return Err(VerificationError::NoTrustAnchors);
        }
        if certificates.len() != CHAIN_LENGTH {
            return Err(VerificationError::InvalidChainLength(certificates.len()));
        }
        let ders = decode_chain(certificates)?;
        let [leaf_der, intermediate_der, root_der] = ders.as_slice() else {
            return Err(VerificationError::InvalidChainLength(ders.len()));
        };
        let leaf = parse_certificate(leaf_der, CertificatePosition::Leaf)?;
        let intermediate = parse_certificate(intermediate_der, CertificatePosition::Intermediate)?;
        let root = parse_certificate(root_der, CertificatePosition::Root)?;

        if !self.anchors.contains(root_der) {
            return Err(VerificationError::UntrustedRoot);
        }
        verify_path(&leaf, &intermediate, &root, effective_date.unix_timestamp())?;
        require_extension(&leaf, LEAF_POLICY_OID, CertificatePosition::Leaf)?;
        require_extension(
            &intermediate,
            INTERMEDIATE_POLICY_OID,
            CertificatePosition::Intermediate,
        )?;
        let key = leaf_public_key(&leaf)?;

        if let Some(checker) = &self.revocation {
            checker.check_revocation(leaf_der, intermediate_der, effective_date)?;
            checker.check_revocation(intermediate_der, root_der, effective_date)?;
        }
        Ok(key)
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Base64-decodes each chain entry.
fn decode_chain(certificates: &[String]) -> Result<Vec<Vec<u8>>, VerificationError> {
    certificates
        .iter()
        .enumerate()
        .map(|(index, encoded)| {
            STANDARD.decode(encoded).map_err(|_| VerificationError::InvalidCertificate {
                position: position_for(index),
                reason: "certificate is not valid base64".to_string(),
            })
        })
        .collect()
}

/// Parses one DER certificate, rejecting trailing bytes.
fn parse_certificate(
    der: &[u8],
    position: CertificatePosition,
) -> Result<X509Certificate<'_>, VerificationError> {
    match X509Certificate::from_der(der) {
        Ok((rest, certificate)) if rest.is_empty() => Ok(certificate),
        Ok(_) => Err(VerificationError::InvalidCertificate {
            position,
            reason: "trailing data after certificate".to_string(),
        }),
        Err(err) => Err(VerificationError::InvalidCertificate {
            position,
            reason: format!("x509 parse failure: {err}"),
        }),
    }
}

/// Maps a chain index onto its position; callers only pass 0..3.
fn position_for(index: usize) -> CertificatePosition {
    CertificatePosition::from_index(index).unwrap_or(CertificatePosition::Root)
}

// ============================================================================
// SECTION: Path Validation
// ============================================================================

/// Checks validity windows, issuer linkage, and CA constraints.
fn verify_path(
    leaf: &X509Certificate<'_>,
    intermediate: &X509Certificate<'_>,
    root: &X509Certificate<'_>,
    at: i64,
) -> Result<(), VerificationError> {
    check_validity(leaf, CertificatePosition::Leaf, at)?;
    check_validity(intermediate, CertificatePosition::Intermediate, at)?;
    check_validity(root, CertificatePosition::Root, at)?;
    check_issued_by(leaf, intermediate, CertificatePosition::Leaf)?;
    check_issued_by(intermediate, root, CertificatePosition::Intermediate)?;
    check_signing_usage(leaf)?;
    check_ca(intermediate, CertificatePosition::Intermediate, 0)?;
    check_ca(root, CertificatePosition::Root, 1)?;
    Ok(())
}

/// Requires `at` to fall inside the certificate validity window.
fn check_validity(
    certificate: &X509Certificate<'_>,
    position: CertificatePosition,
    at: i64,
) -> Result<(), VerificationError> {
    let validity = certificate.validity();
    if at < validity.not_before.timestamp() || at > validity.not_after.timestamp() {
        return Err(path_failure(format!(
            "{position} certificate is not valid at the effective date"
        )));
    }
    Ok(())
}

/// Requires `subject` to name and be signed by `issuer`.
fn check_issued_by(
    subject: &X509Certificate<'_>,
    issuer: &X509Certificate<'_>,
    position: CertificatePosition,
) -> Result<(), VerificationError> {
    if subject.issuer().as_raw() != issuer.subject().as_raw() {
        return Err(path_failure(format!("{position} issuer name does not match its issuer")));
    }
    subject
        .verify_signature(Some(issuer.public_key()))
        .map_err(|_| path_failure(format!("{position} signature does not verify under its issuer")))
}

/// Rejects a leaf whose key usage excludes digital signatures.
fn check_signing_usage(leaf: &X509Certificate<'_>) -> Result<(), VerificationError> {
    let usage =
        leaf.key_usage().map_err(|_| path_failure("leaf key usage is malformed".to_string()))?;
    if let Some(usage) = usage
        && !usage.value.digital_signature()
    {
        return Err(path_failure("leaf key usage does not permit signatures".to_string()));
    }
    Ok(())
}

/// Requires CA basic constraints and, when present, certificate-signing usage.
///
/// `below` is the number of intermediate CAs beneath this certificate.
fn check_ca(
    certificate: &X509Certificate<'_>,
    position: CertificatePosition,
    below: u32,
) -> Result<(), VerificationError> {
    let constraints = certificate
        .basic_constraints()
        .map_err(|_| path_failure(format!("{position} basic constraints are malformed")))?;
    let Some(constraints) = constraints else {
        return Err(path_failure(format!("{position} certificate is not a CA")));
    };
    if !constraints.value.ca {
        return Err(path_failure(format!("{position} certificate is not a CA")));
    }
    if let Some(limit) = constraints.value.path_len_constraint
        && limit < below
    {
        return Err(path_failure(format!("{position} path length constraint exceeded")));
    }
    let usage = certificate
        .key_usage()
        .map_err(|_| path_failure(format!("{position} key usage is malformed")))?;
    if let Some(usage) = usage
        && !usage.value.key_cert_sign()
    {
        return Err(path_failure(format!(
            "{position} key usage does not permit certificate signing"
        )));
    }
    Ok(())
}

/// Builds a path-validation failure.
fn path_failure(detail: String) -> VerificationError {
    VerificationError::ChainVerification(detail)
}

// ============================================================================
// SECTION: Extensions and Keys
// ============================================================================

/// Requires a marker extension by dotted OID.
fn require_extension(
    certificate: &X509Certificate<'_>,
    oid: &str,
    position: CertificatePosition,
) -> Result<(), VerificationError> {
    if certificate.extensions().iter().any(|extension| extension.oid.to_id_string() == oid) {
        return Ok(());
    }
    Err(VerificationError::MissingPolicyOid {
        position,
        oid: oid.to_string(),
    })
}

/// Extracts the leaf key, requiring an EC P-256 subject public key.
fn leaf_public_key(leaf: &X509Certificate<'_>) -> Result<LeafKey, VerificationError> {
    let spki = leaf.public_key();
    let not_p256 = || VerificationError::InvalidCertificate {
        position: CertificatePosition::Leaf,
        reason: "leaf key is not an EC P-256 key".to_string(),
    };
    if spki.algorithm.algorithm.to_id_string() != EC_PUBLIC_KEY_OID {
        return Err(not_p256());
    }
    let curve = spki
        .algorithm
        .parameters
        .clone()
        .and_then(|parameters| Oid::try_from(parameters).ok())
        .map(|oid| oid.to_id_string());
    if curve.as_deref() != Some(P256_CURVE_OID) {
        return Err(not_p256());
    }
    LeafKey::from_sec1_point(spki.subject_public_key.data.as_ref())
}
