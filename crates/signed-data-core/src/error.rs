// crates/signed-data-core/src/error.rs
// ============================================================================
// Module: Verification Errors
// Description: Failure causes and the closed status taxonomy they map onto.
// Purpose: Give callers one fail-closed error type with stable status labels.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every rejection produced while verifying signed data is a
//! [`VerificationError`]. Variants describe the precise cause and always carry
//! a readable detail; [`VerificationError::status`] collapses them onto the
//! closed [`VerificationStatus`] set that callers branch on.
//!
//! There is no success status. A verification either yields a payload or one
//! of these errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Status Taxonomy
// ============================================================================

/// Closed set of verification failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// The token is not three base64url segments of JSON.
    MalformedToken,
    /// The header names an algorithm other than ES256.
    UnsupportedAlgorithm,
    /// A certificate (or trust anchor) could not be decoded or is unusable.
    InvalidCertificate,
    /// The header chain does not hold exactly three certificates.
    InvalidChainLength,
    /// The chain does not terminate in a trust anchor or fails path checks.
    UntrustedChain,
    /// A required marker extension is missing from the chain.
    PolicyViolation,
    /// Revocation status could not be confirmed as good.
    RevocationFailure,
    /// The token signature does not verify under the leaf key.
    SignatureFailure,
    /// Verified claims do not belong to the configured app or environment.
    AuthorizationMismatch,
}

impl VerificationStatus {
    /// Returns the stable label for logs and audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::UnsupportedAlgorithm => "UNSUPPORTED_ALGORITHM",
            Self::InvalidCertificate => "INVALID_CERTIFICATE",
            Self::InvalidChainLength => "INVALID_CHAIN_LENGTH",
            Self::UntrustedChain => "UNTRUSTED_CHAIN",
            Self::PolicyViolation => "POLICY_VIOLATION",
            Self::RevocationFailure => "REVOCATION_FAILURE",
            Self::SignatureFailure => "SIGNATURE_FAILURE",
            Self::AuthorizationMismatch => "AUTHORIZATION_MISMATCH",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Certificate Position
// ============================================================================

/// Position of a certificate inside the three-element header chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificatePosition {
    /// Index 0: the signing certificate.
    Leaf,
    /// Index 1: the certificate that issued the leaf.
    Intermediate,
    /// Index 2: the self-issued root.
    Root,
}

impl CertificatePosition {
    /// Returns the position for a chain index, if it is one of the three.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Leaf),
            1 => Some(Self::Intermediate),
            2 => Some(Self::Root),
            _ => None,
        }
    }

    /// Returns a lowercase name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Intermediate => "intermediate",
            Self::Root => "root",
        }
    }
}

impl fmt::Display for CertificatePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a signed-data verification is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Token framing, encoding, or JSON is invalid.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// Header algorithm is not ES256.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// Header has no `x5c` chain.
    #[error("token header has no certificate chain")]
    MissingCertificateChain,
    /// Header chain length is not three.
    #[error("invalid certificate chain length: expected 3, found {0}")]
    InvalidChainLength(usize),
    /// A chain certificate failed to decode or has an unusable key.
    #[error("invalid {position} certificate: {reason}")]
    InvalidCertificate {
        /// Which certificate failed.
        position: CertificatePosition,
        /// Decoder or key detail.
        reason: String,
    },
    /// A configured trust anchor could not be parsed.
    #[error("invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),
    /// The verifier holds no trust anchors.
    #[error("no trust anchors configured")]
    NoTrustAnchors,
    /// The chain root is not byte-identical to any trust anchor.
    #[error("untrusted root certificate")]
    UntrustedRoot,
    /// Path validation failed at the effective date.
    #[error("chain verification failure: {0}")]
    ChainVerification(String),
    /// A certificate lacks its required marker extension.
    #[error("{position} certificate is missing required policy extension {oid}")]
    MissingPolicyOid {
        /// Which certificate lacks the marker.
        position: CertificatePosition,
        /// Dotted OID that was expected.
        oid: String,
    },
    /// Revocation status is not confirmed good.
    #[error("revocation check failed: {0}")]
    Revocation(String),
    /// Token signature did not verify.
    #[error("signature verification failed: {0}")]
    Signature(String),
    /// Claimed bundle id differs from the configured one.
    #[error("bundle id mismatch: expected {expected}, found {found}")]
    BundleIdMismatch {
        /// Configured bundle id.
        expected: String,
        /// Claimed bundle id (empty when absent).
        found: String,
    },
    /// Claimed app id differs from the configured one.
    #[error("app apple id mismatch")]
    AppAppleIdMismatch,
    /// Claimed environment differs from the configured one.
    #[error("environment mismatch: expected {expected}, found {found}")]
    EnvironmentMismatch {
        /// Configured environment claim name.
        expected: String,
        /// Claimed environment (empty when absent).
        found: String,
    },
    /// Notification carries none of `data`, `summary`, `externalPurchaseToken`.
    #[error("notification carries no usable payload data")]
    NoUsablePayloadData,
}

impl VerificationError {
    /// Maps the failure onto its status category.
    #[must_use]
    pub const fn status(&self) -> VerificationStatus {
        match self {
            Self::MalformedToken(_) => VerificationStatus::MalformedToken,
            Self::UnsupportedAlgorithm(_) => VerificationStatus::UnsupportedAlgorithm,
            Self::InvalidChainLength(_) => VerificationStatus::InvalidChainLength,
            Self::MissingCertificateChain
            | Self::InvalidCertificate {
                ..
            }
            | Self::InvalidTrustAnchor(_) => VerificationStatus::InvalidCertificate,
            Self::NoTrustAnchors | Self::UntrustedRoot | Self::ChainVerification(_) => {
                VerificationStatus::UntrustedChain
            }
            Self::MissingPolicyOid {
                ..
            } => VerificationStatus::PolicyViolation,
            Self::Revocation(_) => VerificationStatus::RevocationFailure,
            Self::Signature(_) => VerificationStatus::SignatureFailure,
            Self::BundleIdMismatch {
                ..
            }
            | Self::AppAppleIdMismatch
            | Self::EnvironmentMismatch {
                ..
            }
            | Self::NoUsablePayloadData => VerificationStatus::AuthorizationMismatch,
        }
    }
}
