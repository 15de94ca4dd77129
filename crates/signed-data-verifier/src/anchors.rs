// crates/signed-data-verifier/src/anchors.rs
// ============================================================================
// Module: Trust Anchors
// Description: Immutable set of DER root certificates a chain must end in.
// Purpose: Decide root trust by byte identity, never by name.
// Dependencies: x509-parser, signed-data-core
// ============================================================================

//! ## Overview
//! A chain is trusted only when its root is byte-identical to one of the
//! configured anchors. Anchors are parsed once at construction so a broken
//! configuration fails before the first verification.

// ============================================================================
// SECTION: Imports
// ============================================================================

use signed_data_core::VerificationError;
use x509_parser::prelude::FromDer;
use x509_parser::prelude::X509Certificate;

// ============================================================================
// SECTION: Trust Anchor Set
// ============================================================================

/// Root certificates accepted as chain terminators.
///
/// # Invariants
/// - Every entry parses as a single X.509 certificate with no trailing bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchorSet {
    /// DER encodings of the anchors.
    anchors: Vec<Vec<u8>>,
}

impl TrustAnchorSet {
    /// Builds an anchor set from DER certificates.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::InvalidTrustAnchor`] when an entry is not a
    /// well-formed certificate.
    pub fn from_der(anchors: Vec<Vec<u8>>) -> Result<Self, VerificationError> {
        for (index, der) in anchors.iter().enumerate() {
            match X509Certificate::from_der(der) {
                Ok((rest, _)) if rest.is_empty() => {}
                Ok(_) => {
                    return Err(VerificationError::InvalidTrustAnchor(format!(
                        "anchor {index} has trailing data"
                    )));
                }
                Err(err) => {
                    return Err(VerificationError::InvalidTrustAnchor(format!(
                        "anchor {index}: {err}"
                    )));
                }
            }
        }
        Ok(Self {
            anchors,
        })
    }

    /// Returns true when no anchors are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Returns the number of anchors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Returns true when `der` is byte-identical to an anchor.
    #[must_use]
    pub fn contains(&self, der: &[u8]) -> bool {
        self.anchors.iter().any(|anchor| anchor.as_slice() == der)
    }
}
