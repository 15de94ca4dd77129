// crates/signed-data-verifier/src/token.rs
// ============================================================================
// Module: Token Decoder
// Description: Compact JWS framing, header extraction, and ES256 checks.
// Purpose: Split untrusted tokens and verify them under a resolved leaf key.
// Dependencies: base64, serde, serde_json, signed-data-core
// ============================================================================

//! ## Overview
//! A signed token is `header.payload.signature`, each segment base64url
//! without padding. [`decode`] parses the framing and the JSON of the first two
//! segments without trusting anything. [`decode_and_verify`] additionally
//! requires `alg == "ES256"`, asks the caller for the key to verify under, and
//! only then deserializes the claims.
//!
//! Claims returned by [`decode`] are unverified and must only be used to pick
//! the effective validation date.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use signed_data_core::VerificationError;

use crate::chain::LeafKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The only accepted signing algorithm.
pub const SUPPORTED_ALGORITHM: &str = "ES256";
/// Upper bound on the accepted token length in bytes.
pub const MAX_TOKEN_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Protected header of a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwsHeader {
    /// Signing algorithm.
    pub alg: String,
    /// Base64 (standard alphabet) DER certificates, leaf first.
    #[serde(default)]
    pub x5c: Option<Vec<String>>,
}

impl JwsHeader {
    /// Returns the embedded certificate chain.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::MissingCertificateChain`] when the header
    /// has no `x5c` member.
    pub fn certificate_chain(&self) -> Result<&[String], VerificationError> {
        self.x5c.as_deref().ok_or(VerificationError::MissingCertificateChain)
    }
}

/// A token split into its parts. Nothing here is verified.
#[derive(Debug, Clone)]
pub struct DecodedToken<'a> {
    /// Parsed protected header.
    pub header: JwsHeader,
    /// Parsed claims object.
    pub claims: Map<String, Value>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// `header.payload` exactly as it appeared in the token.
    signing_input: &'a str,
}

impl DecodedToken<'_> {
    /// Returns the bytes the signature covers.
    #[must_use]
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }

    /// Returns a claim value, if present.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Splits a token and parses its header and claims without verification.
///
/// # Errors
///
/// Returns [`VerificationError::MalformedToken`] unless the token has exactly
/// three non-empty base64url segments whose first two decode to JSON objects.
pub fn decode(token: &str) -> Result<DecodedToken<'_>, VerificationError> {
    if token.len() > MAX_TOKEN_BYTES {
        return Err(malformed("token exceeds size limit"));
    }
    let mut segments = token.split('.');
    let (Some(header_segment), Some(payload_segment), Some(signature_segment), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(malformed("expected three dot-separated segments"));
    };
    if header_segment.is_empty() || payload_segment.is_empty() || signature_segment.is_empty() {
        return Err(malformed("empty token segment"));
    }
    let signing_input_len = header_segment.len() + 1 + payload_segment.len();
    let signing_input =
        token.get(.. signing_input_len).ok_or_else(|| malformed("invalid token framing"))?;

    let header_bytes = decode_segment(header_segment, "header")?;
    let payload_bytes = decode_segment(payload_segment, "payload")?;
    let signature = decode_segment(signature_segment, "signature")?;

    let header: JwsHeader = serde_json::from_slice(&header_bytes)
        .map_err(|err| malformed(&format!("invalid header json: {err}")))?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload_bytes)
        .map_err(|err| malformed(&format!("invalid payload json: {err}")))?;

    Ok(DecodedToken {
        header,
        claims,
        signature,
        signing_input,
    })
}

/// Decodes a token, verifies its ES256 signature, and deserializes the claims.
///
/// `resolve_key` runs after the algorithm check and before signature
/// verification; it is where chain validation happens.
///
/// # Errors
///
/// Returns [`VerificationError`] when decoding fails, the algorithm is not
/// ES256, key resolution fails, the signature does not verify, or the claims
/// do not deserialize into `T`.
pub fn decode_and_verify<T, F>(token: &str, resolve_key: F) -> Result<T, VerificationError>
where
    T: DeserializeOwned,
    F: FnOnce(&DecodedToken<'_>) -> Result<LeafKey, VerificationError>,
{
    let decoded = decode(token)?;
    if decoded.header.alg != SUPPORTED_ALGORITHM {
        return Err(VerificationError::UnsupportedAlgorithm(decoded.header.alg));
    }
    let key = resolve_key(&decoded)?;
    key.verify_es256(decoded.signing_input(), &decoded.signature)?;
    serde_json::from_value(Value::Object(decoded.claims))
        .map_err(|err| malformed(&format!("claims do not match payload shape: {err}")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes one base64url segment.
fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, VerificationError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| malformed(&format!("{name} is not valid base64url")))
}

/// Builds a malformed-token error.
fn malformed(detail: &str) -> VerificationError {
    VerificationError::MalformedToken(detail.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
