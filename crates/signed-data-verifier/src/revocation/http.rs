// crates/signed-data-verifier/src/revocation/http.rs
// ============================================================================
// Module: OCSP Transport
// Description: Bounded HTTP POST of DER OCSP requests.
// Purpose: Reach responders with timeouts, no redirects, and size limits.
// Dependencies: reqwest, signed-data-config
// ============================================================================

//! ## Overview
//! Responders are plain `http` in practice, since OCSP replies are signed
//! end to end. The transport still refuses anything other than `http` or
//! `https`, URLs carrying credentials, redirects, non-200 replies, and bodies
//! over the configured limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use signed_data_config::OcspConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of DER OCSP requests.
const OCSP_REQUEST_MEDIA_TYPE: &str = "application/ocsp-request";
/// Media type of DER OCSP responses.
const OCSP_RESPONSE_MEDIA_TYPE: &str = "application/ocsp-response";

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// Sends OCSP requests to a responder.
pub trait OcspTransport: Send + Sync {
    /// Posts a DER request to `url` and returns the DER response body.
    ///
    /// # Errors
    ///
    /// Returns [`OcspTransportError`] when the responder cannot be reached or
    /// its reply is unusable at the HTTP level.
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, OcspTransportError>;
}

/// HTTP-level OCSP failures.
#[derive(Debug, Error)]
pub enum OcspTransportError {
    /// Responder URL is not an acceptable `http(s)` URL.
    #[error("invalid ocsp responder url: {0}")]
    InvalidUrl(String),
    /// Client construction failed.
    #[error("ocsp client build failed: {0}")]
    Client(String),
    /// Connection, timeout, or read failure.
    #[error("ocsp request failed: {0}")]
    Request(String),
    /// Responder replied with a status other than 200.
    #[error("ocsp responder returned http status {0}")]
    Status(u16),
    /// Response body exceeds the configured limit.
    #[error("ocsp response exceeds size limit")]
    TooLarge,
    /// Response body shorter than its declared length.
    #[error("ocsp response truncated")]
    Truncated,
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Blocking reqwest transport.
///
/// # Invariants
/// - Redirects are never followed.
/// - `max_response_bytes` is a hard upper bound on response bodies.
pub struct HttpOcspTransport {
    /// Shared HTTP client.
    client: Client,
    /// Response body limit.
    max_response_bytes: usize,
}

impl HttpOcspTransport {
    /// Builds a transport from OCSP settings.
    ///
    /// # Errors
    ///
    /// Returns [`OcspTransportError::Client`] when the client cannot be built.
    pub fn new(config: &OcspConfig) -> Result<Self, OcspTransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| OcspTransportError::Client(err.to_string()))?;
        Ok(Self {
            client,
            max_response_bytes: config.max_response_bytes,
        })
    }
}

impl OcspTransport for HttpOcspTransport {
    fn post(&self, url: &str, request: &[u8]) -> Result<Vec<u8>, OcspTransportError> {
        let url = parse_responder_url(url)?;
        let mut response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, OCSP_REQUEST_MEDIA_TYPE)
            .header(ACCEPT, OCSP_RESPONSE_MEDIA_TYPE)
            .body(request.to_vec())
            .send()
            .map_err(|err| OcspTransportError::Request(err.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(OcspTransportError::Status(response.status().as_u16()));
        }
        read_response_limited(&mut response, self.max_response_bytes)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and screens a responder URL.
fn parse_responder_url(raw: &str) -> Result<Url, OcspTransportError> {
    let url = Url::parse(raw).map_err(|err| OcspTransportError::InvalidUrl(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(OcspTransportError::InvalidUrl("unsupported url scheme".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(OcspTransportError::InvalidUrl("url credentials are not allowed".to_string()));
    }
    if url.host_str().is_none() {
        return Err(OcspTransportError::InvalidUrl("url host required".to_string()));
    }
    Ok(url)
}

/// Reads a response body with a hard size limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, OcspTransportError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| OcspTransportError::TooLarge)?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(OcspTransportError::TooLarge);
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle.read_to_end(&mut buf).map_err(|err| OcspTransportError::Request(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(OcspTransportError::TooLarge);
    }
    if let Some(expected) = expected_len
        && usize::try_from(expected).ok().is_none_or(|expected| buf.len() < expected)
    {
        return Err(OcspTransportError::Truncated);
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
