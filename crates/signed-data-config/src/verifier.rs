// crates/signed-data-config/src/verifier.rs
// ============================================================================
// Module: Runtime Verifier Configuration
// Description: Validated settings a signed-data verifier is built from.
// Purpose: Replace option-style construction with one checked struct.
// Dependencies: signed-data-core
// ============================================================================

//! ## Overview
//! [`VerifierConfig`] holds the resolved settings: identity to authorize
//! against, DER root certificates, online-check toggle, and the OCSP and audit
//! sub-configs. Construction through [`VerifierConfig::new`] or
//! [`crate::SignedDataConfig::into_verifier_config`] validates eagerly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use signed_data_core::Environment;

use crate::config::AuditConfig;
use crate::config::ConfigError;
use crate::config::MAX_ROOT_CERTIFICATE_SIZE;
use crate::config::MAX_ROOT_CERTIFICATES;
use crate::config::OcspConfig;
use crate::config::validate_identity;

// ============================================================================
// SECTION: Verifier Config
// ============================================================================

/// Resolved verifier configuration.
///
/// # Invariants
/// - `bundle_id` is non-empty.
/// - `app_apple_id` is set whenever `environment` is production.
/// - `root_certificates` holds between one and sixteen non-empty DER blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Bundle identifier payloads must carry.
    pub bundle_id: String,
    /// Environment payloads must come from.
    pub environment: Environment,
    /// Numeric app identifier (required in production).
    pub app_apple_id: Option<i64>,
    /// DER-encoded trust anchors.
    pub root_certificates: Vec<Vec<u8>>,
    /// Enables revocation checks and the chain cache.
    pub enable_online_checks: bool,
    /// OCSP transport settings.
    pub ocsp: OcspConfig,
    /// Audit sink settings.
    pub audit: AuditConfig,
}

impl VerifierConfig {
    /// Builds a validated configuration with default OCSP and audit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an invariant does not hold.
    pub fn new(
        bundle_id: impl Into<String>,
        environment: Environment,
        app_apple_id: Option<i64>,
        root_certificates: Vec<Vec<u8>>,
        enable_online_checks: bool,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            bundle_id: bundle_id.into(),
            environment,
            app_apple_id,
            root_certificates,
            enable_online_checks,
            ocsp: OcspConfig::default(),
            audit: AuditConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an invariant does not hold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_identity(&self.bundle_id, self.environment, self.app_apple_id)?;
        if self.root_certificates.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one root certificate is required".to_string(),
            ));
        }
        if self.root_certificates.len() > MAX_ROOT_CERTIFICATES {
            return Err(ConfigError::Invalid("too many root certificates".to_string()));
        }
        for der in &self.root_certificates {
            if der.is_empty() || der.len() > MAX_ROOT_CERTIFICATE_SIZE {
                return Err(ConfigError::Invalid(
                    "root certificate is empty or exceeds size limit".to_string(),
                ));
            }
        }
        self.ocsp.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}
