// crates/signed-data-verifier/src/authorizer.rs
// ============================================================================
// Module: Payload Authorizer
// Description: Post-decode identity checks on verified claims.
// Purpose: Reject authentic payloads addressed to another app or environment.
// Dependencies: signed-data-core
// ============================================================================

//! ## Overview
//! Runs after the signature has verified. Checks are ordered bundle id, app
//! id, environment; the first mismatch wins. An absent claim never matches.
//!
//! | payload                  | bundle id | app id (production) | environment |
//! |--------------------------|-----------|---------------------|-------------|
//! | transaction              | yes       | no                  | yes         |
//! | renewal info             | no        | no                  | yes         |
//! | notification (any body)  | yes       | yes                 | yes         |

// ============================================================================
// SECTION: Imports
// ============================================================================

use signed_data_core::Environment;
use signed_data_core::NotificationBody;
use signed_data_core::NotificationPayload;
use signed_data_core::RenewalInfoPayload;
use signed_data_core::TransactionPayload;
use signed_data_core::VerificationError;

// ============================================================================
// SECTION: Authorizer
// ============================================================================

/// Identity the verifier is configured for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadAuthorizer {
    /// Expected bundle id.
    bundle_id: String,
    /// Expected numeric app id; consulted in production only.
    app_apple_id: Option<i64>,
    /// Expected environment.
    environment: Environment,
}

/// Identity claims pulled from a notification body.
struct NotificationIdentity<'a> {
    /// Claimed bundle id.
    bundle_id: Option<&'a str>,
    /// Claimed app id.
    app_apple_id: Option<i64>,
    /// Claimed environment name.
    environment: Option<&'a str>,
}

impl PayloadAuthorizer {
    /// Creates an authorizer for the configured identity.
    #[must_use]
    pub fn new(
        bundle_id: impl Into<String>,
        app_apple_id: Option<i64>,
        environment: Environment,
    ) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            app_apple_id,
            environment,
        }
    }

    /// Checks bundle id and environment of a transaction.
    ///
    /// # Errors
    ///
    /// Returns the first identity mismatch.
    pub fn authorize_transaction(
        &self,
        payload: &TransactionPayload,
    ) -> Result<(), VerificationError> {
        self.check_bundle_id(payload.bundle_id.as_deref())?;
        self.check_environment(payload.environment.as_deref())
    }

    /// Checks the environment of renewal info.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::EnvironmentMismatch`] on mismatch.
    pub fn authorize_renewal_info(
        &self,
        payload: &RenewalInfoPayload,
    ) -> Result<(), VerificationError> {
        self.check_environment(payload.environment.as_deref())
    }

    /// Checks a notification against whichever body record it carries.
    ///
    /// # Errors
    ///
    /// Returns the first identity mismatch.
    pub fn authorize_notification(
        &self,
        payload: &NotificationPayload,
    ) -> Result<(), VerificationError> {
        let identity = match &payload.body {
            NotificationBody::Data(data) => NotificationIdentity {
                bundle_id: data.bundle_id.as_deref(),
                app_apple_id: data.app_apple_id,
                environment: data.environment.as_deref(),
            },
            NotificationBody::Summary(summary) => NotificationIdentity {
                bundle_id: summary.bundle_id.as_deref(),
                app_apple_id: summary.app_apple_id,
                environment: summary.environment.as_deref(),
            },
            NotificationBody::ExternalPurchaseToken(token) => NotificationIdentity {
                bundle_id: token.bundle_id.as_deref(),
                app_apple_id: token.app_apple_id,
                environment: Some(if token.is_sandbox() {
                    Environment::Sandbox.as_claim_str()
                } else {
                    Environment::Production.as_claim_str()
                }),
            },
        };
        self.check_bundle_id(identity.bundle_id)?;
        if self.environment.requires_app_apple_id() && identity.app_apple_id != self.app_apple_id
        {
            return Err(VerificationError::AppAppleIdMismatch);
        }
        self.check_environment(identity.environment)
    }

    /// Requires an exact bundle id match.
    fn check_bundle_id(&self, claimed: Option<&str>) -> Result<(), VerificationError> {
        if claimed == Some(self.bundle_id.as_str()) {
            return Ok(());
        }
        Err(VerificationError::BundleIdMismatch {
            expected: self.bundle_id.clone(),
            found: claimed.unwrap_or_default().to_string(),
        })
    }

    /// Requires the claimed environment to equal the configured one.
    fn check_environment(&self, claimed: Option<&str>) -> Result<(), VerificationError> {
        if self.environment.matches_claim(claimed) {
            return Ok(());
        }
        Err(VerificationError::EnvironmentMismatch {
            expected: self.environment.as_claim_str().to_string(),
            found: claimed.unwrap_or_default().to_string(),
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
