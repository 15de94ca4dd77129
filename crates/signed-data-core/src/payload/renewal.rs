// crates/signed-data-core/src/payload/renewal.rs
// ============================================================================
// Module: Renewal Info Claims
// Description: Decoded claim set of signed subscription renewal info.
// Purpose: Typed access to renewal preferences and billing state.
// Dependencies: serde, time
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use super::millis_to_datetime;

// ============================================================================
// SECTION: Renewal Info Payload
// ============================================================================

/// Claims of signed subscription renewal info.
///
/// Renewal info carries no bundle identifier; only its environment is
/// authorized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalInfoPayload {
    /// Product the subscription renews to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew_product_id: Option<String>,
    /// Renewal status code (`1` on, `0` off).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew_status: Option<i32>,
    /// Reason the subscription expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_intent: Option<i32>,
    /// End of the billing grace period in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_expires_date: Option<i64>,
    /// Whether the store is still retrying billing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_in_billing_retry_period: Option<bool>,
    /// Promotional offer identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_identifier: Option<String>,
    /// Promotional offer type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_type: Option<i32>,
    /// Identifier of the original purchase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
    /// Customer consent status for a price increase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_increase_status: Option<i32>,
    /// Current product identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Start of the most recent continuous subscription run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_subscription_start_date: Option<i64>,
    /// Time the store signed the renewal info, in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<i64>,
    /// Environment claim (`Sandbox`, `Production`, `LocalTesting`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl RenewalInfoPayload {
    /// Returns the end of the grace period.
    #[must_use]
    pub fn grace_period_expires_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.grace_period_expires_date)
    }

    /// Returns the start of the most recent subscription run.
    #[must_use]
    pub fn recent_subscription_started_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.recent_subscription_start_date)
    }

    /// Returns the signing time.
    #[must_use]
    pub fn signed_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.signed_date)
    }

    /// Returns true when auto-renew is switched on.
    #[must_use]
    pub fn auto_renew_enabled(&self) -> bool {
        self.auto_renew_status == Some(1)
    }
}
