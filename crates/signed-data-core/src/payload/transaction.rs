// crates/signed-data-core/src/payload/transaction.rs
// ============================================================================
// Module: Transaction Claims
// Description: Decoded claim set of a signed transaction.
// Purpose: Typed access to purchase identity, product, and date claims.
// Dependencies: serde, time
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use super::InAppOwnershipType;
use super::ProductType;
use super::TransactionReason;
use super::millis_to_datetime;

// ============================================================================
// SECTION: Transaction Payload
// ============================================================================

/// Claims of a signed transaction.
///
/// Dates are milliseconds since the Unix epoch; use the accessors for
/// [`OffsetDateTime`] views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    /// Unique transaction identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Identifier of the original purchase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
    /// Subscription purchase event identifier across devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_order_line_item_id: Option<String>,
    /// App bundle identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    /// Product identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Subscription group the product belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_group_identifier: Option<String>,
    /// Purchase time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<i64>,
    /// Original purchase time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_purchase_date: Option<i64>,
    /// Subscription expiry in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_date: Option<i64>,
    /// Number of consumable units purchased.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Product type (e.g. `Consumable`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// App-provided account token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_account_token: Option<String>,
    /// Ownership type (e.g. `PURCHASED`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app_ownership_type: Option<String>,
    /// Time the store signed the transaction, in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<i64>,
    /// Refund or revocation reason code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<i32>,
    /// Refund or revocation time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_date: Option<i64>,
    /// Whether the customer upgraded to another subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_upgraded: Option<bool>,
    /// Promotional offer type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_type: Option<i32>,
    /// Promotional offer identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_identifier: Option<String>,
    /// Environment claim (`Sandbox`, `Production`, `LocalTesting`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Three-letter storefront country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storefront: Option<String>,
    /// Storefront identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storefront_id: Option<String>,
    /// Transaction reason (e.g. `PURCHASE`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_reason: Option<String>,
    /// ISO 4217 currency code of the price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Price in milliunits of the currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
}

impl TransactionPayload {
    /// Returns the purchase time.
    #[must_use]
    pub fn purchased_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.purchase_date)
    }

    /// Returns the original purchase time.
    #[must_use]
    pub fn originally_purchased_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.original_purchase_date)
    }

    /// Returns the subscription expiry time.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.expires_date)
    }

    /// Returns the revocation time.
    #[must_use]
    pub fn revoked_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.revocation_date)
    }

    /// Returns the signing time.
    #[must_use]
    pub fn signed_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.signed_date)
    }

    /// Returns the ownership type when it is a known value.
    #[must_use]
    pub fn ownership(&self) -> Option<InAppOwnershipType> {
        self.in_app_ownership_type.as_deref().and_then(InAppOwnershipType::from_claim)
    }

    /// Returns the product type when it is a known value.
    #[must_use]
    pub fn kind(&self) -> Option<ProductType> {
        self.product_type.as_deref().and_then(ProductType::from_claim)
    }

    /// Returns the transaction reason when it is a known value.
    #[must_use]
    pub fn reason(&self) -> Option<TransactionReason> {
        self.transaction_reason.as_deref().and_then(TransactionReason::from_claim)
    }
}
