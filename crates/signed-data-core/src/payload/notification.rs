// crates/signed-data-core/src/payload/notification.rs
// ============================================================================
// Module: Notification Claims
// Description: Decoded claim set of a signed server notification.
// Purpose: Enforce the exactly-one body invariant at decode time.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! A notification carries exactly one body record: `data`, `summary`, or
//! `externalPurchaseToken`. The wire shape is decoded into
//! [`RawNotificationPayload`] first and then converted into
//! [`NotificationPayload`], whose [`NotificationBody`] makes the invariant
//! unrepresentable to violate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use super::SubscriptionStatus;
use super::millis_to_datetime;

// ============================================================================
// SECTION: Body Records
// ============================================================================

/// App metadata and nested signed data of a subscription notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Environment claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Numeric app identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_apple_id: Option<i64>,
    /// App bundle identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    /// App build version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_version: Option<String>,
    /// Nested signed renewal info token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_renewal_info: Option<String>,
    /// Nested signed transaction token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_transaction_info: Option<String>,
    /// Subscription status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

impl NotificationData {
    /// Returns the subscription status when it is a known code.
    #[must_use]
    pub fn subscription_status(&self) -> Option<SubscriptionStatus> {
        self.status.and_then(SubscriptionStatus::from_code)
    }
}

/// Result summary of a renewal-date extension request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    /// Environment claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Numeric app identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_apple_id: Option<i64>,
    /// App bundle identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    /// Product identifier the extension applied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Identifier of the extension request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_identifier: Option<String>,
    /// Storefronts the extension covered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storefront_country_codes: Option<Vec<String>>,
    /// Subscriptions that were extended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded_count: Option<i64>,
    /// Subscriptions that could not be extended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<i64>,
}

/// External purchase token record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPurchaseToken {
    /// Token identifier; sandbox tokens carry a `SANDBOX` prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_purchase_id: Option<String>,
    /// Token creation time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_creation_date: Option<i64>,
    /// Numeric app identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_apple_id: Option<i64>,
    /// App bundle identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    /// Token type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Token expiry in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiration_date: Option<i64>,
}

impl ExternalPurchaseToken {
    /// Prefix marking sandbox external purchase identifiers.
    pub const SANDBOX_PREFIX: &'static str = "SANDBOX";

    /// Returns true when the identifier marks a sandbox token.
    #[must_use]
    pub fn is_sandbox(&self) -> bool {
        self.external_purchase_id.as_deref().is_some_and(|id| id.starts_with(Self::SANDBOX_PREFIX))
    }

    /// Returns the token creation time.
    #[must_use]
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.token_creation_date)
    }

    /// Returns the token expiry time.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.token_expiration_date)
    }
}

// ============================================================================
// SECTION: Notification Body
// ============================================================================

/// The single body record a notification carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationBody {
    /// Subscription and purchase events.
    Data(NotificationData),
    /// Renewal-date extension summaries.
    Summary(NotificationSummary),
    /// External purchase token events.
    ExternalPurchaseToken(ExternalPurchaseToken),
}

/// Violations of the exactly-one body invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotificationBodyError {
    /// No body record is present.
    #[error("notification carries no body record")]
    Missing,
    /// More than one body record is present.
    #[error("notification carries {0} body records, expected exactly one")]
    Ambiguous(usize),
}

// ============================================================================
// SECTION: Notification Payload
// ============================================================================

/// Wire shape of a notification before the body invariant is enforced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotificationPayload {
    /// Notification type (e.g. `DID_RENEW`).
    #[serde(default)]
    pub notification_type: Option<String>,
    /// Notification subtype.
    #[serde(default)]
    pub subtype: Option<String>,
    /// Unique notification identifier.
    #[serde(default, rename = "notificationUUID")]
    pub notification_uuid: Option<String>,
    /// Notification format version.
    #[serde(default)]
    pub version: Option<String>,
    /// Signing time in epoch milliseconds.
    #[serde(default)]
    pub signed_date: Option<i64>,
    /// Subscription data record.
    #[serde(default)]
    pub data: Option<NotificationData>,
    /// Extension summary record.
    #[serde(default)]
    pub summary: Option<NotificationSummary>,
    /// External purchase token record.
    #[serde(default)]
    pub external_purchase_token: Option<ExternalPurchaseToken>,
}

/// Claims of a signed server notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Notification type (e.g. `DID_RENEW`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    /// Notification subtype.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Unique notification identifier.
    #[serde(rename = "notificationUUID", skip_serializing_if = "Option::is_none")]
    pub notification_uuid: Option<String>,
    /// Notification format version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Signing time in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<i64>,
    /// The body record.
    #[serde(flatten)]
    pub body: NotificationBody,
}

impl NotificationPayload {
    /// Returns the signing time.
    #[must_use]
    pub fn signed_at(&self) -> Option<OffsetDateTime> {
        millis_to_datetime(self.signed_date)
    }
}

impl TryFrom<RawNotificationPayload> for NotificationPayload {
    type Error = NotificationBodyError;

    fn try_from(raw: RawNotificationPayload) -> Result<Self, Self::Error> {
        let present = usize::from(raw.data.is_some())
            + usize::from(raw.summary.is_some())
            + usize::from(raw.external_purchase_token.is_some());
        if present > 1 {
            return Err(NotificationBodyError::Ambiguous(present));
        }
        let body = match (raw.data, raw.summary, raw.external_purchase_token) {
            (Some(data), None, None) => NotificationBody::Data(data),
            (None, Some(summary), None) => NotificationBody::Summary(summary),
            (None, None, Some(token)) => NotificationBody::ExternalPurchaseToken(token),
            _ => return Err(NotificationBodyError::Missing),
        };
        Ok(Self {
            notification_type: raw.notification_type,
            subtype: raw.subtype,
            notification_uuid: raw.notification_uuid,
            version: raw.version,
            signed_date: raw.signed_date,
            body,
        })
    }
}
