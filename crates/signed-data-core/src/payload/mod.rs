// crates/signed-data-core/src/payload/mod.rs
// ============================================================================
// Module: Signed Payload Claims
// Description: Decoded claim sets carried by verified signed tokens.
// Purpose: Give callers typed access to transactions, renewals, notifications.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Claim sets are deserialized from the verified token payload. Field names
//! follow the store's camelCase JSON. Closed vocabularies stay as raw strings on
//! the struct so an unrecognized value never turns a valid token into a
//! decoding failure; typed accessors interpret the known values.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod notification;
mod renewal;
mod transaction;
mod vocabulary;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use notification::ExternalPurchaseToken;
pub use notification::NotificationBody;
pub use notification::NotificationBodyError;
pub use notification::NotificationData;
pub use notification::NotificationPayload;
pub use notification::NotificationSummary;
pub use notification::RawNotificationPayload;
pub use renewal::RenewalInfoPayload;
pub use transaction::TransactionPayload;
pub use vocabulary::InAppOwnershipType;
pub use vocabulary::ProductType;
pub use vocabulary::SubscriptionStatus;
pub use vocabulary::TransactionReason;

// ============================================================================
// SECTION: Payload Kind
// ============================================================================

/// Kind of signed payload a verification call expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// A signed transaction.
    Transaction,
    /// Signed subscription renewal info.
    RenewalInfo,
    /// A signed server notification.
    Notification,
}

impl PayloadKind {
    /// Returns a stable label for audit and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::RenewalInfo => "renewal_info",
            Self::Notification => "notification",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a millisecond epoch claim to a timestamp.
///
/// Returns `None` for absent claims and for values outside the representable
/// range.
pub(crate) fn millis_to_datetime(millis: Option<i64>) -> Option<OffsetDateTime> {
    let millis = millis?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}
