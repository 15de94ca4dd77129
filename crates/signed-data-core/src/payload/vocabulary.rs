// crates/signed-data-core/src/payload/vocabulary.rs
// ============================================================================
// Module: Claim Vocabularies
// Description: Typed views over closed string and integer claim values.
// Purpose: Interpret known claim values without rejecting unknown ones.
// ============================================================================

// ============================================================================
// SECTION: Ownership
// ============================================================================

/// How the customer obtained access to a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InAppOwnershipType {
    /// Shared by a family member.
    FamilyShared,
    /// Purchased by the customer.
    Purchased,
}

impl InAppOwnershipType {
    /// Parses the claim spelling.
    #[must_use]
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "FAMILY_SHARED" => Some(Self::FamilyShared),
            "PURCHASED" => Some(Self::Purchased),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Product Type
// ============================================================================

/// Type of in-app purchase product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    /// Auto-renewable subscription.
    AutoRenewableSubscription,
    /// Non-consumable purchase.
    NonConsumable,
    /// Consumable purchase.
    Consumable,
    /// Non-renewing subscription.
    NonRenewingSubscription,
}

impl ProductType {
    /// Parses the claim spelling.
    #[must_use]
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "Auto-Renewable Subscription" => Some(Self::AutoRenewableSubscription),
            "Non-Consumable" => Some(Self::NonConsumable),
            "Consumable" => Some(Self::Consumable),
            "Non-Renewing Subscription" => Some(Self::NonRenewingSubscription),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Transaction Reason
// ============================================================================

/// Cause of a purchase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionReason {
    /// Customer-initiated purchase.
    Purchase,
    /// Automatic subscription renewal.
    Renewal,
}

impl TransactionReason {
    /// Parses the claim spelling.
    #[must_use]
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "PURCHASE" => Some(Self::Purchase),
            "RENEWAL" => Some(Self::Renewal),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Subscription Status
// ============================================================================

/// Auto-renewable subscription status carried by notification data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    /// Subscription is active.
    Active,
    /// Subscription has expired.
    Expired,
    /// Subscription is in a billing retry period.
    BillingRetry,
    /// Subscription is in a billing grace period.
    BillingGracePeriod,
    /// Subscription was revoked.
    Revoked,
}

impl SubscriptionStatus {
    /// Maps the numeric status claim.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Active),
            2 => Some(Self::Expired),
            3 => Some(Self::BillingRetry),
            4 => Some(Self::BillingGracePeriod),
            5 => Some(Self::Revoked),
            _ => None,
        }
    }
}
