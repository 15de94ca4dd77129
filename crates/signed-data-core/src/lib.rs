// crates/signed-data-core/src/lib.rs
// ============================================================================
// Module: Signed Data Core Library
// Description: Public API surface for the signed-data domain model.
// Purpose: Expose environments, payload claims, and the verification taxonomy.
// Dependencies: crate::{environment, error, hashing, payload}
// ============================================================================

//! ## Overview
//! `signed-data-core` holds the backend-agnostic model shared by the config
//! and verifier crates: the deployment [`Environment`], the decoded claim sets
//! for transactions, renewal info, and server notifications, and the closed
//! [`VerificationStatus`] taxonomy every rejection maps onto.
//!
//! Nothing in this crate performs I/O or cryptography.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod environment;
pub mod error;
pub mod hashing;
pub mod payload;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use environment::Environment;
pub use error::CertificatePosition;
pub use error::VerificationError;
pub use error::VerificationStatus;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::hash_bytes;
pub use payload::ExternalPurchaseToken;
pub use payload::InAppOwnershipType;
pub use payload::NotificationBody;
pub use payload::NotificationBodyError;
pub use payload::NotificationData;
pub use payload::NotificationPayload;
pub use payload::NotificationSummary;
pub use payload::PayloadKind;
pub use payload::ProductType;
pub use payload::RawNotificationPayload;
pub use payload::RenewalInfoPayload;
pub use payload::SubscriptionStatus;
pub use payload::TransactionPayload;
pub use payload::TransactionReason;
