// crates/signed-data-config/src/lib.rs
// ============================================================================
// Module: Signed Data Config Library
// Description: Configuration model and validation for signed-data verifiers.
// Purpose: Single source of truth for signed-data.toml semantics.
// Dependencies: signed-data-core, serde, toml
// ============================================================================

//! ## Overview
//! `signed-data-config` loads verifier settings from TOML with strict, fail-closed
//! validation and converts them into the runtime [`VerifierConfig`] consumed by
//! `signed-data-verifier`. A [`VerifierConfig`] can also be built directly in
//! code; both paths run the same validation.
//!
//! Security posture: config inputs and root certificate files are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use verifier::VerifierConfig;
