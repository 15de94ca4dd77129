// crates/signed-data-core/src/environment.rs
// ============================================================================
// Module: Deployment Environment
// Description: The environment a verifier instance is bound to.
// Purpose: Map configuration names and claim strings onto one closed enum.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Signed payloads declare the environment that produced them using the
//! store's own spelling (`Sandbox`, `Production`, `LocalTesting`), while
//! configuration files use `snake_case`. [`Environment`] understands both and
//! never treats an unknown claim string as a match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Deployment environment a verifier accepts payloads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Store sandbox.
    Sandbox,
    /// Live store.
    Production,
    /// Locally generated test data (e.g. from an IDE test session).
    LocalTesting,
}

impl Environment {
    /// Returns the claim spelling used inside signed payloads.
    #[must_use]
    pub const fn as_claim_str(self) -> &'static str {
        match self {
            Self::Sandbox => "Sandbox",
            Self::Production => "Production",
            Self::LocalTesting => "LocalTesting",
        }
    }

    /// Parses the claim spelling used inside signed payloads.
    ///
    /// Matching is exact; anything else returns `None`.
    #[must_use]
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            "Sandbox" => Some(Self::Sandbox),
            "Production" => Some(Self::Production),
            "LocalTesting" => Some(Self::LocalTesting),
            _ => None,
        }
    }

    /// Returns true when the environment requires an app identifier.
    #[must_use]
    pub const fn requires_app_apple_id(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns true when `claim` names this environment.
    #[must_use]
    pub fn matches_claim(self, claim: Option<&str>) -> bool {
        claim.and_then(Self::from_claim) == Some(self)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_claim_str())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Environment;

    #[test]
    fn claim_names_are_exact() {
        assert_eq!(Environment::from_claim("Sandbox"), Some(Environment::Sandbox));
        assert_eq!(Environment::from_claim("sandbox"), None);
        assert_eq!(Environment::from_claim(" Production"), None);
    }

    #[test]
    fn missing_claim_never_matches() {
        assert!(!Environment::Sandbox.matches_claim(None));
        assert!(!Environment::Production.matches_claim(Some("Xcode")));
        assert!(Environment::LocalTesting.matches_claim(Some("LocalTesting")));
    }

    #[test]
    fn only_production_requires_app_id() {
        assert!(Environment::Production.requires_app_apple_id());
        assert!(!Environment::Sandbox.requires_app_apple_id());
        assert!(!Environment::LocalTesting.requires_app_apple_id());
    }
}
