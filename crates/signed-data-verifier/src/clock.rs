// crates/signed-data-verifier/src/clock.rs
// ============================================================================
// Module: Clock
// Description: Wall-clock seam for expiry and validity decisions.
// Purpose: Let cache expiry and online-mode validity use an injectable time.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Cache expiry and the online effective date read the time through
//! [`Clock`], so tests can pin or advance it.

use time::OffsetDateTime;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
