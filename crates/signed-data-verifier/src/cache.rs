// crates/signed-data-verifier/src/cache.rs
// ============================================================================
// Module: Chain Cache
// Description: Bounded, time-limited memo of validated chains.
// Purpose: Skip repeated chain and OCSP work for recently accepted chains.
// Dependencies: signed-data-core, lru, time
// ============================================================================

//! ## Overview
//! Maps the exact `x5c` strings of an accepted chain to the leaf key they
//! produced. Only successful validations are stored, and only in online mode.
//!
//! Invariants:
//! - At most `max_entries` entries are retained; the least recently used
//!   entry is evicted first.
//! - An entry whose age reaches the TTL is treated as absent and dropped on
//!   the next lookup or insert.
//! - A hit never extends an entry's lifetime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use signed_data_core::HashAlgorithm;
use signed_data_core::HashDigest;
use signed_data_core::hash_bytes;
use time::OffsetDateTime;

use crate::chain::LeafKey;
use crate::clock::Clock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default entry capacity.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 32;
/// Default entry lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
/// Separator between certificates in a fingerprint.
const FINGERPRINT_SEPARATOR: &str = "|";

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// Identity of a chain: its certificate strings joined in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainFingerprint(String);

impl ChainFingerprint {
    /// Builds the fingerprint for an `x5c` array.
    #[must_use]
    pub fn from_chain(certificates: &[String]) -> Self {
        Self(certificates.join(FINGERPRINT_SEPARATOR))
    }

    /// Returns the raw fingerprint.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a SHA-256 digest suitable for logs.
    #[must_use]
    pub fn digest(&self) -> HashDigest {
        hash_bytes(HashAlgorithm::Sha256, self.0.as_bytes())
    }
}

/// How the cache participated in a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheDisposition {
    /// Leaf key served from the cache.
    Hit,
    /// Chain validated and stored.
    Miss,
    /// Cache not consulted (offline mode or no chain reached).
    Bypass,
}

impl CacheDisposition {
    /// Returns the stable label for this disposition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Bypass => "bypass",
        }
    }
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// One cached chain.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Leaf key produced by validation.
    key: LeafKey,
    /// Insertion time; expiry is measured from here.
    inserted_at: OffsetDateTime,
}

/// Thread-safe chain cache.
pub struct ChainCache {
    /// Recency-ordered entries; absent when the capacity is zero.
    entries: Option<Mutex<LruCache<ChainFingerprint, CacheEntry>>>,
    /// Capacity.
    max_entries: usize,
    /// Entry lifetime.
    ttl: Duration,
    /// Time source for expiry.
    clock: Arc<dyn Clock>,
}

impl ChainCache {
    /// Creates a cache with explicit bounds. A zero capacity stores nothing.
    #[must_use]
    pub fn new(max_entries: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: NonZeroUsize::new(max_entries).map(|cap| Mutex::new(LruCache::new(cap))),
            max_entries,
            ttl,
            clock,
        }
    }

    /// Returns the cached leaf key for a live entry and marks it recently used.
    #[must_use]
    pub fn get_if_present(&self, fingerprint: &ChainFingerprint) -> Option<LeafKey> {
        let now = self.clock.now();
        let mut entries = self.entries.as_ref()?.lock().ok()?;
        if self.is_expired(entries.peek(fingerprint)?, now) {
            entries.pop(fingerprint);
            return None;
        }
        entries.get(fingerprint).map(|entry| entry.key.clone())
    }

    /// Stores a validated chain. When full, expired entries are dropped
    /// before the least recently used live entry is evicted.
    pub fn put(&self, fingerprint: ChainFingerprint, key: LeafKey) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        let now = self.clock.now();
        let Ok(mut entries) = entries.lock() else {
            return;
        };
        if !entries.contains(&fingerprint) && entries.len() >= self.max_entries {
            let expired: Vec<ChainFingerprint> = entries
                .iter()
                .filter(|(_, entry)| self.is_expired(entry, now))
                .map(|(fingerprint, _)| fingerprint.clone())
                .collect();
            for stale in &expired {
                entries.pop(stale);
            }
        }
        entries.put(
            fingerprint,
            CacheEntry {
                key,
                inserted_at: now,
            },
        );
    }

    /// Returns the number of stored entries, including unswept expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|entries| entries.lock().ok().map(|entries| entries.len()))
            .unwrap_or(0)
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Returns true when `entry` has reached the TTL at `now`.
    fn is_expired(&self, entry: &CacheEntry, now: OffsetDateTime) -> bool {
        now - entry.inserted_at >= self.ttl
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
