//! Process-lifetime geocode cache.
//!
//! Keyed by normalized address. Entries expire after a fixed TTL and the
//! total number of entries is bounded by LRU eviction. Expiry is measured
//! with `tokio::time::Instant`, so tests can drive it with a paused clock.

use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;
use tourmap_core::Coordinates;

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCacheEntry {
    pub normalized_address: String,
    pub coordinates: Coordinates,
    pub resolved_at: DateTime<Utc>,
    pub ttl: Duration,
    stored_at: Instant,
}

impl GeocodeCacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

pub struct GeocodeCache {
    entries: Mutex<LruCache<String, GeocodeCacheEntry>>,
    ttl: Duration,
}

impl GeocodeCache {
    #[must_use]
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Returns the live entry for `key`, evicting it first if it has expired.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<GeocodeCacheEntry> {
        let mut entries = self.entries.lock();
        let live = entries.get(key).map(|e| e.is_live(Instant::now()))?;
        if live {
            entries.get(key).cloned()
        } else {
            entries.pop(key);
            None
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Coordinates> {
        self.entry(key).map(|e| e.coordinates)
    }

    /// Writes or refreshes the entry for `key`. At most one entry per key.
    pub fn insert(&self, key: &str, coordinates: Coordinates) {
        let entry = GeocodeCacheEntry {
            normalized_address: key.to_owned(),
            coordinates,
            resolved_at: Utc::now(),
            ttl: self.ttl,
            stored_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.entries.lock().push(key.to_owned(), entry) {
            if evicted != key {
                tracing::debug!(evicted, "geocode cache full; evicted least recently used");
            }
        }
    }

    /// Number of stored entries, including any that have expired but have
    /// not been looked up since.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for GeocodeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodeCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
