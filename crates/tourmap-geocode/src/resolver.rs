//! Cached, deduplicated, throttled address resolution.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tourmap_core::{Coordinates, Resolution, UnresolvedReason};

use crate::cache::GeocodeCache;
use crate::lookup::AddressLookup;
use crate::normalize::normalize_address;
use crate::retry::{is_retriable, retry_with_backoff};
use crate::throttle::Throttle;

type InFlight = Shared<BoxFuture<'static, Resolution>>;

/// Tuning knobs for [`GeocodeResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    pub cache_ttl: Duration,
    pub cache_capacity: NonZeroUsize,
    pub max_in_flight: usize,
    pub min_interval: Duration,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl ResolverOptions {
    #[must_use]
    pub fn from_app_config(config: &tourmap_core::AppConfig) -> Self {
        Self {
            cache_ttl: Duration::from_secs(config.geocode_cache_ttl_secs),
            cache_capacity: NonZeroUsize::new(config.geocode_cache_capacity)
                .unwrap_or(NonZeroUsize::MIN),
            max_in_flight: config.geocoder_max_in_flight,
            min_interval: Duration::from_millis(config.geocoder_min_interval_ms),
            max_retries: config.geocoder_max_retries,
            backoff_base_ms: config.geocoder_backoff_base_ms,
        }
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(86_400),
            cache_capacity: NonZeroUsize::new(1024).unwrap_or(NonZeroUsize::MIN),
            max_in_flight: 1,
            min_interval: Duration::from_secs(1),
            max_retries: 3,
            backoff_base_ms: 500,
        }
    }
}

struct Inner<L> {
    lookup: L,
    cache: GeocodeCache,
    throttle: Throttle,
    in_flight: Mutex<HashMap<String, (u64, InFlight)>>,
    next_flight: AtomicU64,
    max_retries: u32,
    backoff_base_ms: u64,
    external_calls: AtomicU64,
}

/// Resolves free-text addresses to coordinates.
///
/// Cheap to clone; clones share the cache, the throttle and the in-flight
/// table. [`GeocodeResolver::resolve`] never fails: exhausted retries and
/// unknown addresses both come back as [`Resolution::Unresolved`].
pub struct GeocodeResolver<L> {
    inner: Arc<Inner<L>>,
}

impl<L> Clone for GeocodeResolver<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: AddressLookup> GeocodeResolver<L> {
    #[must_use]
    pub fn new(lookup: L, options: &ResolverOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                lookup,
                cache: GeocodeCache::new(options.cache_capacity, options.cache_ttl),
                throttle: Throttle::new(options.max_in_flight, options.min_interval),
                in_flight: Mutex::new(HashMap::new()),
                next_flight: AtomicU64::new(0),
                max_retries: options.max_retries,
                backoff_base_ms: options.backoff_base_ms,
                external_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Resolve one address.
    ///
    /// A live cache entry is returned without any external call. Otherwise
    /// concurrent callers for the same normalized address share a single
    /// lookup. Successful lookups refresh the cache.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn resolve(&self, address: &str) -> Resolution {
        let key = normalize_address(address);
        if key.is_empty() {
            return Resolution::Unresolved {
                reason: UnresolvedReason::BlankAddress,
            };
        }

        if let Some(coordinates) = self.inner.cache.get(&key) {
            tracing::debug!(address = %key, "geocode cache hit");
            return Resolution::Resolved { coordinates };
        }

        let shared = {
            let mut in_flight = self.inner.in_flight.lock();
            // Re-check under the lock: a lookup for this key may have
            // finished and left the table since the first cache check.
            if let Some(coordinates) = self.inner.cache.get(&key) {
                return Resolution::Resolved { coordinates };
            }
            if let Some((_, existing)) = in_flight.get(&key) {
                tracing::debug!(address = %key, "joining in-flight geocode lookup");
                existing.clone()
            } else {
                let flight_id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
                let fut = self.inner.start_lookup(key.clone(), flight_id);
                in_flight.insert(key, (flight_id, fut.clone()));
                fut
            }
        };

        shared.await
    }

    /// Resolve several addresses, returning results in input order.
    ///
    /// Up to `concurrency` resolutions are driven at once; the throttle still
    /// bounds how many reach the external service.
    pub async fn resolve_many<S: AsRef<str>>(
        &self,
        addresses: &[S],
        concurrency: usize,
    ) -> Vec<Resolution> {
        stream::iter(addresses)
            .map(|a| self.resolve(a.as_ref()))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Live cached coordinates for `address`, without triggering a lookup.
    #[must_use]
    pub fn cached(&self, address: &str) -> Option<Coordinates> {
        self.inner.cache.get(&normalize_address(address))
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Number of requests sent to the external service, retries included.
    #[must_use]
    pub fn external_calls(&self) -> u64 {
        self.inner.external_calls.load(Ordering::Relaxed)
    }
}

impl<L: AddressLookup> Inner<L> {
    /// Runs the lookup on its own task so that it completes, releases its
    /// throttle permit and clears its in-flight entry even when every
    /// caller has been dropped.
    fn start_lookup(self: &Arc<Self>, key: String, flight_id: u64) -> InFlight {
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let resolution = inner.lookup_uncached(&key).await;
            let mut in_flight = inner.in_flight.lock();
            if in_flight.get(&key).is_some_and(|(id, _)| *id == flight_id) {
                in_flight.remove(&key);
            }
            resolution
        });

        async move {
            handle.await.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "geocode lookup task failed");
                Resolution::Unresolved {
                    reason: UnresolvedReason::ServiceUnavailable,
                }
            })
        }
        .boxed()
        .shared()
    }

    async fn lookup_uncached(&self, key: &str) -> Resolution {
        let result = retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let _permit = self.throttle.acquire().await?;
            self.external_calls.fetch_add(1, Ordering::Relaxed);
            self.lookup.lookup(key).await
        })
        .await;

        match result {
            Ok(Some(coordinates)) => {
                self.cache.insert(key, coordinates);
                Resolution::Resolved { coordinates }
            }
            Ok(None) => {
                tracing::warn!(address = %key, "address not found by geocoder");
                Resolution::Unresolved {
                    reason: UnresolvedReason::NotFound,
                }
            }
            Err(err) => {
                tracing::warn!(
                    address = %key,
                    error = %err,
                    retriable = is_retriable(&err),
                    "geocoding failed; marking address unresolved"
                );
                Resolution::Unresolved {
                    reason: UnresolvedReason::ServiceUnavailable,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
