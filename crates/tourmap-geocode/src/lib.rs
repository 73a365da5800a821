//! Address → coordinate resolution.
//!
//! [`GeocodeResolver`] sits in front of an [`AddressLookup`] (in production a
//! [`NominatimClient`]) and adds normalization, a TTL-bounded LRU cache,
//! per-address deduplication of in-flight lookups, a request throttle, and
//! retry with exponential backoff. It never returns an error: every failure
//! degrades to [`tourmap_core::Resolution::Unresolved`].

pub mod cache;
pub mod client;
pub mod error;
pub mod lookup;
pub mod normalize;
pub(crate) mod retry;
pub mod resolver;
pub mod throttle;
pub mod types;

pub use cache::{GeocodeCache, GeocodeCacheEntry};
pub use client::NominatimClient;
pub use error::GeocodeError;
pub use lookup::AddressLookup;
pub use normalize::normalize_address;
pub use resolver::{GeocodeResolver, ResolverOptions};
pub use throttle::Throttle;
