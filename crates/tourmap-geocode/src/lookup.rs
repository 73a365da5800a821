use std::future::Future;

use tourmap_core::Coordinates;

use crate::error::GeocodeError;

/// External address-resolution capability.
///
/// `Ok(None)` means the service answered and had no match; that outcome is
/// final and never retried. `Err` is reserved for failures where asking
/// again might help (or might not; see the resolver's retry policy).
pub trait AddressLookup: Send + Sync + 'static {
    fn lookup(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, GeocodeError>> + Send;
}
