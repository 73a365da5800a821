//! Stop ordering, waypoint assembly and navigation deep links.
//!
//! Everything in this crate is synchronous and free of I/O: it consumes
//! already-validated stops (or their resolved coordinates) and produces
//! plain values for the renderer and the CLI.

pub mod builder;
pub mod deeplink;
pub mod sequence;

pub use builder::{build_route, Route, RouteWaypoint};
pub use deeplink::{build_deep_links, DeepLink, DeepLinkConfig, DeepLinks, Truncation};
pub use sequence::{
    normalize, normalize_records, InvalidStopData, InvalidStopReason, SequenceOutcome,
};
