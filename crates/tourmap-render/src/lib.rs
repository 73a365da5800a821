//! Map rendering for a single delivery tour.
//!
//! The [`MapRenderer`] owns exactly one render surface at a time and moves
//! through `Idle → Resolving → Drawn` for each stop list. Geocoding happens
//! in a [`cycle`] task that reports per-stop results as they settle and a
//! final route once every resolution has settled. [`TourSession`] ties the
//! two together and supersedes in-progress cycles when a new stop list
//! arrives.

pub mod cycle;
pub mod error;
pub mod geojson;
pub mod path;
pub mod renderer;
pub mod session;
pub mod surface;

pub use cycle::{spawn_cycle, CycleContext, CycleEvent, PathOutcome, DEFAULT_CYCLE_CONCURRENCY};
pub use error::{PathError, RenderError};
pub use geojson::{GeoJsonSurface, GeoJsonSurfaceFactory, SurfaceStats};
pub use path::{DrawablePath, OsrmPathEngine, PathEngine, StraightLinePathEngine};
pub use renderer::{MapRenderer, MapSnapshot, RenderState, UnresolvedStop};
pub use session::TourSession;
pub use surface::{Control, Marker, MarkerKind, OverlayId, RenderSurface, SurfaceFactory};
