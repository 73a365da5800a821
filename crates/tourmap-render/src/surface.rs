//! Render-surface capability.
//!
//! The renderer depends only on these traits. A concrete map provider (or
//! the in-memory [`crate::GeoJsonSurface`]) implements them.

use serde::Serialize;
use tourmap_core::{Coordinates, StopId, UnresolvedReason};

use crate::error::RenderError;
use crate::path::DrawablePath;

/// Handle for one drawn overlay, unique within a surface.
pub type OverlayId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Depot,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub coordinates: Coordinates,
    pub label: String,
    pub stop_id: Option<StopId>,
    /// 1-based position in the tour; `None` for the depot.
    pub sequence: Option<usize>,
}

/// Non-geometric UI attached to the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    /// A stop that could not be placed on the map.
    UnresolvedNotice {
        stop_id: StopId,
        address: String,
        reason: UnresolvedReason,
    },
}

pub trait RenderSurface: Send + 'static {
    fn draw_marker(&mut self, marker: &Marker) -> OverlayId;

    fn draw_line(&mut self, path: &DrawablePath) -> OverlayId;

    fn add_control(&mut self, control: &Control) -> OverlayId;

    /// Removes one overlay. Unknown ids are ignored.
    fn remove(&mut self, id: OverlayId);

    /// Releases the surface and everything attached to it. The surface must
    /// not be drawn on afterwards.
    fn dispose(&mut self);
}

pub trait SurfaceFactory: Send + 'static {
    type Surface: RenderSurface;

    /// # Errors
    ///
    /// Returns [`RenderError::SurfaceInit`] when the surface cannot be built.
    fn create(&self) -> Result<Self::Surface, RenderError>;
}
