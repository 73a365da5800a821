//! In-memory render surface that records overlays and exports GeoJSON.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::RenderError;
use crate::path::DrawablePath;
use crate::surface::{Control, Marker, OverlayId, RenderSurface, SurfaceFactory};

#[derive(Debug, Clone, PartialEq)]
enum Overlay {
    Marker(Marker),
    Line(DrawablePath),
    Control(Control),
}

/// Lifecycle counters shared between a factory and the surfaces it builds.
#[derive(Debug, Default)]
pub struct SurfaceStats {
    created: AtomicUsize,
    live: AtomicUsize,
    peak_live: AtomicUsize,
    fail_next: AtomicBool,
}

impl SurfaceStats {
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Surfaces built and not yet disposed.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct GeoJsonSurface {
    overlays: BTreeMap<OverlayId, Overlay>,
    next_id: OverlayId,
    disposed: bool,
    stats: Arc<SurfaceStats>,
}

impl GeoJsonSurface {
    fn new(stats: Arc<SurfaceStats>) -> Self {
        Self {
            overlays: BTreeMap::new(),
            next_id: 1,
            disposed: false,
            stats,
        }
    }

    fn push(&mut self, overlay: Overlay) -> OverlayId {
        let id = self.next_id;
        self.next_id += 1;
        if self.disposed {
            tracing::warn!(overlay_id = id, "draw on disposed surface ignored");
        } else {
            self.overlays.insert(id, overlay);
        }
        id
    }

    #[must_use]
    pub fn markers(&self) -> Vec<&Marker> {
        self.overlays
            .values()
            .filter_map(|o| match o {
                Overlay::Marker(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers().len()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.overlays
            .values()
            .filter(|o| matches!(o, Overlay::Line(_)))
            .count()
    }

    #[must_use]
    pub fn control_count(&self) -> usize {
        self.overlays
            .values()
            .filter(|o| matches!(o, Overlay::Control(_)))
            .count()
    }

    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Exports the current overlays as a GeoJSON `FeatureCollection`.
    ///
    /// Markers become `Point` features, the route becomes a `LineString`,
    /// and unresolved-stop notices are listed under a top-level
    /// `unresolved` member.
    #[must_use]
    pub fn to_geojson(&self) -> Value {
        let mut features = Vec::new();
        let mut unresolved = Vec::new();

        for overlay in self.overlays.values() {
            match overlay {
                Overlay::Marker(m) => features.push(json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [m.coordinates.lon, m.coordinates.lat],
                    },
                    "properties": {
                        "kind": m.kind,
                        "label": m.label,
                        "stop_id": m.stop_id,
                        "sequence": m.sequence,
                    },
                })),
                Overlay::Line(path) => features.push(json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": path
                            .coordinates
                            .iter()
                            .map(|c| [c.lon, c.lat])
                            .collect::<Vec<_>>(),
                    },
                    "properties": {
                        "kind": "route",
                        "distance_m": path.distance_m,
                        "duration_s": path.duration_s,
                    },
                })),
                Overlay::Control(control) => unresolved.push(json!(control)),
            }
        }

        json!({
            "type": "FeatureCollection",
            "features": features,
            "unresolved": unresolved,
        })
    }
}

impl RenderSurface for GeoJsonSurface {
    fn draw_marker(&mut self, marker: &Marker) -> OverlayId {
        self.push(Overlay::Marker(marker.clone()))
    }

    fn draw_line(&mut self, path: &DrawablePath) -> OverlayId {
        self.push(Overlay::Line(path.clone()))
    }

    fn add_control(&mut self, control: &Control) -> OverlayId {
        self.push(Overlay::Control(control.clone()))
    }

    fn remove(&mut self, id: OverlayId) {
        self.overlays.remove(&id);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.overlays.clear();
        self.disposed = true;
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for GeoJsonSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeoJsonSurfaceFactory {
    stats: Arc<SurfaceStats>,
}

impl GeoJsonSurfaceFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> Arc<SurfaceStats> {
        Arc::clone(&self.stats)
    }

    /// Makes the next `create` call fail with [`RenderError::SurfaceInit`].
    pub fn fail_next(&self) {
        self.stats.fail_next.store(true, Ordering::SeqCst);
    }
}

impl SurfaceFactory for GeoJsonSurfaceFactory {
    type Surface = GeoJsonSurface;

    fn create(&self) -> Result<GeoJsonSurface, RenderError> {
        if self.stats.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RenderError::SurfaceInit(
                "map container is not available".to_owned(),
            ));
        }
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_live.fetch_max(live, Ordering::SeqCst);
        Ok(GeoJsonSurface::new(Arc::clone(&self.stats)))
    }
}

#[cfg(test)]
mod tests {
    use tourmap_core::{Coordinates, StopId, UnresolvedReason};

    use super::*;
    use crate::surface::MarkerKind;

    fn depot_marker() -> Marker {
        Marker {
            kind: MarkerKind::Depot,
            coordinates: Coordinates {
                lat: 52.5,
                lon: 13.4,
            },
            label: "Depot".to_owned(),
            stop_id: None,
            sequence: None,
        }
    }

    #[test]
    fn remove_and_dispose_clear_overlays() {
        let factory = GeoJsonSurfaceFactory::new();
        let mut surface = factory.create().unwrap();
        let a = surface.draw_marker(&depot_marker());
        let b = surface.draw_marker(&depot_marker());
        assert_ne!(a, b);
        surface.remove(a);
        assert_eq!(surface.marker_count(), 1);

        surface.dispose();
        assert_eq!(surface.overlay_count(), 0);
        assert_eq!(factory.stats().live(), 0);
    }

    #[test]
    fn dispose_is_idempotent_and_drop_releases() {
        let factory = GeoJsonSurfaceFactory::new();
        {
            let mut surface = factory.create().unwrap();
            surface.dispose();
            surface.dispose();
        }
        {
            let _surface = factory.create().unwrap();
        }
        let stats = factory.stats();
        assert_eq!(stats.created(), 2);
        assert_eq!(stats.live(), 0);
        assert_eq!(stats.peak_live(), 1);
    }

    #[test]
    fn fail_next_affects_one_create() {
        let factory = GeoJsonSurfaceFactory::new();
        factory.fail_next();
        assert!(matches!(
            factory.create(),
            Err(RenderError::SurfaceInit(_))
        ));
        assert!(factory.create().is_ok());
    }

    #[test]
    fn geojson_export_uses_lon_lat_order() {
        let factory = GeoJsonSurfaceFactory::new();
        let mut surface = factory.create().unwrap();
        surface.draw_marker(&depot_marker());
        surface.draw_line(&DrawablePath {
            coordinates: vec![
                Coordinates { lat: 52.5, lon: 13.4 },
                Coordinates { lat: 52.6, lon: 13.5 },
            ],
            distance_m: None,
            duration_s: None,
        });
        surface.add_control(&Control::UnresolvedNotice {
            stop_id: StopId(2),
            address: "###invalid###".to_owned(),
            reason: UnresolvedReason::NotFound,
        });

        let doc = surface.to_geojson();
        assert_eq!(doc["type"], "FeatureCollection");
        let features = doc["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([13.4, 52.5]));
        assert_eq!(features[0]["properties"]["kind"], "depot");
        assert_eq!(features[1]["geometry"]["type"], "LineString");
        assert_eq!(doc["unresolved"][0]["stop_id"], 2);
    }
}
