//! The map renderer state machine.
//!
//! `Idle → Resolving → Drawn`, back through `Idle` (full teardown) on every
//! new stop list. A surface that fails to initialize leaves the renderer in
//! `Unavailable` until the next stop list.

use serde::Serialize;
use tourmap_core::{Depot, Resolution, ResolvedStop, Stop, StopId, UnresolvedReason};
use tourmap_route::Route;

use crate::cycle::{CycleEvent, PathOutcome};
use crate::path::DrawablePath;
use crate::surface::{Control, Marker, MarkerKind, OverlayId, RenderSurface, SurfaceFactory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenderState {
    Idle,
    Resolving,
    Drawn,
    Unavailable { reason: String },
}

/// A stop that is listed for the user but has no marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedStop {
    pub stop_id: StopId,
    pub customer_name: String,
    pub address: String,
    pub reason: UnresolvedReason,
}

/// What the user currently sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSnapshot {
    pub state: RenderState,
    pub generation: u64,
    pub markers: Vec<Marker>,
    pub has_line: bool,
    pub unresolved: Vec<UnresolvedStop>,
    pub path: Option<DrawablePath>,
}

impl MapSnapshot {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            state: RenderState::Idle,
            generation: 0,
            markers: Vec::new(),
            has_line: false,
            unresolved: Vec::new(),
            path: None,
        }
    }

    /// True once the cycle has either finished drawing or given up on the
    /// surface.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(
            self.state,
            RenderState::Drawn | RenderState::Unavailable { .. }
        )
    }
}

pub struct MapRenderer<F: SurfaceFactory> {
    factory: F,
    depot: Depot,
    surface: Option<F::Surface>,
    overlays: Vec<OverlayId>,
    state: RenderState,
    generation: u64,
    stops: Vec<Stop>,
    resolved: Vec<Option<ResolvedStop>>,
    markers: Vec<Marker>,
    unresolved: Vec<UnresolvedStop>,
    route: Option<Route>,
    path: Option<DrawablePath>,
    discarded_events: u64,
}

impl<F: SurfaceFactory> MapRenderer<F> {
    #[must_use]
    pub fn new(factory: F, depot: Depot) -> Self {
        Self {
            factory,
            depot,
            surface: None,
            overlays: Vec::new(),
            state: RenderState::Idle,
            generation: 0,
            stops: Vec::new(),
            resolved: Vec::new(),
            markers: Vec::new(),
            unresolved: Vec::new(),
            route: None,
            path: None,
            discarded_events: 0,
        }
    }

    /// Starts a new cycle for `stops` and returns its generation.
    ///
    /// Everything belonging to the previous cycle is removed and the old
    /// surface disposed before a new surface is built. The depot marker is
    /// drawn right away.
    pub fn begin_cycle(&mut self, stops: Vec<Stop>) -> u64 {
        self.teardown();
        self.generation += 1;
        self.resolved = vec![None; stops.len()];
        self.stops = stops;

        match self.factory.create() {
            Ok(surface) => {
                self.surface = Some(surface);
                let depot = Marker {
                    kind: MarkerKind::Depot,
                    coordinates: self.depot.coordinates,
                    label: self.depot.label.clone(),
                    stop_id: None,
                    sequence: None,
                };
                self.draw_marker(depot);
                self.state = RenderState::Resolving;
            }
            Err(err) => {
                tracing::error!(
                    generation = self.generation,
                    error = %err,
                    "render surface unavailable for this cycle"
                );
                self.state = RenderState::Unavailable {
                    reason: err.to_string(),
                };
            }
        }
        self.generation
    }

    /// Applies one cycle event. Returns `false` when the event was dropped.
    pub fn apply(&mut self, event: CycleEvent) -> bool {
        if event.generation() != self.generation {
            self.discarded_events += 1;
            tracing::debug!(
                event_generation = event.generation(),
                current_generation = self.generation,
                "discarding result from superseded cycle"
            );
            return false;
        }
        if self.state != RenderState::Resolving {
            tracing::debug!(
                generation = self.generation,
                state = ?self.state,
                "ignoring cycle event outside resolving state"
            );
            return false;
        }

        match event {
            CycleEvent::StopSettled {
                index, resolved, ..
            } => self.settle_stop(index, resolved),
            CycleEvent::RouteReady { route, path, .. } => {
                self.finish(route, path);
                true
            }
        }
    }

    fn settle_stop(&mut self, index: usize, resolved: ResolvedStop) -> bool {
        let Some(slot) = self.resolved.get_mut(index) else {
            tracing::warn!(index, "stop index out of range for current cycle");
            return false;
        };
        if slot.is_some() || self.stops[index].id != resolved.stop.id {
            tracing::warn!(index, stop_id = %resolved.stop.id, "unexpected stop result ignored");
            return false;
        }
        *slot = Some(resolved.clone());

        let stop = &resolved.stop;
        match resolved.resolution {
            Resolution::Resolved { coordinates } => {
                let label = if stop.customer_name.is_empty() {
                    stop.address.clone()
                } else {
                    stop.customer_name.clone()
                };
                self.draw_marker(Marker {
                    kind: MarkerKind::Stop,
                    coordinates,
                    label,
                    stop_id: Some(stop.id),
                    sequence: Some(index + 1),
                });
            }
            Resolution::Unresolved { reason } => {
                tracing::warn!(stop_id = %stop.id, address = %stop.address, %reason, "stop left off the map");
                let control = Control::UnresolvedNotice {
                    stop_id: stop.id,
                    address: stop.address.clone(),
                    reason,
                };
                if let Some(surface) = self.surface.as_mut() {
                    self.overlays.push(surface.add_control(&control));
                }
                self.unresolved.push(UnresolvedStop {
                    stop_id: stop.id,
                    customer_name: stop.customer_name.clone(),
                    address: stop.address.clone(),
                    reason,
                });
            }
        }
        true
    }

    fn finish(&mut self, route: Route, path: PathOutcome) {
        match path {
            PathOutcome::Computed(path) => {
                if let Some(surface) = self.surface.as_mut() {
                    self.overlays.push(surface.draw_line(&path));
                }
                self.path = Some(path);
            }
            PathOutcome::Failed(reason) => {
                tracing::warn!(generation = self.generation, %reason, "route line not drawn");
            }
            PathOutcome::NotRequested => {}
        }
        self.route = Some(route);
        self.state = RenderState::Drawn;
    }

    fn draw_marker(&mut self, marker: Marker) {
        if let Some(surface) = self.surface.as_mut() {
            self.overlays.push(surface.draw_marker(&marker));
            self.markers.push(marker);
        }
    }

    /// Removes every overlay, disposes the surface and clears cycle state.
    pub fn teardown(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            for id in self.overlays.drain(..) {
                surface.remove(id);
            }
            surface.dispose();
        }
        self.overlays.clear();
        self.stops.clear();
        self.resolved.clear();
        self.markers.clear();
        self.unresolved.clear();
        self.route = None;
        self.path = None;
        self.state = RenderState::Idle;
    }

    #[must_use]
    pub fn snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            state: self.state.clone(),
            generation: self.generation,
            markers: self.markers.clone(),
            has_line: self.path.is_some(),
            unresolved: self.unresolved.clone(),
            path: self.path.clone(),
        }
    }

    /// Short human-readable status, including the textual fallback when the
    /// surface could not be built.
    #[must_use]
    pub fn status_text(&self) -> String {
        match &self.state {
            RenderState::Idle => "no tour selected".to_owned(),
            RenderState::Resolving => {
                let settled = self.resolved.iter().filter(|r| r.is_some()).count();
                format!("resolving addresses ({settled}/{})", self.stops.len())
            }
            RenderState::Drawn => {
                let placed = self.markers.len().saturating_sub(1);
                if self.unresolved.is_empty() {
                    format!("{placed} stops on the map")
                } else {
                    format!(
                        "{placed} stops on the map, {} unresolved",
                        self.unresolved.len()
                    )
                }
            }
            RenderState::Unavailable { reason } => format!("map unavailable: {reason}"),
        }
    }

    #[must_use]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.surface.is_some()
    }

    #[must_use]
    pub fn surface(&self) -> Option<&F::Surface> {
        self.surface.as_ref()
    }

    /// The stops of the current cycle.
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Settled stops of the current cycle, in stop order.
    #[must_use]
    pub fn resolved_stops(&self) -> Vec<ResolvedStop> {
        self.resolved.iter().flatten().cloned().collect()
    }

    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Events dropped because they belonged to a superseded cycle.
    #[must_use]
    pub fn discarded_events(&self) -> u64 {
        self.discarded_events
    }
}

#[cfg(test)]
#[path = "renderer_test.rs"]
mod tests;
