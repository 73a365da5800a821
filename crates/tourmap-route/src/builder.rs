//! Assembles the ordered waypoint list handed to the path engine.

use serde::Serialize;
use tourmap_core::{Coordinates, Depot, ResolvedStop, StopId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteWaypoint {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
    /// `None` for the depot.
    pub stop_id: Option<StopId>,
}

impl RouteWaypoint {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Ordered waypoints for one resolution cycle. Index 0 is always the depot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub waypoints: Vec<RouteWaypoint>,
}

impl Route {
    /// A line needs at least two points; below that only markers are drawn
    /// and the path engine must not be called.
    #[must_use]
    pub fn has_line(&self) -> bool {
        self.waypoints.len() >= 2
    }

    /// Waypoints after the depot.
    #[must_use]
    pub fn stop_waypoints(&self) -> &[RouteWaypoint] {
        self.waypoints.get(1..).unwrap_or_default()
    }
}

/// Build the waypoint list: the depot, then every resolved stop in the
/// order given. Stops without coordinates are skipped here; they stay in
/// the stop list shown to the user.
#[must_use]
pub fn build_route(depot: &Depot, resolved_stops: &[ResolvedStop]) -> Route {
    let mut waypoints = Vec::with_capacity(resolved_stops.len() + 1);
    waypoints.push(RouteWaypoint {
        lat: depot.coordinates.lat,
        lon: depot.coordinates.lon,
        label: depot.label.clone(),
        stop_id: None,
    });

    waypoints.extend(resolved_stops.iter().filter_map(|resolved| {
        let coordinates = resolved.coordinates()?;
        Some(RouteWaypoint {
            lat: coordinates.lat,
            lon: coordinates.lon,
            label: stop_label(resolved),
            stop_id: Some(resolved.stop.id),
        })
    }));

    Route { waypoints }
}

fn stop_label(resolved: &ResolvedStop) -> String {
    if resolved.stop.customer_name.is_empty() {
        resolved.stop.address.clone()
    } else {
        resolved.stop.customer_name.clone()
    }
}
