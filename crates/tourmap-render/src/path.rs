//! Path-computation capability: ordered waypoints in, drawable polyline out.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tourmap_core::Coordinates;
use tourmap_route::RouteWaypoint;

use crate::error::PathError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawablePath {
    pub coordinates: Vec<Coordinates>,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
}

/// Computes a drawable path through waypoints, in order.
///
/// Callers must pass at least two waypoints; implementations reject
/// shorter input with [`PathError::TooFewWaypoints`].
pub trait PathEngine: Send + Sync + 'static {
    fn compute(
        &self,
        waypoints: &[RouteWaypoint],
    ) -> impl Future<Output = Result<DrawablePath, PathError>> + Send;
}

fn ensure_drawable(waypoints: &[RouteWaypoint]) -> Result<(), PathError> {
    if waypoints.len() < 2 {
        return Err(PathError::TooFewWaypoints {
            count: waypoints.len(),
        });
    }
    Ok(())
}

/// Joins waypoints with straight segments. No network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLinePathEngine;

impl PathEngine for StraightLinePathEngine {
    async fn compute(&self, waypoints: &[RouteWaypoint]) -> Result<DrawablePath, PathError> {
        ensure_drawable(waypoints)?;
        Ok(DrawablePath {
            coordinates: waypoints.iter().map(RouteWaypoint::coordinates).collect(),
            distance_m: None,
            duration_s: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// `[lon, lat]` pairs.
    coordinates: Vec<[f64; 2]>,
}

/// Client for the OSRM `route` service.
///
/// Requests the full GeoJSON overview geometry with `steps=false`, so no
/// turn-by-turn instructions are produced.
pub struct OsrmPathEngine {
    client: Client,
    base_url: Url,
    profile: String,
}

impl OsrmPathEngine {
    /// # Errors
    ///
    /// Returns [`PathError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`PathError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        profile: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, PathError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PathError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            profile: profile.to_owned(),
        })
    }

    fn route_url(&self, waypoints: &[RouteWaypoint]) -> Result<Url, PathError> {
        let coords = waypoints
            .iter()
            .map(|w| format!("{},{}", w.lon, w.lat))
            .collect::<Vec<_>>()
            .join(";");
        let mut url = self
            .base_url
            .join(&format!("route/v1/{}/{coords}", self.profile))
            .map_err(|e| PathError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson")
            .append_pair("steps", "false");
        Ok(url)
    }
}

impl PathEngine for OsrmPathEngine {
    async fn compute(&self, waypoints: &[RouteWaypoint]) -> Result<DrawablePath, PathError> {
        ensure_drawable(waypoints)?;
        let url = self.route_url(waypoints)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: Result<OsrmResponse, _> = serde_json::from_str(&body);
        // OSRM reports routing failures (e.g. NoRoute) as 400 with a JSON body.
        if !status.is_success() && parsed.is_err() {
            return Err(PathError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let parsed = parsed.map_err(|e| PathError::Deserialize {
            context: url.to_string(),
            source: e,
        })?;

        if parsed.code != "Ok" {
            return Err(PathError::Service {
                code: parsed.code,
                message: parsed.message.unwrap_or_default(),
            });
        }

        let route = parsed.routes.into_iter().next().ok_or_else(|| PathError::Service {
            code: "NoRoute".to_owned(),
            message: "response contained no routes".to_owned(),
        })?;

        Ok(DrawablePath {
            coordinates: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lon, lat]| Coordinates { lat, lon })
                .collect(),
            distance_m: Some(route.distance),
            duration_s: Some(route.duration),
        })
    }
}
