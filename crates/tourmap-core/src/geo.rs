//! Geographic primitives shared by the geocoder, route builder and renderer.

use serde::{Deserialize, Serialize};

use crate::stops::Stop;
use crate::CoreError;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Builds a coordinate pair, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinates`] when `lat` is outside
    /// `[-90, 90]`, `lon` is outside `[-180, 180]`, or either is NaN/infinite.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoreError> {
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        if lat_ok && lon_ok {
            Ok(Self { lat, lon })
        } else {
            Err(CoreError::InvalidCoordinates { lat, lon })
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Fixed origin of every tour. Configured externally, never geocoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    pub label: String,
    pub address: String,
    pub coordinates: Coordinates,
}

/// Why an address produced no coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The address normalized to an empty string.
    BlankAddress,
    /// The geocoding service answered but had no match.
    NotFound,
    /// Transient failures exhausted the retry budget.
    ServiceUnavailable,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::BlankAddress => write!(f, "blank address"),
            UnresolvedReason::NotFound => write!(f, "address not found"),
            UnresolvedReason::ServiceUnavailable => write!(f, "geocoding service unavailable"),
        }
    }
}

/// Outcome of resolving one address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Resolved { coordinates: Coordinates },
    Unresolved { reason: UnresolvedReason },
}

impl Resolution {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Resolution::Resolved { coordinates } => Some(*coordinates),
            Resolution::Unresolved { .. } => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

/// A validated stop paired with the result of its geocoding attempt.
///
/// Produced once per resolution cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStop {
    pub stop: Stop,
    pub resolution: Resolution,
}

impl ResolvedStop {
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.resolution.coordinates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_accept_valid_range() {
        let c = Coordinates::new(52.52, 13.405).unwrap();
        assert_eq!(c.lat, 52.52);
        assert_eq!(c.lon, 13.405);
    }

    #[test]
    fn coordinates_reject_out_of_range_latitude() {
        assert!(matches!(
            Coordinates::new(91.0, 0.0),
            Err(CoreError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn coordinates_reject_nan() {
        assert!(Coordinates::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn coordinates_display_uses_six_decimals() {
        let c = Coordinates::new(1.5, -2.25).unwrap();
        assert_eq!(c.to_string(), "1.500000,-2.250000");
    }

    #[test]
    fn resolution_serializes_with_kind_tag() {
        let r = Resolution::Unresolved {
            reason: UnresolvedReason::NotFound,
        };
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["kind"], "unresolved");
        assert_eq!(json["reason"], "not_found");
    }
}
