//! Hand-off URLs for external navigation apps.
//!
//! Two incompatible formats are produced from the same ordered address list:
//!
//! - the directions API form, `?origin=..&destination=..&waypoints=a%7Cb`,
//!   which caps the number of intermediate waypoints;
//! - the path form, `/<depot>/<stop 1>/<stop 2>/...`, which takes the depot
//!   as a fixed origin followed by every stop.
//!
//! Links are built from raw addresses, never from geocoded coordinates.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

pub const DEFAULT_DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/?api=1";
pub const DEFAULT_PATH_BASE_URL: &str = "https://www.google.com/maps/dir";
pub const DEFAULT_MAX_WAYPOINTS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkConfig {
    pub directions_base_url: String,
    pub path_base_url: String,
    /// Maximum intermediate waypoints accepted by the directions form.
    pub max_waypoints: usize,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            directions_base_url: DEFAULT_DIRECTIONS_BASE_URL.to_owned(),
            path_base_url: DEFAULT_PATH_BASE_URL.to_owned(),
            max_waypoints: DEFAULT_MAX_WAYPOINTS,
        }
    }
}

/// Signals that intermediate waypoints were cut to fit a provider limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Truncation {
    pub kept: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeepLink {
    /// Fewer than two stop addresses: there is nothing to navigate to.
    Disabled,
    Enabled {
        url: String,
        truncation: Option<Truncation>,
    },
}

impl DeepLink {
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, DeepLink::Disabled)
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            DeepLink::Disabled => None,
            DeepLink::Enabled { url, .. } => Some(url),
        }
    }

    #[must_use]
    pub fn truncation(&self) -> Option<Truncation> {
        match self {
            DeepLink::Disabled => None,
            DeepLink::Enabled { truncation, .. } => *truncation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepLinks {
    pub directions: DeepLink,
    pub path: DeepLink,
}

/// Build both deep links for an ordered stop-address list.
///
/// Blank addresses are ignored. When fewer than two addresses remain both
/// links are [`DeepLink::Disabled`]. Address order is never changed.
#[must_use]
pub fn build_deep_links<S: AsRef<str>>(
    config: &DeepLinkConfig,
    depot_address: &str,
    ordered_addresses: &[S],
) -> DeepLinks {
    let addresses: Vec<&str> = ordered_addresses
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty())
        .collect();

    if addresses.len() < 2 {
        return DeepLinks {
            directions: DeepLink::Disabled,
            path: DeepLink::Disabled,
        };
    }

    DeepLinks {
        directions: directions_link(config, &addresses),
        path: path_link(config, depot_address.trim(), &addresses),
    }
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, NON_ALPHANUMERIC).to_string()
}

fn directions_link(config: &DeepLinkConfig, addresses: &[&str]) -> DeepLink {
    // origin + waypoints + destination; anything past that is cut from the tail
    let limit = config.max_waypoints.saturating_add(2);
    let kept_addresses = &addresses[..addresses.len().min(limit)];
    let truncation = (addresses.len() > limit).then(|| Truncation {
        kept: config.max_waypoints,
        dropped: addresses.len() - limit,
    });
    if let Some(t) = truncation {
        tracing::warn!(
            kept = t.kept,
            dropped = t.dropped,
            max_waypoints = config.max_waypoints,
            "directions link exceeds waypoint limit; truncating trailing stops"
        );
    }

    let [origin, middle @ .., destination] = kept_addresses else {
        return DeepLink::Disabled;
    };

    let separator = if config.directions_base_url.contains('?') {
        '&'
    } else {
        '?'
    };
    let mut url = format!(
        "{}{separator}origin={}&destination={}",
        config.directions_base_url,
        encode(origin),
        encode(destination)
    );
    if !middle.is_empty() {
        let waypoints: Vec<String> = middle.iter().map(|a| encode(a)).collect();
        url.push_str("&waypoints=");
        url.push_str(&waypoints.join("%7C"));
    }

    DeepLink::Enabled { url, truncation }
}

fn path_link(config: &DeepLinkConfig, depot_address: &str, addresses: &[&str]) -> DeepLink {
    let mut url = config.path_base_url.trim_end_matches('/').to_owned();
    let segments = std::iter::once(depot_address)
        .filter(|d| !d.is_empty())
        .chain(addresses.iter().copied());
    for segment in segments {
        url.push('/');
        url.push_str(&encode(segment));
    }
    DeepLink::Enabled {
        url,
        truncation: None,
    }
}

#[cfg(test)]
#[path = "deeplink_test.rs"]
mod tests;
