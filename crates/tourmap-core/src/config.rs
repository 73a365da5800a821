use crate::app_config::{AppConfig, Environment};
use crate::geo::{Coordinates, Depot};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so they
/// can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_nonzero_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        match or_default(var, default).parse::<usize>() {
            Ok(0) => Err(invalid(var, "must be greater than zero".to_string())),
            Ok(n) => Ok(n),
            Err(e) => Err(invalid(var, e.to_string())),
        }
    };

    let parse_degrees = |var: &str| -> Result<f64, ConfigError> {
        require(var)?
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("TOURMAP_ENV", "development"))?;
    let log_level = or_default("TOURMAP_LOG_LEVEL", "info");

    let depot_address = require("TOURMAP_DEPOT_ADDRESS")?.trim().to_string();
    let depot_lat = parse_degrees("TOURMAP_DEPOT_LAT")?;
    let depot_lon = parse_degrees("TOURMAP_DEPOT_LON")?;
    let depot_coordinates = Coordinates::new(depot_lat, depot_lon)
        .map_err(|e| invalid("TOURMAP_DEPOT_LAT/TOURMAP_DEPOT_LON", e.to_string()))?;
    let depot = Depot {
        label: or_default("TOURMAP_DEPOT_LABEL", "Depot"),
        address: depot_address,
        coordinates: depot_coordinates,
    };

    let geocoder_url = or_default("TOURMAP_GEOCODER_URL", "https://nominatim.openstreetmap.org");
    let geocoder_user_agent = or_default(
        "TOURMAP_GEOCODER_USER_AGENT",
        "tourmap/0.1 (delivery-planning)",
    );
    let geocoder_timeout_secs = parse_u64("TOURMAP_GEOCODER_TIMEOUT_SECS", "10")?;
    let geocoder_min_interval_ms = parse_u64("TOURMAP_GEOCODER_MIN_INTERVAL_MS", "1000")?;
    let geocoder_max_in_flight = parse_nonzero_usize("TOURMAP_GEOCODER_MAX_IN_FLIGHT", "1")?;
    let geocoder_max_retries = parse_u32("TOURMAP_GEOCODER_MAX_RETRIES", "3")?;
    let geocoder_backoff_base_ms = parse_u64("TOURMAP_GEOCODER_BACKOFF_BASE_MS", "500")?;
    let geocode_cache_ttl_secs = parse_u64("TOURMAP_GEOCODE_CACHE_TTL_SECS", "86400")?;
    let geocode_cache_capacity = parse_nonzero_usize("TOURMAP_GEOCODE_CACHE_CAPACITY", "1024")?;

    let router_url = or_default("TOURMAP_ROUTER_URL", "https://router.project-osrm.org");
    let router_profile = or_default("TOURMAP_ROUTER_PROFILE", "driving");
    let directions_max_waypoints = or_default("TOURMAP_DIRECTIONS_MAX_WAYPOINTS", "9")
        .parse::<usize>()
        .map_err(|e| invalid("TOURMAP_DIRECTIONS_MAX_WAYPOINTS", e.to_string()))?;

    Ok(AppConfig {
        env,
        log_level,
        depot,
        geocoder_url,
        geocoder_user_agent,
        geocoder_timeout_secs,
        geocoder_min_interval_ms,
        geocoder_max_in_flight,
        geocoder_max_retries,
        geocoder_backoff_base_ms,
        geocode_cache_ttl_secs,
        geocode_cache_capacity,
        router_url,
        router_profile,
        directions_max_waypoints,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TOURMAP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
