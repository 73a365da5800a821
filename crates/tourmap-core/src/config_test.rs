use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid values.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("TOURMAP_DEPOT_ADDRESS", "Lagerstr 10, 10115 Berlin");
    m.insert("TOURMAP_DEPOT_LAT", "52.5321");
    m.insert("TOURMAP_DEPOT_LON", "13.3849");
    m
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "TOURMAP_ENV"));
}

#[test]
fn build_app_config_fails_without_depot_address() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "TOURMAP_DEPOT_ADDRESS"),
        "expected MissingEnvVar(TOURMAP_DEPOT_ADDRESS), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_depot_address_as_missing() {
    let mut map = full_env();
    map.insert("TOURMAP_DEPOT_ADDRESS", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "TOURMAP_DEPOT_ADDRESS"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_without_depot_lat() {
    let mut map = full_env();
    map.remove("TOURMAP_DEPOT_LAT");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "TOURMAP_DEPOT_LAT"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_out_of_range_depot() {
    let mut map = full_env();
    map.insert("TOURMAP_DEPOT_LAT", "123.0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { .. })),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_depot_lon() {
    let mut map = full_env();
    map.insert("TOURMAP_DEPOT_LON", "east");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOURMAP_DEPOT_LON"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_all_required_vars() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.depot.label, "Depot");
    assert_eq!(cfg.depot.address, "Lagerstr 10, 10115 Berlin");
    assert!((cfg.depot.coordinates.lat - 52.5321).abs() < 1e-9);
    assert!((cfg.depot.coordinates.lon - 13.3849).abs() < 1e-9);
    assert_eq!(cfg.geocoder_url, "https://nominatim.openstreetmap.org");
    assert_eq!(cfg.geocoder_user_agent, "tourmap/0.1 (delivery-planning)");
    assert_eq!(cfg.geocoder_timeout_secs, 10);
    assert_eq!(cfg.geocoder_min_interval_ms, 1000);
    assert_eq!(cfg.geocoder_max_in_flight, 1);
    assert_eq!(cfg.geocoder_max_retries, 3);
    assert_eq!(cfg.geocoder_backoff_base_ms, 500);
    assert_eq!(cfg.geocode_cache_ttl_secs, 86_400);
    assert_eq!(cfg.geocode_cache_capacity, 1024);
    assert_eq!(cfg.router_url, "https://router.project-osrm.org");
    assert_eq!(cfg.router_profile, "driving");
    assert_eq!(cfg.directions_max_waypoints, 9);
}

#[test]
fn geocoder_min_interval_override() {
    let mut map = full_env();
    map.insert("TOURMAP_GEOCODER_MIN_INTERVAL_MS", "250");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.geocoder_min_interval_ms, 250);
}

#[test]
fn geocoder_max_retries_invalid() {
    let mut map = full_env();
    map.insert("TOURMAP_GEOCODER_MAX_RETRIES", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOURMAP_GEOCODER_MAX_RETRIES"),
        "expected InvalidEnvVar(TOURMAP_GEOCODER_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn geocoder_max_in_flight_rejects_zero() {
    let mut map = full_env();
    map.insert("TOURMAP_GEOCODER_MAX_IN_FLIGHT", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOURMAP_GEOCODER_MAX_IN_FLIGHT"),
        "got: {result:?}"
    );
}

#[test]
fn geocode_cache_capacity_rejects_zero() {
    let mut map = full_env();
    map.insert("TOURMAP_GEOCODE_CACHE_CAPACITY", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOURMAP_GEOCODE_CACHE_CAPACITY"),
        "got: {result:?}"
    );
}

#[test]
fn depot_label_override() {
    let mut map = full_env();
    map.insert("TOURMAP_DEPOT_LABEL", "Hub Nord");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.depot.label, "Hub Nord");
}

#[test]
fn directions_max_waypoints_override() {
    let mut map = full_env();
    map.insert("TOURMAP_DIRECTIONS_MAX_WAYPOINTS", "23");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.directions_max_waypoints, 23);
}
