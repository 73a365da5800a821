//! Command handlers for `plan`, `links` and `geocode`.
//!
//! Per-stop problems (invalid records, unresolved addresses, a failed route
//! request) are reported and skipped; only configuration and I/O errors
//! abort a command.

use std::path::Path;

use tourmap_core::{AppConfig, Resolution, Stop};
use tourmap_geocode::{AddressLookup, GeocodeResolver, NominatimClient, ResolverOptions};
use tourmap_render::{
    CycleContext, GeoJsonSurfaceFactory, MapRenderer, MapSnapshot, OsrmPathEngine, PathEngine,
    RenderState, StraightLinePathEngine, TourSession,
};
use tourmap_route::{
    build_deep_links, normalize_records, DeepLink, DeepLinkConfig, SequenceOutcome,
};

pub(crate) fn deep_link_config(config: &AppConfig) -> DeepLinkConfig {
    DeepLinkConfig {
        max_waypoints: config.directions_max_waypoints,
        ..DeepLinkConfig::default()
    }
}

pub(crate) fn format_link(name: &str, link: &DeepLink) -> String {
    match link {
        DeepLink::Disabled => format!("{name}: disabled (fewer than 2 addresses)"),
        DeepLink::Enabled {
            url,
            truncation: None,
        } => format!("{name}: {url}"),
        DeepLink::Enabled {
            url,
            truncation: Some(t),
        } => format!(
            "{name}: {url}\n  truncated: kept {} waypoints, dropped {}",
            t.kept, t.dropped
        ),
    }
}

fn load_sequence(path: &Path) -> anyhow::Result<SequenceOutcome> {
    let raw = tourmap_core::load_stops(path)?;
    let outcome = normalize_records(&raw);
    for rejected in &outcome.rejected {
        println!("skipped: {rejected}");
    }
    tracing::info!(
        path = %path.display(),
        accepted = outcome.stops.len(),
        rejected = outcome.rejected.len(),
        "stop list loaded"
    );
    Ok(outcome)
}

fn print_links(config: &AppConfig, stops: &[Stop]) {
    let addresses: Vec<&str> = stops.iter().map(|s| s.address.as_str()).collect();
    let links = build_deep_links(&deep_link_config(config), &config.depot.address, &addresses);
    println!("{}", format_link("directions", &links.directions));
    println!("{}", format_link("path", &links.path));
}

fn build_resolver(config: &AppConfig) -> anyhow::Result<GeocodeResolver<NominatimClient>> {
    let client = NominatimClient::new(
        &config.geocoder_url,
        config.geocoder_timeout_secs,
        &config.geocoder_user_agent,
    )?;
    Ok(GeocodeResolver::new(
        client,
        &ResolverOptions::from_app_config(config),
    ))
}

pub(crate) fn summarize(snapshot: &MapSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    if let RenderState::Unavailable { reason } = &snapshot.state {
        lines.push(format!("map unavailable: {reason}"));
        return lines;
    }

    for marker in &snapshot.markers {
        let position = marker
            .sequence
            .map_or_else(|| "depot".to_owned(), |n| format!("#{n}"));
        lines.push(format!(
            "{position:>6}  {:.6},{:.6}  {}",
            marker.coordinates.lat, marker.coordinates.lon, marker.label
        ));
    }
    for stop in &snapshot.unresolved {
        lines.push(format!(
            "unresolved  stop {}: {} ({})",
            stop.stop_id, stop.address, stop.reason
        ));
    }
    match &snapshot.path {
        Some(path) => {
            let mut line = format!("route: {} points", path.coordinates.len());
            if let (Some(distance), Some(duration)) = (path.distance_m, path.duration_s) {
                line.push_str(&format!(
                    ", {:.1} km, {:.0} min",
                    distance / 1000.0,
                    duration / 60.0
                ));
            }
            lines.push(line);
        }
        None => lines.push("route: not drawn".to_owned()),
    }
    lines
}

async fn draw<L: AddressLookup, P: PathEngine>(
    config: &AppConfig,
    resolver: GeocodeResolver<L>,
    engine: P,
    stops: Vec<Stop>,
) -> anyhow::Result<(MapSnapshot, MapRenderer<GeoJsonSurfaceFactory>)> {
    let renderer = MapRenderer::new(GeoJsonSurfaceFactory::new(), config.depot.clone());
    let ctx = CycleContext::new(resolver, engine, config.depot.clone());
    let mut session = TourSession::spawn(renderer, ctx);
    session.submit(stops).await?;
    let snapshot = session.settled().await?;
    let renderer = session.shutdown().await?;
    Ok((snapshot, renderer))
}

/// Run one full cycle for the stop file and report the result.
///
/// # Errors
///
/// Returns an error if the stop file cannot be read, a client cannot be
/// built, or the GeoJSON output cannot be written.
pub(crate) async fn run_plan(
    config: &AppConfig,
    stops_path: &Path,
    geojson_out: Option<&Path>,
    straight_lines: bool,
) -> anyhow::Result<()> {
    let outcome = load_sequence(stops_path)?;
    print_links(config, &outcome.stops);

    let resolver = build_resolver(config)?;
    let (snapshot, renderer) = if straight_lines {
        draw(config, resolver, StraightLinePathEngine, outcome.stops).await?
    } else {
        let engine = OsrmPathEngine::new(
            &config.router_url,
            &config.router_profile,
            config.geocoder_timeout_secs,
            &config.geocoder_user_agent,
        )?;
        draw(config, resolver, engine, outcome.stops).await?
    };

    for line in summarize(&snapshot) {
        println!("{line}");
    }

    if let Some(out) = geojson_out {
        let Some(surface) = renderer.surface() else {
            anyhow::bail!("map unavailable; nothing written to {}", out.display());
        };
        let body = serde_json::to_string_pretty(&surface.to_geojson())?;
        std::fs::write(out, body)
            .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", out.display()))?;
        println!("geojson written to {}", out.display());
    }

    Ok(())
}

/// Print navigation links for the stop file. No network access.
///
/// # Errors
///
/// Returns an error if the stop file cannot be read or parsed.
pub(crate) fn run_links(config: &AppConfig, stops_path: &Path) -> anyhow::Result<()> {
    let outcome = load_sequence(stops_path)?;
    print_links(config, &outcome.stops);
    Ok(())
}

/// Resolve each address and print its coordinates or why it failed.
///
/// # Errors
///
/// Returns an error if the geocoding client cannot be built.
pub(crate) async fn run_geocode(config: &AppConfig, addresses: &[String]) -> anyhow::Result<()> {
    let resolver = build_resolver(config)?;
    let results = resolver
        .resolve_many(addresses, tourmap_render::DEFAULT_CYCLE_CONCURRENCY)
        .await;

    for (address, resolution) in addresses.iter().zip(results) {
        match resolution {
            Resolution::Resolved { coordinates } => println!("{coordinates}  {address}"),
            Resolution::Unresolved { reason } => println!("unresolved ({reason})  {address}"),
        }
    }
    tracing::debug!(
        external_calls = resolver.external_calls(),
        cached = resolver.cache_len(),
        "geocode finished"
    );
    Ok(())
}
