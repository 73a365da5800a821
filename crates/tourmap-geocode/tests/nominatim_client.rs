//! Integration tests for `NominatimClient` and `GeocodeResolver` using
//! wiremock HTTP mocks. No real network traffic is made.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tourmap_core::{Resolution, UnresolvedReason};
use tourmap_geocode::{AddressLookup, GeocodeError, GeocodeResolver, NominatimClient, ResolverOptions};

fn test_client(base_url: &str) -> NominatimClient {
    NominatimClient::new(base_url, 5, "tourmap-test/0.1").expect("failed to build test client")
}

fn fast_options(max_retries: u32) -> ResolverOptions {
    ResolverOptions {
        cache_ttl: Duration::from_secs(60),
        cache_capacity: NonZeroUsize::new(8).unwrap(),
        max_in_flight: 1,
        min_interval: Duration::ZERO,
        max_retries,
        backoff_base_ms: 0,
    }
}

fn berlin_body() -> serde_json::Value {
    json!([{
        "place_id": 1234,
        "lat": "52.5250839",
        "lon": "13.369402",
        "display_name": "Bahnhofstraße 1, Berlin, Deutschland"
    }])
}

#[tokio::test]
async fn lookup_returns_coordinates_for_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "bahnhofstr 1, berlin"))
        .and(query_param("format", "jsonv2"))
        .and(query_param("limit", "1"))
        .and(header("user-agent", "tourmap-test/0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_body()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let coords = client
        .lookup("bahnhofstr 1, berlin")
        .await
        .expect("lookup should succeed")
        .expect("address should be found");

    assert!((coords.lat - 52.525_083_9).abs() < 1e-9);
    assert!((coords.lon - 13.369_402).abs() < 1e-9);
}

#[tokio::test]
async fn lookup_returns_none_for_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.lookup("###invalid###").await;

    assert!(matches!(result, Ok(None)), "got: {result:?}");
}

#[tokio::test]
async fn lookup_maps_429_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.lookup("anything").await;

    assert!(
        matches!(result, Err(GeocodeError::RateLimited { retry_after_secs: 7 })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn lookup_maps_other_status_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.lookup("anything").await;

    assert!(
        matches!(result, Err(GeocodeError::UnexpectedStatus { status: 503, .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn lookup_reports_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.lookup("anything").await;

    assert!(
        matches!(result, Err(GeocodeError::Deserialize { .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn resolver_calls_service_once_per_address_within_ttl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "bahnhofstr 1, berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_body()))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = GeocodeResolver::new(test_client(&server.uri()), &fast_options(0));

    let first = resolver.resolve("Bahnhofstr 1, Berlin").await;
    let second = resolver.resolve("bahnhofstr 1,  BERLIN").await;

    assert!(first.is_resolved());
    assert_eq!(first, second);
    assert_eq!(resolver.external_calls(), 1);
    // `expect(1)` is verified when the server is dropped.
}

#[tokio::test]
async fn resolver_retries_server_errors_then_degrades() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let resolver = GeocodeResolver::new(test_client(&server.uri()), &fast_options(2));
    let result = resolver.resolve("Bahnhofstr 1, Berlin").await;

    assert_eq!(
        result,
        Resolution::Unresolved {
            reason: UnresolvedReason::ServiceUnavailable
        }
    );
}

#[tokio::test]
async fn resolver_does_not_retry_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = GeocodeResolver::new(test_client(&server.uri()), &fast_options(3));
    let result = resolver.resolve("###invalid###").await;

    assert_eq!(
        result,
        Resolution::Unresolved {
            reason: UnresolvedReason::NotFound
        }
    );
}

#[tokio::test]
async fn resolver_recovers_after_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_body()))
        .with_priority(2)
        .mount(&server)
        .await;

    let resolver = GeocodeResolver::new(test_client(&server.uri()), &fast_options(2));
    let result = resolver.resolve("Bahnhofstr 1, Berlin").await;

    assert!(result.is_resolved(), "got: {result:?}");
    assert_eq!(resolver.external_calls(), 2);
}
