//! HTTP client for the Nominatim `/search` endpoint.
//!
//! One call resolves one free-text address to at most one coordinate pair.
//! Throttling, caching and retries live in [`crate::GeocodeResolver`]; this
//! type only speaks the wire protocol and maps statuses to typed errors.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tourmap_core::Coordinates;

use crate::error::GeocodeError;
use crate::lookup::AddressLookup;
use crate::types::NominatimPlace;

pub struct NominatimClient {
    client: Client,
    search_url: Url,
}

impl NominatimClient {
    /// Creates a client for the Nominatim instance at `base_url`.
    ///
    /// Nominatim's usage policy requires an identifying `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Ensure exactly one trailing slash so `join` appends rather than
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let search_url = Url::parse(&normalised)
            .and_then(|u| u.join("search"))
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, search_url })
    }

    fn build_url(&self, address: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "jsonv2")
            .append_pair("limit", "1");
        url
    }

    async fn search(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let url = self.build_url(address);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GeocodeError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(GeocodeError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let places: Vec<NominatimPlace> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: format!("search(q={address})"),
                source: e,
            })?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        parse_place(address, &place).map(Some)
    }
}

fn parse_place(address: &str, place: &NominatimPlace) -> Result<Coordinates, GeocodeError> {
    let invalid = |reason: String| GeocodeError::InvalidCoordinates {
        address: address.to_owned(),
        reason,
    };
    let lat = place
        .lat
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(format!("lat '{}': {e}", place.lat)))?;
    let lon = place
        .lon
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(format!("lon '{}': {e}", place.lon)))?;
    Coordinates::new(lat, lon).map_err(|e| invalid(e.to_string()))
}

impl AddressLookup for NominatimClient {
    async fn lookup(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        self.search(address).await
    }
}
