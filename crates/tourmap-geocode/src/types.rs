//! Wire types for the Nominatim `/search` endpoint.

use serde::Deserialize;

/// One element of the `format=jsonv2` search response array.
///
/// Nominatim encodes coordinates as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub place_id: Option<i64>,
}
