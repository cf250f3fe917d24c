//! Response envelopes
//!
//! Shared by the HTTP source and the fixture-backed memory source so both
//! read exactly the same bytes the same way. Price payloads arrive as a
//! JSON document encoded inside a JSON string and need a second decode.

use atlas_core::{
    decode_address_prices, decode_aggregate_prices, decode_properties, FeatureCollection,
    PriceRecord, PropertyRecord,
};
use serde::Deserialize;
use serde_json::Value;

use crate::source::Endpoint;
use crate::{FetchError, FetchResult};

#[derive(Debug, Deserialize)]
struct PropertiesEnvelope {
    properties: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PricesEnvelope {
    prices: Embedded,
}

#[derive(Debug, Deserialize)]
struct GeoJsonEnvelope {
    geojson: Embedded,
}

/// A payload sent either as an encoded string or inline
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Embedded {
    Encoded(String),
    Inline(Value),
}

impl Embedded {
    fn into_json(self, endpoint: Endpoint) -> FetchResult<String> {
        match self {
            Embedded::Encoded(text) => Ok(text),
            Embedded::Inline(value) => {
                serde_json::to_string(&value).map_err(|e| FetchError::malformed(endpoint, e))
            }
        }
    }
}

fn envelope<'a, T: Deserialize<'a>>(endpoint: Endpoint, body: &'a str) -> FetchResult<T> {
    serde_json::from_str(body).map_err(|e| FetchError::malformed(endpoint, e))
}

/// `{"properties": [...]}`
pub fn parse_properties(body: &str, current_year: i32) -> FetchResult<Vec<PropertyRecord>> {
    let envelope: PropertiesEnvelope = envelope(Endpoint::Properties, body)?;
    decode_properties(envelope.properties, current_year)
        .map_err(|e| FetchError::malformed(Endpoint::Properties, e))
}

/// `{"prices": "<json rows>"}` for an aggregate endpoint
pub fn parse_aggregate_prices(endpoint: Endpoint, body: &str) -> FetchResult<Vec<PriceRecord>> {
    let envelope: PricesEnvelope = envelope(endpoint, body)?;
    let rows = envelope.prices.into_json(endpoint)?;
    decode_aggregate_prices(&rows).map_err(|e| FetchError::malformed(endpoint, e))
}

/// `{"prices": "<json rows>"}` keyed by block address
pub fn parse_address_prices(body: &str) -> FetchResult<Vec<PriceRecord>> {
    let endpoint = Endpoint::AddressPrices;
    let envelope: PricesEnvelope = envelope(endpoint, body)?;
    let rows = envelope.prices.into_json(endpoint)?;
    decode_address_prices(&rows).map_err(|e| FetchError::malformed(endpoint, e))
}

/// `{"geojson": FeatureCollection}`
pub fn parse_boundaries(body: &str) -> FetchResult<FeatureCollection> {
    let endpoint = Endpoint::Boundaries;
    let envelope: GeoJsonEnvelope = envelope(endpoint, body)?;
    let json = envelope.geojson.into_json(endpoint)?;
    serde_json::from_str(&json).map_err(|e| FetchError::malformed(endpoint, e))
}
