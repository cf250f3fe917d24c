//! # Atlas Core
//!
//! Shared data model for the resale atlas: immutable property records,
//! price observations, the threshold colour classifier and the small slice
//! of GeoJSON the map collaborator speaks.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          ATLAS CORE                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │   PropertyRecord ──┐                                             │
//! │   (block, street,  │     blockStreet key      ┌──────────────┐   │
//! │    town, lat/lon,  ├─────────────────────────>│ atlas-join   │   │
//! │    tag, year)      │                          └──────────────┘   │
//! │                    │                                             │
//! │   PriceRecord ─────┘   ThresholdScale ──> Bucket ──> colour      │
//! │   (flat type, date,                                              │
//! │    price | invalid)    FeatureCollection <── boundaries, markers │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate performs I/O. Wire payloads are decoded here so
//! that the HTTP source and on-disk fixtures agree on one format.

pub mod classify;
pub mod geo;
pub mod numeric;
pub mod price;
pub mod property;
pub mod tag;

pub use classify::{Bucket, BelowRange, LegendEntry, ThresholdScale, AGE_SCALE, PRICE_SCALE, UNAVAILABLE_COLOR};
pub use geo::{Bounds, Feature, FeatureCollection, Geometry, LngLat, TOWN_NAME_PROPERTY};
pub use numeric::loose_number;
pub use price::{decode_address_prices, decode_aggregate_prices, parse_quarter, FlatType, PriceRecord};
pub use property::{decode_properties, extract_block, PropertyRecord};
pub use tag::PropertyTag;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selection sentinel meaning "no town filter"
pub const ALL_TOWNS: &str = "All Towns";

/// Result type for atlas-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding wire payloads
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Whether charts aggregate by town or by street
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Town,
    Street,
}

impl ViewMode {
    /// Derive the mode from a town selection.
    ///
    /// An empty list, or one led by [`ALL_TOWNS`], is unfiltered and
    /// aggregates by town; anything else drills into streets.
    pub fn for_towns<S: AsRef<str>>(towns: &[S]) -> Self {
        match towns.first() {
            None => ViewMode::Town,
            Some(first) if first.as_ref() == ALL_TOWNS => ViewMode::Town,
            Some(_) => ViewMode::Street,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Town => write!(f, "town"),
            Self::Street => write!(f, "street"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_mode_for_towns() {
        let empty: [&str; 0] = [];
        assert_eq!(ViewMode::for_towns(&empty), ViewMode::Town);
        assert_eq!(ViewMode::for_towns(&[ALL_TOWNS]), ViewMode::Town);
        assert_eq!(ViewMode::for_towns(&["BEDOK"]), ViewMode::Street);
        assert_eq!(ViewMode::for_towns(&["BEDOK", "TAMPINES"]), ViewMode::Street);
    }

    #[test]
    fn test_view_mode_display() {
        assert_eq!(ViewMode::Town.to_string(), "town");
        assert_eq!(ViewMode::Street.to_string(), "street");
    }
}
