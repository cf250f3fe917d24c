//! Property (building) records
//!
//! Created once from the base inventory load. Enrichment with prices
//! always produces new derived values; the records themselves stay frozen.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::AGE_SCALE;
use crate::numeric::{loose_integer, loose_number};
use crate::tag::PropertyTag;
use crate::{LngLat, Result};

lazy_static! {
    static ref BLOCK_TOKEN: Regex = Regex::new(r"\d+[A-Za-z]*").expect("valid block pattern");
}

/// First block-number token of an address, e.g. `"12A"` in `"12A Bedok Sth"`
pub fn extract_block(address: &str) -> Option<String> {
    BLOCK_TOKEN.find(address).map(|m| m.as_str().to_string())
}

/// One building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub address: Option<String>,
    pub block: Option<String>,
    pub street: Option<String>,
    pub town: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub tag: PropertyTag,
    /// Completion year
    pub year: Option<i32>,
    /// Years since completion, relative to the load year
    pub age: Option<i32>,
    pub total_units: u32,
    pub max_floor_lvl: Option<u32>,
}

impl PropertyRecord {
    /// Composite `"<block> <street>"` key, `None` when either part is missing
    pub fn block_street(&self) -> Option<String> {
        match (non_empty(&self.block), non_empty(&self.street)) {
            (Some(block), Some(street)) => Some(format!("{} {}", block, street)),
            _ => None,
        }
    }

    pub fn position(&self) -> LngLat {
        LngLat::new(self.lon, self.lat)
    }

    /// Marker colour in the "type" colour mode
    pub fn tag_color(&self) -> &'static str {
        self.tag.color()
    }

    /// Marker colour in the "age" colour mode
    pub fn age_color(&self) -> &'static str {
        AGE_SCALE.color(self.age.map(f64::from))
    }

    /// Case-insensitive town membership
    pub fn in_town(&self, town: &str) -> bool {
        self.town
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(town))
    }

    /// Case-insensitive street membership
    pub fn on_street(&self, street: &str) -> bool {
        self.street
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(street))
    }

    fn from_raw(raw: RawProperty, current_year: i32) -> Option<Self> {
        let lat = loose_number(&raw.lat)?;
        let lon = loose_number(&raw.lon)?;
        let year = loose_integer(&raw.year).and_then(|y| i32::try_from(y).ok());
        let block = raw
            .block
            .filter(|b| !b.trim().is_empty())
            .or_else(|| raw.address.as_deref().and_then(extract_block));

        Some(Self {
            address: raw.address,
            block,
            street: raw.street,
            town: raw.town,
            lat,
            lon,
            tag: raw.tag.unwrap_or(PropertyTag::Other(String::new())),
            year,
            age: year.map(|y| current_year - y),
            total_units: loose_integer(&raw.total_units)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            max_floor_lvl: loose_integer(&raw.max_floor_lvl).and_then(|n| u32::try_from(n).ok()),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Wire shape of a property row
#[derive(Debug, Deserialize)]
struct RawProperty {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    block: Option<String>,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    lat: Value,
    #[serde(default)]
    lon: Value,
    #[serde(default)]
    tag: Option<PropertyTag>,
    #[serde(default)]
    year: Value,
    #[serde(default)]
    total_units: Value,
    #[serde(default)]
    max_floor_lvl: Value,
}

/// Decode the inventory rows. Rows without finite coordinates cannot be
/// placed on the map and are dropped.
pub fn decode_properties(rows: Vec<Value>, current_year: i32) -> Result<Vec<PropertyRecord>> {
    let total = rows.len();
    let mut records = Vec::with_capacity(total);
    for row in rows {
        let raw: RawProperty = serde_json::from_value(row)?;
        if let Some(record) = PropertyRecord::from_raw(raw, current_year) {
            records.push(record);
        }
    }

    if records.len() < total {
        tracing::debug!(
            dropped = total - records.len(),
            "property rows without coordinates skipped"
        );
    }
    Ok(records)
}
