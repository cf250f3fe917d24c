//! # Atlas Join
//!
//! Merges base property records with address-level prices for one flat
//! type, producing a price and a price colour per building.
//!
//! ```text
//!   address prices ──filter(flat type)──> HashMap<blockStreet, price>
//!                                               │
//!   properties ──────────── blockStreet ────────┴──> EnrichedProperty
//!                                                    (price | NA, colour)
//! ```
//!
//! Join misses and invalid prices are ordinary data, resolved to
//! [`PriceValue::NotAvailable`] and the neutral colour; nothing here fails.

pub mod cache;

pub use cache::{JoinCache, JoinKey};

use atlas_core::{FlatType, PriceRecord, PropertyRecord, PRICE_SCALE, UNAVAILABLE_COLOR};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Point-level price of a building
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceValue {
    Available(f64),
    NotAvailable,
}

impl Serialize for PriceValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PriceValue::Available(amount) => serializer.serialize_f64(*amount),
            PriceValue::NotAvailable => serializer.serialize_str("NA"),
        }
    }
}

impl PriceValue {
    pub fn amount(&self) -> Option<f64> {
        match self {
            PriceValue::Available(amount) => Some(*amount),
            PriceValue::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PriceValue::Available(_))
    }
}

impl fmt::Display for PriceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceValue::Available(amount) => write!(f, "{:.0}", amount),
            PriceValue::NotAvailable => f.write_str("NA"),
        }
    }
}

/// A property joined with its address-level price
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedProperty {
    pub record: Arc<PropertyRecord>,
    /// Join key, `None` when the property lacks a block or street
    pub block_street: Option<String>,
    pub price: PriceValue,
    pub price_color: &'static str,
}

impl EnrichedProperty {
    fn unavailable(record: &Arc<PropertyRecord>) -> Self {
        Self {
            block_street: record.block_street(),
            record: Arc::clone(record),
            price: PriceValue::NotAvailable,
            price_color: UNAVAILABLE_COLOR,
        }
    }
}

/// Join properties with address prices for `flat_type`.
///
/// Every input property yields exactly one output entry, in input order.
/// Prices for other flat types never take part in the lookup. When the
/// same address appears more than once for the flat type, the last row
/// wins.
pub fn enrich(
    properties: &[Arc<PropertyRecord>],
    address_prices: &[PriceRecord],
    flat_type: &FlatType,
) -> Vec<EnrichedProperty> {
    if address_prices.is_empty() {
        return properties.iter().map(EnrichedProperty::unavailable).collect();
    }

    let lookup: HashMap<&str, Option<f64>> = address_prices
        .iter()
        .filter(|row| &row.flat_type == flat_type)
        .filter_map(|row| row.block_street.as_deref().map(|key| (key, row.price)))
        .collect();

    let mut misses = 0usize;
    let enriched = properties
        .iter()
        .map(|record| {
            let key = record.block_street();
            let price = key
                .as_deref()
                .and_then(|k| lookup.get(k).copied().flatten());

            match price {
                Some(amount) => EnrichedProperty {
                    record: Arc::clone(record),
                    block_street: key,
                    price: PriceValue::Available(amount),
                    price_color: PRICE_SCALE.color(Some(amount)),
                },
                None => {
                    misses += 1;
                    EnrichedProperty::unavailable(record)
                }
            }
        })
        .collect();

    tracing::debug!(
        properties = properties.len(),
        priced = properties.len() - misses,
        flat_type = %flat_type,
        "join complete"
    );
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::{decode_address_prices, decode_properties};
    use serde_json::json;
    use std::collections::HashSet;

    fn properties() -> Vec<Arc<PropertyRecord>> {
        let rows = vec![
            json!({"address": "101 Bedok North Ave 4", "street": "BEDOK NTH AVE 4", "town": "BEDOK", "lat": 1.33, "lon": 103.93, "tag": "Residential", "year": 1978}),
            json!({"address": "102 Bedok North Ave 4", "street": "BEDOK NTH AVE 4", "town": "BEDOK", "lat": 1.33, "lon": 103.94, "tag": "Residential", "year": 1979}),
            json!({"address": "Bedok Interchange", "street": "BEDOK NTH AVE 4", "town": "BEDOK", "lat": 1.32, "lon": 103.93, "tag": "Commercial", "year": 1980}),
            json!({"address": "5 Tampines St 11", "town": "TAMPINES", "lat": 1.35, "lon": 103.95, "tag": "Residential", "year": 1985}),
        ];
        decode_properties(rows, 2024)
            .unwrap()
            .into_iter()
            .map(Arc::new)
            .collect()
    }

    fn address_prices() -> Vec<PriceRecord> {
        decode_address_prices(
            r#"[
                {"block_street": "101 BEDOK NTH AVE 4", "flat_type": "4 ROOM", "price": 650000},
                {"block_street": "101 BEDOK NTH AVE 4", "flat_type": "3 ROOM", "price": 410000},
                {"block_street": "102 BEDOK NTH AVE 4", "flat_type": "3 ROOM", "price": 400000},
                {"block_street": "5 TAMPINES ST 11", "flat_type": "4 ROOM", "price": 900000}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_enrich_matches_selected_flat_type_only() {
        let enriched = enrich(&properties(), &address_prices(), &FlatType::FourRoom);

        assert_eq!(enriched[0].price, PriceValue::Available(650_000.0));
        assert_eq!(enriched[0].price_color, "#2dd4bf");
        // only a 3 ROOM price exists for 102
        assert_eq!(enriched[1].price, PriceValue::NotAvailable);
        assert_eq!(enriched[1].price_color, UNAVAILABLE_COLOR);
    }

    #[test]
    fn test_missing_block_or_street_is_unavailable() {
        let enriched = enrich(&properties(), &address_prices(), &FlatType::FourRoom);

        // no block token in the address
        assert_eq!(enriched[2].block_street, None);
        assert_eq!(enriched[2].price, PriceValue::NotAvailable);
        // no street even though a price exists for the would-be key
        assert_eq!(enriched[3].price, PriceValue::NotAvailable);
        assert_eq!(enriched[3].price_color, UNAVAILABLE_COLOR);
    }

    #[test]
    fn test_empty_prices_render_everything_unavailable() {
        let props = properties();
        let enriched = enrich(&props, &[], &FlatType::FourRoom);
        assert_eq!(enriched.len(), props.len());
        assert!(enriched.iter().all(|e| !e.price.is_available()));
    }

    #[test]
    fn test_invalid_price_is_unavailable() {
        let prices = decode_address_prices(
            r#"[{"block_street": "101 BEDOK NTH AVE 4", "flat_type": "4 ROOM", "price": "NaN"}]"#,
        )
        .unwrap();
        let enriched = enrich(&properties(), &prices, &FlatType::FourRoom);
        assert_eq!(enriched[0].price, PriceValue::NotAvailable);
    }

    #[test]
    fn test_duplicate_address_last_row_wins() {
        let prices = decode_address_prices(
            r#"[
                {"block_street": "101 BEDOK NTH AVE 4", "flat_type": "4 ROOM", "price": 500000},
                {"block_street": "101 BEDOK NTH AVE 4", "flat_type": "4 ROOM", "price": 820000}
            ]"#,
        )
        .unwrap();
        let enriched = enrich(&properties(), &prices, &FlatType::FourRoom);
        assert_eq!(enriched[0].price.amount(), Some(820_000.0));
    }

    #[test]
    fn test_output_keys_unique_and_from_input() {
        let props = properties();
        let enriched = enrich(&props, &address_prices(), &FlatType::FourRoom);

        let input_keys: HashSet<String> = props.iter().filter_map(|p| p.block_street()).collect();
        let output_keys: Vec<&String> = enriched.iter().filter_map(|e| e.block_street.as_ref()).collect();
        let unique: HashSet<&String> = output_keys.iter().copied().collect();

        assert_eq!(enriched.len(), props.len());
        assert_eq!(unique.len(), output_keys.len());
        assert!(output_keys.iter().all(|k| input_keys.contains(*k)));
    }

    #[test]
    fn test_price_value_display() {
        assert_eq!(PriceValue::Available(650_000.0).to_string(), "650000");
        assert_eq!(PriceValue::NotAvailable.to_string(), "NA");
        assert_eq!(serde_json::to_value(PriceValue::NotAvailable).unwrap(), json!("NA"));
        assert_eq!(serde_json::to_value(PriceValue::Available(1.5)).unwrap(), json!(1.5));
    }
}
