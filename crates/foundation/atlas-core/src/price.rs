//! Price observations
//!
//! Two populations share one record type:
//! - aggregate prices, already summarised per town or per street and dated
//!   to a quarter
//! - address-level prices, one row per transacted `block_street`
//!
//! Records are decoded once from the wire and never mutated afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::numeric::loose_number;
use crate::{Result, ViewMode};

/// HDB flat type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FlatType {
    OneRoom,
    TwoRoom,
    ThreeRoom,
    FourRoom,
    FiveRoom,
    Executive,
    MultiGeneration,
    Other(String),
}

impl FlatType {
    pub fn label(&self) -> &str {
        match self {
            Self::OneRoom => "1 ROOM",
            Self::TwoRoom => "2 ROOM",
            Self::ThreeRoom => "3 ROOM",
            Self::FourRoom => "4 ROOM",
            Self::FiveRoom => "5 ROOM",
            Self::Executive => "EXECUTIVE",
            Self::MultiGeneration => "MULTI-GENERATION",
            Self::Other(label) => label,
        }
    }
}

impl Default for FlatType {
    fn default() -> Self {
        Self::FourRoom
    }
}

impl From<String> for FlatType {
    fn from(label: String) -> Self {
        match label.trim().to_uppercase().as_str() {
            "1 ROOM" => Self::OneRoom,
            "2 ROOM" => Self::TwoRoom,
            "3 ROOM" => Self::ThreeRoom,
            "4 ROOM" => Self::FourRoom,
            "5 ROOM" => Self::FiveRoom,
            "EXECUTIVE" => Self::Executive,
            "MULTI-GENERATION" | "MULTI GENERATION" => Self::MultiGeneration,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for FlatType {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<FlatType> for String {
    fn from(flat_type: FlatType) -> Self {
        flat_type.label().to_string()
    }
}

impl fmt::Display for FlatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// `"<block> <street>"` join key, address-level rows only
    pub block_street: Option<String>,
    pub town: Option<String>,
    pub street: Option<String>,
    pub flat_type: FlatType,
    /// Representative day of the observation period
    pub date: Option<NaiveDate>,
    /// `None` when the wire value failed the validity check
    pub price: Option<f64>,
}

impl PriceRecord {
    /// Name this row is grouped under for the given view mode
    pub fn group_key(&self, mode: ViewMode) -> Option<&str> {
        match mode {
            ViewMode::Town => self.town.as_deref(),
            ViewMode::Street => self.street.as_deref(),
        }
    }

    fn from_raw(raw: RawPrice) -> Option<Self> {
        let flat_type = raw.flat_type?;
        let date = raw
            .quarter
            .as_deref()
            .and_then(parse_quarter)
            .or_else(|| raw.date.as_deref().and_then(parse_date));

        Some(Self {
            block_street: raw.block_street.filter(|k| !k.trim().is_empty()),
            town: raw.town,
            street: raw.street,
            flat_type,
            date,
            price: loose_number(&raw.price),
        })
    }
}

/// Wire shape of a price row
#[derive(Debug, Deserialize)]
struct RawPrice {
    #[serde(default)]
    block_street: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    flat_type: Option<FlatType>,
    #[serde(default)]
    quarter: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    price: Value,
}

/// Convert `"2024-Q1"` to the first day of the quarter's last month
pub fn parse_quarter(quarter: &str) -> Option<NaiveDate> {
    let quarter = quarter.trim();
    let (year, rest) = quarter.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let q: u32 = rest.strip_prefix(['Q', 'q'])?.parse().ok()?;
    if !(1..=4).contains(&q) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, q * 3, 1)
}

/// Parse a literal `YYYY-MM-DD`, `YYYY-MM` or timestamp-prefixed date
fn parse_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    let day_part = date.get(..10).unwrap_or(date);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", date), "%Y-%m-%d").ok())
}

fn decode_rows(payload: &str) -> Result<Vec<PriceRecord>> {
    let rows: Vec<RawPrice> = serde_json::from_str(payload)?;
    let total = rows.len();
    let records: Vec<PriceRecord> = rows.into_iter().filter_map(PriceRecord::from_raw).collect();
    if records.len() < total {
        tracing::debug!(
            dropped = total - records.len(),
            "price rows without a flat type skipped"
        );
    }
    Ok(records)
}

/// Decode an aggregate price payload (the inner JSON string).
///
/// Rows without a usable date are dropped; they cannot be placed on a
/// time axis.
pub fn decode_aggregate_prices(payload: &str) -> Result<Vec<PriceRecord>> {
    let records = decode_rows(payload)?;
    Ok(records.into_iter().filter(|r| r.date.is_some()).collect())
}

/// Decode an address-level price payload (the inner JSON string).
pub fn decode_address_prices(payload: &str) -> Result<Vec<PriceRecord>> {
    let records = decode_rows(payload)?;
    Ok(records
        .into_iter()
        .filter(|r| r.block_street.is_some())
        .collect())
}
