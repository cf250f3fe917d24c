//! Where the datasets come from

use async_trait::async_trait;
use atlas_core::{FeatureCollection, PriceRecord, PropertyRecord};
use serde::Serialize;
use std::fmt;

use crate::query::PriceQuery;
use crate::FetchResult;

/// Backend endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Endpoint {
    Properties,
    TownPrices,
    Boundaries,
    AddressPrices,
    Prices,
}

impl Endpoint {
    /// The four datasets fetched once at startup
    pub const BASE: [Endpoint; 4] = [
        Endpoint::Properties,
        Endpoint::TownPrices,
        Endpoint::Boundaries,
        Endpoint::AddressPrices,
    ];

    /// Path relative to the API root
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Properties => "/api/properties",
            Endpoint::TownPrices => "/api/agg_prices",
            Endpoint::Boundaries => "/api/geojson",
            Endpoint::AddressPrices => "/api/agg_address_prices",
            Endpoint::Prices => "/api/prices",
        }
    }

    /// File name of the endpoint's payload in a fixtures directory
    pub fn fixture_name(&self) -> &'static str {
        match self {
            Endpoint::Properties => "properties.json",
            Endpoint::TownPrices => "agg_prices.json",
            Endpoint::Boundaries => "geojson.json",
            Endpoint::AddressPrices => "agg_address_prices.json",
            Endpoint::Prices => "prices.json",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A provider of decoded datasets.
///
/// Implementations must be cancel-safe: the coordinator drops in-flight
/// futures at any await point.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Building inventory
    async fn properties(&self) -> FetchResult<Vec<PropertyRecord>>;

    /// Prices aggregated per town
    async fn town_prices(&self) -> FetchResult<Vec<PriceRecord>>;

    /// Town boundary polygons
    async fn boundaries(&self) -> FetchResult<FeatureCollection>;

    /// Prices per block address
    async fn address_prices(&self) -> FetchResult<Vec<PriceRecord>>;

    /// Prices aggregated per street for a town scope and date window
    async fn prices(&self, query: &PriceQuery) -> FetchResult<Vec<PriceRecord>>;
}

/// The four base datasets, applied together or not at all
#[derive(Debug, Clone, Default)]
pub struct BaseData {
    pub properties: Vec<PropertyRecord>,
    pub town_prices: Vec<PriceRecord>,
    pub boundaries: FeatureCollection,
    pub address_prices: Vec<PriceRecord>,
}

/// Request all four base datasets concurrently. The first failure wins
/// and the remaining requests are dropped.
pub async fn load_base(source: &dyn PriceSource) -> FetchResult<BaseData> {
    let (properties, town_prices, boundaries, address_prices) = tokio::try_join!(
        source.properties(),
        source.town_prices(),
        source.boundaries(),
        source.address_prices(),
    )?;

    Ok(BaseData {
        properties,
        town_prices,
        boundaries,
        address_prices,
    })
}
