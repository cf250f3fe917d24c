//! In-memory price source
//!
//! Serves wire payloads from memory (or a fixtures directory) through the
//! same envelope parsing as the HTTP source. Records every call and can
//! delay or fail individual endpoints, which is what the coordinator and
//! dashboard tests lean on.

use async_trait::async_trait;
use atlas_core::{FeatureCollection, PriceRecord, PropertyRecord};
use chrono::Datelike;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::query::{PriceQuery, TownScope};
use crate::source::{Endpoint, PriceSource};
use crate::{wire, FetchError, FetchResult};

/// Raw response bodies, one per endpoint
#[derive(Debug, Clone)]
pub struct WireFixtures {
    pub properties: String,
    pub agg_prices: String,
    pub geojson: String,
    pub agg_address_prices: String,
    /// Street-level rows for every town; filtered per request
    pub prices: String,
}

impl WireFixtures {
    /// Wrap plain row arrays in the envelopes the API sends
    pub fn from_rows(
        properties: Value,
        agg_prices: Value,
        geojson: Value,
        agg_address_prices: Value,
        prices: Value,
    ) -> Self {
        Self {
            properties: json!({ "properties": properties }).to_string(),
            agg_prices: json!({ "prices": agg_prices.to_string() }).to_string(),
            geojson: json!({ "geojson": geojson }).to_string(),
            agg_address_prices: json!({ "prices": agg_address_prices.to_string() }).to_string(),
            prices: json!({ "prices": prices.to_string() }).to_string(),
        }
    }

    /// Read `properties.json`, `agg_prices.json`, `geojson.json`,
    /// `agg_address_prices.json` and `prices.json` from `dir`
    pub fn from_dir(dir: &Path) -> FetchResult<Self> {
        let read = |endpoint: Endpoint| {
            let path = dir.join(endpoint.fixture_name());
            std::fs::read_to_string(&path).map_err(|e| FetchError::Transport {
                endpoint,
                message: format!("{}: {}", path.display(), e),
            })
        };

        Ok(Self {
            properties: read(Endpoint::Properties)?,
            agg_prices: read(Endpoint::TownPrices)?,
            geojson: read(Endpoint::Boundaries)?,
            agg_address_prices: read(Endpoint::AddressPrices)?,
            prices: read(Endpoint::Prices)?,
        })
    }

    fn body(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Properties => &self.properties,
            Endpoint::TownPrices => &self.agg_prices,
            Endpoint::Boundaries => &self.geojson,
            Endpoint::AddressPrices => &self.agg_address_prices,
            Endpoint::Prices => &self.prices,
        }
    }
}

/// One request observed by a [`MemorySource`]
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCall {
    Base(Endpoint),
    Prices(PriceQuery),
}

/// Price source answering from memory
pub struct MemorySource {
    fixtures: WireFixtures,
    current_year: i32,
    latency: Duration,
    /// Extra delay for dynamic requests keyed by their town list
    town_latency: HashMap<Vec<String>, Duration>,
    failures: Mutex<HashMap<Endpoint, FetchError>>,
    calls: Mutex<Vec<SourceCall>>,
}

impl MemorySource {
    pub fn new(fixtures: WireFixtures) -> Self {
        Self {
            fixtures,
            current_year: chrono::Local::now().year(),
            latency: Duration::ZERO,
            town_latency: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_dir(dir: &Path) -> FetchResult<Self> {
        Ok(Self::new(WireFixtures::from_dir(dir)?))
    }

    /// Year used to derive building ages
    pub fn current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// Delay applied to every request
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Delay applied to dynamic requests for exactly this town list
    pub fn town_latency(mut self, towns: &[&str], latency: Duration) -> Self {
        self.town_latency
            .insert(towns.iter().map(|t| t.to_string()).collect(), latency);
        self
    }

    /// Make `endpoint` fail until [`MemorySource::heal`] is called
    pub fn fail(&self, endpoint: Endpoint, error: FetchError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(endpoint, error);
        }
    }

    pub fn heal(&self, endpoint: Endpoint) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(&endpoint);
        }
    }

    /// Every call made so far, in order of arrival
    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Dynamic price requests made so far
    pub fn price_calls(&self) -> Vec<PriceQuery> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SourceCall::Prices(query) => Some(query),
                SourceCall::Base(_) => None,
            })
            .collect()
    }

    fn record(&self, call: SourceCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn injected_failure(&self, endpoint: Endpoint) -> FetchResult<()> {
        match self.failures.lock().ok().and_then(|f| f.get(&endpoint).cloned()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn respond(&self, endpoint: Endpoint, extra: Duration) -> FetchResult<&str> {
        let delay = self.latency + extra;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.injected_failure(endpoint)?;
        Ok(self.fixtures.body(endpoint))
    }

    async fn base(&self, endpoint: Endpoint) -> FetchResult<&str> {
        self.record(SourceCall::Base(endpoint));
        self.respond(endpoint, Duration::ZERO).await
    }
}

#[async_trait]
impl PriceSource for MemorySource {
    async fn properties(&self) -> FetchResult<Vec<PropertyRecord>> {
        let body = self.base(Endpoint::Properties).await?;
        wire::parse_properties(body, self.current_year)
    }

    async fn town_prices(&self) -> FetchResult<Vec<PriceRecord>> {
        let body = self.base(Endpoint::TownPrices).await?;
        wire::parse_aggregate_prices(Endpoint::TownPrices, body)
    }

    async fn boundaries(&self) -> FetchResult<FeatureCollection> {
        let body = self.base(Endpoint::Boundaries).await?;
        wire::parse_boundaries(body)
    }

    async fn address_prices(&self) -> FetchResult<Vec<PriceRecord>> {
        let body = self.base(Endpoint::AddressPrices).await?;
        wire::parse_address_prices(body)
    }

    async fn prices(&self, query: &PriceQuery) -> FetchResult<Vec<PriceRecord>> {
        self.record(SourceCall::Prices(query.clone()));

        let extra = match &query.scope {
            TownScope::Towns(towns) => self.town_latency.get(towns).copied().unwrap_or_default(),
            TownScope::All => Duration::ZERO,
        };
        let body = self.respond(Endpoint::Prices, extra).await?;
        let records = wire::parse_aggregate_prices(Endpoint::Prices, body)?;

        Ok(records
            .into_iter()
            .filter(|r| query.scope.includes(r.town.as_deref()))
            .collect())
    }
}
