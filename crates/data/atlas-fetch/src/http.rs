//! HTTP price source backed by `reqwest`

use async_trait::async_trait;
use atlas_config::ApiConfig;
use atlas_core::{FeatureCollection, PriceRecord, PropertyRecord};
use chrono::Datelike;
use std::time::Duration;
use url::Url;

use crate::query::PriceQuery;
use crate::source::{Endpoint, PriceSource};
use crate::{wire, FetchError, FetchResult};

/// Talks to the resale price API
pub struct HttpPriceSource {
    /// API root, always ending in `/`
    base: Url,
    client: reqwest::Client,
}

impl HttpPriceSource {
    pub fn new(endpoint: &str, timeout: Duration) -> FetchResult<Self> {
        let mut root = endpoint.trim().to_string();
        if !root.ends_with('/') {
            root.push('/');
        }
        let base = Url::parse(&root).map_err(|e| FetchError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::InvalidEndpoint(e.to_string()))?;

        Ok(Self { base, client })
    }

    pub fn from_config(config: &ApiConfig) -> FetchResult<Self> {
        Self::new(&config.endpoint, config.timeout())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> FetchResult<Url> {
        self.base
            .join(endpoint.path().trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidEndpoint(e.to_string()))
    }

    async fn get_text(&self, endpoint: Endpoint, url: Url) -> FetchResult<String> {
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                endpoint,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Transport {
            endpoint,
            message: e.to_string(),
        })
    }

    async fn get(&self, endpoint: Endpoint) -> FetchResult<String> {
        let url = self.endpoint_url(endpoint)?;
        self.get_text(endpoint, url).await
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn properties(&self) -> FetchResult<Vec<PropertyRecord>> {
        let body = self.get(Endpoint::Properties).await?;
        wire::parse_properties(&body, chrono::Local::now().year())
    }

    async fn town_prices(&self) -> FetchResult<Vec<PriceRecord>> {
        let body = self.get(Endpoint::TownPrices).await?;
        wire::parse_aggregate_prices(Endpoint::TownPrices, &body)
    }

    async fn boundaries(&self) -> FetchResult<FeatureCollection> {
        let body = self.get(Endpoint::Boundaries).await?;
        wire::parse_boundaries(&body)
    }

    async fn address_prices(&self) -> FetchResult<Vec<PriceRecord>> {
        let body = self.get(Endpoint::AddressPrices).await?;
        wire::parse_address_prices(&body)
    }

    async fn prices(&self, query: &PriceQuery) -> FetchResult<Vec<PriceRecord>> {
        let url = query.url(&self.base)?;
        let body = self.get_text(Endpoint::Prices, url).await?;
        wire::parse_aggregate_prices(Endpoint::Prices, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_gets_trailing_slash() {
        let source = HttpPriceSource::new("http://127.0.0.1:8000", Duration::from_secs(1)).unwrap();
        assert_eq!(source.base().as_str(), "http://127.0.0.1:8000/");
        assert_eq!(
            source.endpoint_url(Endpoint::AddressPrices).unwrap().as_str(),
            "http://127.0.0.1:8000/api/agg_address_prices"
        );
    }

    #[test]
    fn test_nested_root_is_preserved() {
        let source = HttpPriceSource::new("https://example.org/atlas", Duration::from_secs(1)).unwrap();
        assert_eq!(
            source.endpoint_url(Endpoint::Properties).unwrap().as_str(),
            "https://example.org/atlas/api/properties"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpPriceSource::new("not a url", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, FetchError::InvalidEndpoint(_)));
    }
}
