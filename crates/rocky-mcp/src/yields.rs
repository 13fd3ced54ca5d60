//! DeFiLlama yields API client
//!
//! Serves `/pools` and `/chart/{pool}` through the cooldown cache.

use reqwest::Client;
use rocky_core::{ApiEnvelope, ChartPoint, Opportunity, PoolSource, SearchError};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::SharedCache;
use crate::config::YieldsConfig;
use crate::error::{Result, RockyMcpError};

/// HTTP client for the yields API
pub struct YieldsClient {
    client: Client,
    api_url: String,
    cache: SharedCache,
}

impl YieldsClient {
    pub fn new(config: &YieldsConfig, cache: SharedCache) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RockyMcpError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    async fn get_data<T: DeserializeOwned>(&self, url: &str) -> std::result::Result<Vec<T>, SearchError> {
        tracing::debug!(url = %url, "Fetching yields data");

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let envelope: ApiEnvelope<T> = response.json().await.map_err(classify)?;
        envelope.into_data()
    }
}

impl PoolSource for YieldsClient {
    async fn fetch_pools(&self) -> std::result::Result<Vec<Opportunity>, SearchError> {
        if let Some(pools) = self.cache.get_pools().await {
            tracing::debug!(count = pools.len(), "Pools served from cache");
            return Ok(pools.as_ref().clone());
        }

        let url = format!("{}/pools", self.api_url);
        let pools = self.get_data::<Opportunity>(&url).await?;
        tracing::info!(count = pools.len(), "Fetched pools dataset");

        self.cache.set_pools(Arc::new(pools.clone())).await;
        Ok(pools)
    }

    async fn fetch_chart(&self, pool_id: &str) -> std::result::Result<Vec<ChartPoint>, SearchError> {
        if let Some(points) = self.cache.get_chart(pool_id).await {
            return Ok(points.as_ref().clone());
        }

        let url = format!("{}/chart/{}", self.api_url, pool_id);
        let points = self.get_data::<ChartPoint>(&url).await?;

        self.cache.set_chart(pool_id, Arc::new(points.clone())).await;
        Ok(points)
    }
}

fn classify(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else if e.is_decode() {
        SearchError::Malformed(e.to_string())
    } else {
        SearchError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use serde_json::json;

    fn offline_client() -> YieldsClient {
        let config = YieldsConfig {
            api_url: "http://127.0.0.1:9/".to_string(),
            timeout_seconds: 2,
        };
        YieldsClient::new(&config, create_cache(&CacheConfig::default())).unwrap()
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(offline_client().api_url(), "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_cached_pools_skip_network() {
        let client = offline_client();
        let pool: Opportunity =
            serde_json::from_value(json!({"chain": "Base", "project": "aerodrome-v1", "symbol": "USDC-AERO", "pool": "p"}))
                .unwrap();
        client.cache().set_pools(Arc::new(vec![pool])).await;

        let pools = client.fetch_pools().await.unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].project, "aerodrome-v1");
    }

    #[tokio::test]
    async fn test_cached_chart_skip_network() {
        let client = offline_client();
        client.cache().set_chart("p", Arc::new(vec![])).await;
        assert!(client.fetch_chart("p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_a_search_error() {
        let err = offline_client().fetch_pools().await.unwrap_err();
        assert!(matches!(err, SearchError::Http(_) | SearchError::Timeout));
    }
}
