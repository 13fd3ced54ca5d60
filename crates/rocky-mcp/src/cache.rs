use moka::future::Cache;
use rocky_core::{ChartPoint, Opportunity};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

/// Cache key types for the yields endpoints
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum CacheKey {
    Pools,
    Chart { pool_id: String },
}

/// Cached value wrapper
#[derive(Debug, Clone)]
pub enum CacheValue {
    Pools(Arc<Vec<Opportunity>>),
    Chart(Arc<Vec<ChartPoint>>),
}

/// Cooldown cache: within the TTL a dataset is served from memory instead of
/// being fetched again.
#[derive(Clone)]
pub struct PoolCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl PoolCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();

        Self { cache }
    }

    /// Get the cached pools dataset
    pub async fn get_pools(&self) -> Option<Arc<Vec<Opportunity>>> {
        self.cache.get(&CacheKey::Pools).await.and_then(|v| {
            if let CacheValue::Pools(data) = v {
                Some(data)
            } else {
                None
            }
        })
    }

    /// Cache the pools dataset
    pub async fn set_pools(&self, data: Arc<Vec<Opportunity>>) {
        self.cache.insert(CacheKey::Pools, CacheValue::Pools(data)).await;
    }

    /// Get a cached chart series
    pub async fn get_chart(&self, pool_id: &str) -> Option<Arc<Vec<ChartPoint>>> {
        let key = CacheKey::Chart {
            pool_id: pool_id.to_string(),
        };

        self.cache.get(&key).await.and_then(|v| {
            if let CacheValue::Chart(data) = v {
                Some(data)
            } else {
                None
            }
        })
    }

    /// Cache a chart series
    pub async fn set_chart(&self, pool_id: &str, data: Arc<Vec<ChartPoint>>) {
        let key = CacheKey::Chart {
            pool_id: pool_id.to_string(),
        };
        self.cache.insert(key, CacheValue::Chart(data)).await;
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.entry_count(),
            weighted_size: self.cache.weighted_size(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entry_count: u64,
    pub weighted_size: u64,
}

/// Shared cache instance
pub type SharedCache = Arc<PoolCache>;

pub fn create_cache(config: &CacheConfig) -> SharedCache {
    Arc::new(PoolCache::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opportunity(symbol: &str) -> Opportunity {
        serde_json::from_value(json!({"chain": "Ethereum", "project": "lido", "symbol": symbol, "pool": symbol}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_pools_round_trip() {
        let cache = PoolCache::new(&CacheConfig::default());
        assert!(cache.get_pools().await.is_none());

        cache.set_pools(Arc::new(vec![opportunity("STETH")])).await;
        let pools = cache.get_pools().await.unwrap();
        assert_eq!(pools[0].symbol, "STETH");
    }

    #[tokio::test]
    async fn test_chart_keys_are_per_pool() {
        let cache = PoolCache::new(&CacheConfig::default());
        cache.set_chart("pool-a", Arc::new(vec![])).await;

        assert!(cache.get_chart("pool-a").await.is_some());
        assert!(cache.get_chart("pool-b").await.is_none());
        assert!(cache.get_pools().await.is_none());
    }

    #[tokio::test]
    async fn test_stats_count_entries() {
        let cache = PoolCache::new(&CacheConfig::default());
        cache.set_pools(Arc::new(vec![])).await;
        cache.set_chart("pool-a", Arc::new(vec![])).await;
        cache.cache.run_pending_tasks().await;

        assert_eq!(cache.stats().entry_count, 2);
    }
}
