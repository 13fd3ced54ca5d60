//! Configuration management for the Rocky MCP server

use rocky_core::AgentSettings;
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub yields: YieldsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Yields API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct YieldsConfig {
    /// Base URL of the DeFiLlama yields API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for YieldsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://yields.llama.fi".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Cooldown cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum cache entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// How long a fetched dataset is reused, in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_max_capacity() -> u64 {
    256
}

fn default_ttl() -> u64 {
    60
}

/// Conversation agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Opportunities kept per search
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Days of APY history per chart series
    #[serde(default = "default_chart_days")]
    pub chart_days: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            chart_days: default_chart_days(),
        }
    }
}

fn default_top_n() -> usize {
    rocky_core::search::DEFAULT_TOP_N
}

fn default_chart_days() -> i64 {
    rocky_core::chart::DEFAULT_CHART_DAYS
}

impl AgentConfig {
    pub fn settings(&self) -> AgentSettings {
        AgentSettings {
            top_n: self.top_n.max(1),
            chart_days: self.chart_days.clamp(1, rocky_core::chart::MAX_CHART_DAYS),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub async fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("yields.api_url", default_api_url())?
            .set_default("yields.timeout_seconds", default_timeout() as i64)?
            .set_default("cache.max_capacity", default_max_capacity() as i64)?
            .set_default("cache.ttl_seconds", default_ttl() as i64)?
            .set_default("agent.top_n", default_top_n() as i64)?
            .set_default("agent.chart_days", default_chart_days())?
            // Load from file if present
            .add_source(config::File::with_name("rocky-mcp").required(false))
            // Override with environment variables, e.g. ROCKY_CACHE__TTL_SECONDS
            .add_source(
                config::Environment::with_prefix("ROCKY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.yields.api_url, "https://yields.llama.fi");
        assert_eq!(config.yields.timeout_seconds, 30);
        assert_eq!(config.cache.max_capacity, 256);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.agent.top_n, 5);
        assert_eq!(config.agent.chart_days, 7);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"cache": {"ttl_seconds": 5}, "agent": {"top_n": 0}}"#).unwrap();
        assert_eq!(config.cache.ttl_seconds, 5);
        assert_eq!(config.cache.max_capacity, 256);
        assert_eq!(config.yields.timeout_seconds, 30);
        assert_eq!(config.agent.settings().top_n, 1);
    }

    #[test]
    fn test_chart_days_are_bounded() {
        let config: AppConfig =
            serde_json::from_str(r#"{"agent": {"chart_days": 9223372036854775807}}"#).unwrap();
        assert_eq!(config.agent.settings().chart_days, 365);

        let config: AppConfig = serde_json::from_str(r#"{"agent": {"chart_days": -4}}"#).unwrap();
        assert_eq!(config.agent.settings().chart_days, 1);
    }
}
