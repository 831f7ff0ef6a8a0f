//! Service configuration

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Capacity service configuration, read from `CYTHRO_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP port for the capacity API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds without telemetry before a node is marked offline
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Seconds between stale-telemetry sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Seconds a monitoring summary may be served from cache
    #[serde(default = "default_summary_cache_ttl")]
    pub summary_cache_ttl_secs: u64,

    /// Maximum nodes returned in `recommended_nodes`
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

fn default_api_port() -> u16 {
    8080
}

fn default_stale_after() -> u64 {
    120
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_summary_cache_ttl() -> u64 {
    30
}

fn default_max_recommendations() -> usize {
    capacity_lib::capacity::DEFAULT_MAX_RECOMMENDATIONS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            stale_after_secs: default_stale_after(),
            sweep_interval_secs: default_sweep_interval(),
            summary_cache_ttl_secs: default_summary_cache_ttl(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CYTHRO").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn summary_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.summary_cache_ttl_secs)
    }
}
