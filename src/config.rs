use serde::Deserialize;
use std::time::Duration;

use crate::db::cache::TtlPresets;

/// Longest accepted premium period, about a century
pub const MAX_PREMIUM_PERIOD_DAYS: i64 = 36_500;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. The in-memory store is used when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Google Maps API key, enables geocoding of venue addresses
    #[serde(default)]
    pub google_maps_api_key: Option<String>,

    /// Google Maps API base URL
    #[serde(default = "default_google_maps_api_url")]
    pub google_maps_api_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cache_ttl_short_secs")]
    pub cache_ttl_short_secs: u64,

    #[serde(default = "default_cache_ttl_medium_secs")]
    pub cache_ttl_medium_secs: u64,

    #[serde(default = "default_cache_ttl_long_secs")]
    pub cache_ttl_long_secs: u64,

    /// Length of a premium subscription period
    #[serde(default = "default_premium_period_days")]
    pub premium_period_days: i64,
}

fn default_google_maps_api_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cache_ttl_short_secs() -> u64 {
    5 * 60
}

fn default_cache_ttl_medium_secs() -> u64 {
    30 * 60
}

fn default_cache_ttl_long_secs() -> u64 {
    24 * 60 * 60
}

fn default_premium_period_days() -> i64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            google_maps_api_key: None,
            google_maps_api_url: default_google_maps_api_url(),
            host: default_host(),
            port: default_port(),
            cache_ttl_short_secs: default_cache_ttl_short_secs(),
            cache_ttl_medium_secs: default_cache_ttl_medium_secs(),
            cache_ttl_long_secs: default_cache_ttl_long_secs(),
            premium_period_days: default_premium_period_days(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the rest of the service cannot honor
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.cache_ttl_short_secs < self.cache_ttl_medium_secs
            && self.cache_ttl_medium_secs < self.cache_ttl_long_secs)
        {
            anyhow::bail!(
                "Cache TTLs must satisfy short < medium < long (got {} / {} / {})",
                self.cache_ttl_short_secs,
                self.cache_ttl_medium_secs,
                self.cache_ttl_long_secs
            );
        }

        if !(1..=MAX_PREMIUM_PERIOD_DAYS).contains(&self.premium_period_days) {
            anyhow::bail!(
                "PREMIUM_PERIOD_DAYS must be between 1 and {} (got {})",
                MAX_PREMIUM_PERIOD_DAYS,
                self.premium_period_days
            );
        }

        Ok(())
    }

    pub fn ttl_presets(&self) -> TtlPresets {
        TtlPresets {
            short: Duration::from_secs(self.cache_ttl_short_secs),
            medium: Duration::from_secs(self.cache_ttl_medium_secs),
            long: Duration::from_secs(self.cache_ttl_long_secs),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
