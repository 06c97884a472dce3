//! Planner configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Sea-route provider endpoint. Empty disables the provider.
    pub searoute_provider_url: String,
    pub searoute_api_key: Option<String>,
    pub searoute_timeout_s: u64,
    pub searoute_cache_ttl_s: u64,
    pub searoute_cache_max_entries: usize,
    /// Open-Meteo forecast endpoint. Empty disables weather lookups.
    pub weather_forecast_url: String,
    /// Open-Meteo marine endpoint. Empty skips waves and currents.
    pub weather_marine_url: String,
    pub weather_timeout_s: u64,
    pub weather_cache_ttl_s: u64,
    pub weather_cache_max_entries: usize,
    pub backoff_base_ms: u64,
    pub backoff_max_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            searoute_provider_url: String::new(),
            searoute_api_key: None,
            searoute_timeout_s: 8,
            searoute_cache_ttl_s: 3600,
            searoute_cache_max_entries: 512,
            weather_forecast_url: String::new(),
            weather_marine_url: String::new(),
            weather_timeout_s: 5,
            weather_cache_ttl_s: 900,
            weather_cache_max_entries: 2048,
            backoff_base_ms: 500,
            backoff_max_s: 60,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            searoute_provider_url: env::var("VOYAGE_SEAROUTE_URL")
                .unwrap_or(defaults.searoute_provider_url),
            searoute_api_key: env::var("VOYAGE_SEAROUTE_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            searoute_timeout_s: env_parse("VOYAGE_SEAROUTE_TIMEOUT_S", defaults.searoute_timeout_s),
            searoute_cache_ttl_s: env_parse(
                "VOYAGE_SEAROUTE_CACHE_TTL_S",
                defaults.searoute_cache_ttl_s,
            ),
            searoute_cache_max_entries: env_parse(
                "VOYAGE_SEAROUTE_CACHE_MAX_ENTRIES",
                defaults.searoute_cache_max_entries,
            ),
            weather_forecast_url: env::var("VOYAGE_WEATHER_FORECAST_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            weather_marine_url: env::var("VOYAGE_WEATHER_MARINE_URL")
                .unwrap_or_else(|_| "https://marine-api.open-meteo.com/v1/marine".to_string()),
            weather_timeout_s: env_parse("VOYAGE_WEATHER_TIMEOUT_S", defaults.weather_timeout_s),
            weather_cache_ttl_s: env_parse("VOYAGE_WEATHER_CACHE_TTL_S", defaults.weather_cache_ttl_s),
            weather_cache_max_entries: env_parse(
                "VOYAGE_WEATHER_CACHE_MAX_ENTRIES",
                defaults.weather_cache_max_entries,
            ),
            backoff_base_ms: env_parse("VOYAGE_BACKOFF_BASE_MS", defaults.backoff_base_ms),
            backoff_max_s: env_parse("VOYAGE_BACKOFF_MAX_S", defaults.backoff_max_s),
        }
    }

    /// Configuration with every external provider disabled.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn searoute_enabled(&self) -> bool {
        !self.searoute_provider_url.trim().is_empty()
    }

    pub fn weather_enabled(&self) -> bool {
        !self.weather_forecast_url.trim().is_empty()
    }
}
