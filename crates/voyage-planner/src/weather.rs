//! Open-Meteo weather lookups.
//!
//! Wind, visibility and the weather code come from the forecast endpoint;
//! waves and currents from the marine endpoint. A failed marine lookup still
//! yields a sample, with waves assumed calm.

use crate::backoff::Backoff;
use crate::cache::{point_key, prune_cache, Timed};
use crate::config::Config;
use crate::error::ProviderError;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voyage_core::{GeoPoint, WeatherCondition, WeatherSample};

const METRES_PER_NM: f64 = 1852.0;
const KMH_PER_KN: f64 = 1.852;
/// Samples are shared within roughly 6 nm.
const CACHE_DECIMALS: usize = 1;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<ForecastCurrent>,
}

#[derive(Debug, Deserialize)]
struct ForecastCurrent {
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    /// Metres
    visibility: Option<f64>,
    weather_code: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MarineResponse {
    current: Option<MarineCurrent>,
}

#[derive(Debug, Deserialize)]
struct MarineCurrent {
    wave_height: Option<f64>,
    wave_direction: Option<f64>,
    /// km/h
    ocean_current_velocity: Option<f64>,
    ocean_current_direction: Option<f64>,
}

/// Map a WMO weather code onto the coarse conditions used for risk scoring.
pub fn condition_from_code(code: u32) -> WeatherCondition {
    match code {
        0..=2 => WeatherCondition::Clear,
        3 => WeatherCondition::Cloudy,
        45 | 48 => WeatherCondition::Fog,
        51..=67 | 71..=86 => WeatherCondition::Rain,
        95..=99 => WeatherCondition::Storm,
        _ => WeatherCondition::Cloudy,
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn sample_from(forecast: ForecastCurrent, marine: Option<MarineCurrent>) -> WeatherSample {
    let calm = WeatherSample::calm();
    let mut sample = WeatherSample {
        wind_speed_kn: finite(forecast.wind_speed_10m).unwrap_or(0.0).max(0.0),
        wind_direction_deg: finite(forecast.wind_direction_10m).unwrap_or(0.0),
        visibility_nm: finite(forecast.visibility)
            .map(|metres| metres / METRES_PER_NM)
            .unwrap_or(calm.visibility_nm),
        condition: forecast
            .weather_code
            .map(condition_from_code)
            .unwrap_or_default(),
        ..calm
    };
    if let Some(marine) = marine {
        sample.wave_height_m = finite(marine.wave_height).unwrap_or(0.0).max(0.0);
        sample.wave_direction_deg = finite(marine.wave_direction);
        sample.current_speed_kn = finite(marine.ocean_current_velocity).map(|kmh| kmh / KMH_PER_KN);
        sample.current_direction_deg = finite(marine.ocean_current_direction);
    }
    sample
}

fn build_query_url(base: &str, point: GeoPoint, fields: &str, extra: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!(
        "{}{}latitude={:.4}&longitude={:.4}&current={}{}",
        base, separator, point.lat, point.lon, fields, extra
    )
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    forecast_url: String,
    marine_url: String,
    timeout: Duration,
    cache_ttl: Duration,
    cache_max_entries: usize,
    cache: Arc<DashMap<String, Timed<WeatherSample>>>,
    backoff: Arc<Mutex<Backoff>>,
}

impl WeatherProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            forecast_url: config.weather_forecast_url.trim().to_string(),
            marine_url: config.weather_marine_url.trim().to_string(),
            timeout: Duration::from_secs(config.weather_timeout_s.max(1)),
            cache_ttl: Duration::from_secs(config.weather_cache_ttl_s.max(30)),
            cache_max_entries: config.weather_cache_max_entries.max(1),
            cache: Arc::new(DashMap::new()),
            backoff: Arc::new(Mutex::new(Backoff::new(
                Duration::from_millis(config.backoff_base_ms),
                Duration::from_secs(config.backoff_max_s),
            ))),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.forecast_url.is_empty()
    }

    /// Key under which a sample for `point` is cached and looked up.
    pub fn cache_key(point: GeoPoint) -> String {
        point_key("wx", point.lat, point.lon, CACHE_DECIMALS)
    }

    fn with_backoff<T>(&self, f: impl FnOnce(&mut Backoff) -> T) -> T {
        let mut guard = self.backoff.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub async fn fetch_sample(&self, point: GeoPoint) -> Result<WeatherSample, ProviderError> {
        if !self.enabled() {
            return Err(ProviderError::Disabled);
        }
        let key = Self::cache_key(point);
        if let Some(entry) = self.cache.get(&key) {
            if entry.is_fresh(self.cache_ttl) {
                return Ok(entry.value.clone());
            }
        }
        if !self.with_backoff(|backoff| backoff.ready()) {
            return Err(ProviderError::BackingOff);
        }

        let forecast = match self.fetch_forecast(point).await {
            Ok(forecast) => forecast,
            Err(err) => {
                let delay = self.with_backoff(Backoff::fail);
                tracing::warn!("Weather fetch failed, skipping provider for {:?}: {}", delay, err);
                return Err(err);
            }
        };
        self.with_backoff(Backoff::reset);

        let marine = if self.marine_url.is_empty() {
            None
        } else {
            match self.fetch_marine(point).await {
                Ok(marine) => marine,
                Err(err) => {
                    tracing::debug!("Marine lookup failed at ({:.2}, {:.2}): {}", point.lat, point.lon, err);
                    None
                }
            }
        };

        let sample = sample_from(forecast, marine);
        self.cache.insert(key, Timed::now(sample.clone()));
        prune_cache(&self.cache, self.cache_max_entries, self.cache_ttl);
        Ok(sample)
    }

    async fn fetch_forecast(&self, point: GeoPoint) -> Result<ForecastCurrent, ProviderError> {
        let url = build_query_url(
            &self.forecast_url,
            point,
            "wind_speed_10m,wind_direction_10m,visibility,weather_code",
            "&wind_speed_unit=kn",
        );
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }
        let payload: ForecastResponse = response.json().await?;
        payload
            .current
            .ok_or_else(|| ProviderError::Malformed("forecast missing current block".to_string()))
    }

    async fn fetch_marine(&self, point: GeoPoint) -> Result<Option<MarineCurrent>, ProviderError> {
        let url = build_query_url(
            &self.marine_url,
            point,
            "wave_height,wave_direction,ocean_current_velocity,ocean_current_direction",
            "",
        );
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }
        let payload: MarineResponse = response.json().await?;
        Ok(payload.current)
    }
}
