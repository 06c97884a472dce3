//! External sea-route provider client.
//!
//! The provider returns a GeoJSON `FeatureCollection`; the first feature's
//! `LineString` (or `MultiLineString`) holds `[lon, lat]` pairs and
//! `properties.distance` the length in metres. One attempt per request, no
//! retries: failures open a backoff window and callers fall back to local
//! routing.

use crate::backoff::Backoff;
use crate::cache::{prune_cache, Timed};
use crate::config::Config;
use crate::error::ProviderError;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voyage_core::{GeoPoint, ProviderRoute};

const METRES_PER_NM: f64 = 1852.0;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<FeatureProperties>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureProperties {
    distance: Option<f64>,
}

fn parse_position(value: &Value) -> Option<GeoPoint> {
    let pair = value.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    let point = GeoPoint::new(lat, lon);
    point.is_valid().then_some(point)
}

fn parse_line(value: &Value) -> Vec<GeoPoint> {
    value
        .as_array()
        .map(|positions| positions.iter().filter_map(parse_position).collect())
        .unwrap_or_default()
}

/// Extract waypoints from a provider response body.
pub fn parse_provider_route(body: &str) -> Result<ProviderRoute, ProviderError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|err| ProviderError::Malformed(err.to_string()))?;
    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("no features".to_string()))?;
    let geometry = feature
        .geometry
        .ok_or_else(|| ProviderError::Malformed("feature without geometry".to_string()))?;

    let waypoints = match geometry.kind.as_str() {
        "LineString" => parse_line(&geometry.coordinates),
        "MultiLineString" => geometry
            .coordinates
            .as_array()
            .map(|lines| lines.iter().flat_map(parse_line).collect())
            .unwrap_or_default(),
        other => {
            return Err(ProviderError::Malformed(format!(
                "unsupported geometry type {other}"
            )))
        }
    };

    Ok(ProviderRoute {
        waypoints,
        reported_distance_nm: feature
            .properties
            .and_then(|props| props.distance)
            .filter(|metres| metres.is_finite())
            .map(|metres| metres / METRES_PER_NM),
    })
}

fn build_route_url(base: &str, from: GeoPoint, to: GeoPoint) -> String {
    format!(
        "{}/{:.6},{:.6};{:.6},{:.6}",
        base.trim_end_matches('/'),
        from.lon,
        from.lat,
        to.lon,
        to.lat
    )
}

fn route_cache_key(from: GeoPoint, to: GeoPoint) -> String {
    format!(
        "route:{:.4}:{:.4}:{:.4}:{:.4}",
        from.lat, from.lon, to.lat, to.lon
    )
}

#[derive(Debug, Clone)]
pub struct SeaRouteProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    cache_ttl: Duration,
    cache_max_entries: usize,
    cache: Arc<DashMap<String, Timed<ProviderRoute>>>,
    backoff: Arc<Mutex<Backoff>>,
}

impl SeaRouteProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.searoute_provider_url.trim().to_string(),
            api_key: config.searoute_api_key.clone(),
            timeout: Duration::from_secs(config.searoute_timeout_s.max(1)),
            cache_ttl: Duration::from_secs(config.searoute_cache_ttl_s.max(30)),
            cache_max_entries: config.searoute_cache_max_entries.max(1),
            cache: Arc::new(DashMap::new()),
            backoff: Arc::new(Mutex::new(Backoff::new(
                Duration::from_millis(config.backoff_base_ms),
                Duration::from_secs(config.backoff_max_s),
            ))),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.base_url.is_empty()
    }

    fn with_backoff<T>(&self, f: impl FnOnce(&mut Backoff) -> T) -> T {
        let mut guard = self.backoff.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Fetch provider waypoints for `from -> to`, serving fresh cache hits
    /// directly and stale ones when the provider fails.
    pub async fn fetch_route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<ProviderRoute, ProviderError> {
        if !self.enabled() {
            return Err(ProviderError::Disabled);
        }

        let cache_key = route_cache_key(from, to);
        let mut stale: Option<ProviderRoute> = None;
        if let Some(entry) = self.cache.get(&cache_key) {
            if entry.is_fresh(self.cache_ttl) {
                return Ok(entry.value.clone());
            }
            if entry.is_fresh(self.cache_ttl.saturating_mul(2)) {
                stale = Some(entry.value.clone());
            }
        }

        if !self.with_backoff(|backoff| backoff.ready()) {
            return stale.ok_or(ProviderError::BackingOff);
        }

        match self.request(from, to).await {
            Ok(route) => {
                self.with_backoff(Backoff::reset);
                self.cache.insert(cache_key, Timed::now(route.clone()));
                prune_cache(
                    &self.cache,
                    self.cache_max_entries,
                    self.cache_ttl.saturating_mul(2),
                );
                Ok(route)
            }
            Err(err) => {
                let delay = self.with_backoff(Backoff::fail);
                match stale {
                    Some(stale) => {
                        tracing::warn!("Sea-route fetch failed, using stale cache: {}", err);
                        Ok(stale)
                    }
                    None => {
                        tracing::warn!(
                            "Sea-route fetch failed, skipping provider for {:?}: {}",
                            delay,
                            err
                        );
                        Err(err)
                    }
                }
            }
        }
    }

    async fn request(&self, from: GeoPoint, to: GeoPoint) -> Result<ProviderRoute, ProviderError> {
        let mut request = self
            .client
            .get(build_route_url(&self.base_url, from, to))
            .timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_provider_route(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_string_feature() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "LineString", "coordinates": [[58.7, 23.75], [59.6, 23.3], [60.5, 22.8]]},
                "properties": {"distance": 185200.0}
            }]
        }"#;
        let route = parse_provider_route(body).unwrap();
        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(route.waypoints[0], GeoPoint::new(23.75, 58.7));
        assert!((route.reported_distance_nm.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn flattens_multi_line_string_and_skips_bad_positions() {
        let body = r#"{
            "features": [{
                "geometry": {"type": "MultiLineString", "coordinates": [
                    [[55.2, 25.35], [56.0, 26.4]],
                    [[56.0, 26.4], ["x", 1], [57.0, 25.9]]
                ]}
            }]
        }"#;
        let route = parse_provider_route(body).unwrap();
        assert_eq!(route.waypoints.len(), 4);
        assert!(route.reported_distance_nm.is_none());
    }

    #[test]
    fn rejects_empty_or_unsupported_collections() {
        assert!(matches!(
            parse_provider_route(r#"{"features": []}"#),
            Err(ProviderError::Malformed(_))
        ));
        assert!(matches!(
            parse_provider_route(r#"{"features": [{"geometry": {"type": "Point", "coordinates": [1, 2]}}]}"#),
            Err(ProviderError::Malformed(_))
        ));
        assert!(matches!(
            parse_provider_route("not json"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn url_uses_lon_lat_order() {
        let url = build_route_url(
            "https://routes.example/sea/",
            GeoPoint::new(25.0, 55.0),
            GeoPoint::new(26.5, 56.25),
        );
        assert_eq!(
            url,
            "https://routes.example/sea/55.000000,25.000000;56.250000,26.500000"
        );
    }

    #[tokio::test]
    async fn disabled_provider_reports_disabled() {
        let provider = SeaRouteProvider::new(Client::new(), &Config::offline());
        let result = provider
            .fetch_route(GeoPoint::new(25.0, 55.0), GeoPoint::new(24.0, 58.0))
            .await;
        assert!(matches!(result, Err(ProviderError::Disabled)));
    }

    /// Answer the first request with `body`, every later one with 503.
    async fn flaky_provider(body: &'static str) -> String {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let served = Arc::new(AtomicUsize::new(0));
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let first = served.fetch_add(1, Ordering::SeqCst) == 0;
                let (status, body) = if first {
                    ("200 OK", body)
                } else {
                    ("503 Service Unavailable", "{}")
                };
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/route", addr)
    }

    #[tokio::test]
    async fn stale_route_is_served_when_provider_fails() {
        let body = r#"{"features":[{"geometry":{"type":"LineString",
            "coordinates":[[58.7,23.75],[59.6,23.3],[60.5,22.8]]}}]}"#;
        let config = Config {
            searoute_provider_url: flaky_provider(body).await,
            ..Config::offline()
        };
        let mut provider = SeaRouteProvider::new(Client::new(), &config);
        provider.cache_ttl = Duration::from_millis(200);

        let (from, to) = (GeoPoint::new(23.75, 58.7), GeoPoint::new(22.8, 60.5));
        let fresh = provider.fetch_route(from, to).await.unwrap();
        assert_eq!(fresh.waypoints.len(), 3);

        // Past the TTL but inside the stale window
        tokio::time::sleep(Duration::from_millis(300)).await;
        let stale = provider.fetch_route(from, to).await.unwrap();
        assert_eq!(stale.waypoints, fresh.waypoints);

        // The failure opened a backoff window; the stale copy still answers
        let again = provider.fetch_route(from, to).await.unwrap();
        assert_eq!(again.waypoints, fresh.waypoints);

        // Nothing cached for other endpoints
        let uncached = provider.fetch_route(to, from).await;
        assert!(uncached.is_err());
    }
}
