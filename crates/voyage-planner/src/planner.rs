//! Voyage planning with external providers.
//!
//! Every operation gathers provider data first, then hands it to the
//! synchronous core. Provider problems are logged and planning continues on
//! local data.

use crate::config::Config;
use crate::error::ProviderError;
use crate::searoute::SeaRouteProvider;
use crate::weather::WeatherProvider;
use reqwest::Client;
use std::collections::HashMap;
use voyage_core::geometry::interpolate_great_circle;
use voyage_core::multi_stop::{assemble, plan_stop_order};
use voyage_core::{
    build_route, GeoPoint, MultiStopError, MultiStopOptions, MultiStopRequest, MultiStopResult,
    Route, RouteEngine, RouteError, SeaRoute, SpeedOptimization, SpeedRequest, VesselProfile,
    WeatherSample,
};

/// Weather keyed by [`WeatherProvider::cache_key`].
type WeatherTable = HashMap<String, WeatherSample>;

fn lookup(table: &WeatherTable, point: GeoPoint) -> Option<WeatherSample> {
    table.get(&WeatherProvider::cache_key(point)).cloned()
}

fn segment_midpoints(points: &[GeoPoint]) -> Vec<GeoPoint> {
    points
        .windows(2)
        .map(|pair| interpolate_great_circle(pair[0], pair[1], 0.5))
        .collect()
}

#[derive(Debug, Clone)]
pub struct VoyagePlanner {
    engine: RouteEngine,
    searoute: SeaRouteProvider,
    weather: WeatherProvider,
    options: MultiStopOptions,
}

impl VoyagePlanner {
    pub fn new(config: &Config) -> Self {
        Self::with_engine(config, RouteEngine::default())
    }

    pub fn with_engine(config: &Config, engine: RouteEngine) -> Self {
        let client = Client::new();
        Self {
            engine,
            searoute: SeaRouteProvider::new(client.clone(), config),
            weather: WeatherProvider::new(client, config),
            options: MultiStopOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MultiStopOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine(&self) -> &RouteEngine {
        &self.engine
    }

    /// Route geometry between two points, consulting the provider only for
    /// routes the local strategies do not cover.
    pub async fn compute_route(&self, from: GeoPoint, to: GeoPoint) -> Result<SeaRoute, RouteError> {
        if let Some(route) = self.engine.local_route(from, to)? {
            return Ok(route);
        }

        let provider_route = match self.searoute.fetch_route(from, to).await {
            Ok(route) => Some(route),
            Err(ProviderError::Disabled) => {
                tracing::debug!("Sea-route provider not configured, using network routing");
                None
            }
            Err(err) => {
                tracing::warn!("Sea-route provider unavailable, using network routing: {}", err);
                None
            }
        };
        self.engine.route_with_provider(from, to, provider_route)
    }

    /// Geometry plus per-segment metrics for a vessel type.
    pub async fn plan_route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        vessel_type: &str,
    ) -> Result<Route, RouteError> {
        let sea_route = self.compute_route(from, to).await?;
        let table = self.sample_weather(&segment_midpoints(&sea_route.points())).await;
        let vessel = VesselProfile::lookup(vessel_type);
        Ok(build_route(&sea_route, vessel, |point| lookup(&table, point)))
    }

    pub async fn optimize_multi_stop(
        &self,
        request: &MultiStopRequest,
    ) -> Result<MultiStopResult, MultiStopError> {
        let plan = plan_stop_order(&self.engine, request, &self.options)?;

        let endpoints = plan.leg_endpoints(request);
        let mut legs = Vec::with_capacity(endpoints.len());
        for (from, to) in endpoints {
            legs.push(self.plan_route(from, to, &request.vessel_type).await?);
        }

        let result = assemble(request, &plan, legs);
        tracing::info!(
            "Multi-stop plan: {} stops, {:.1} nm, {:.1}% shorter than given order",
            result.order.len(),
            result.total_distance_nm,
            result.savings.percent
        );
        Ok(result)
    }

    /// Reprice `route` with per-segment speed recommendations.
    pub async fn optimize_speeds(&self, route: &Route, request: &SpeedRequest) -> SpeedOptimization {
        let points: Vec<GeoPoint> = route.waypoints.iter().map(|wp| wp.point()).collect();
        let table = self.sample_weather(&segment_midpoints(&points)).await;
        voyage_core::optimize_speeds(route, request, |point| lookup(&table, point))
    }

    async fn sample_weather(&self, points: &[GeoPoint]) -> WeatherTable {
        let mut table = WeatherTable::new();
        if !self.weather.enabled() {
            return table;
        }
        for &point in points {
            let key = WeatherProvider::cache_key(point);
            if table.contains_key(&key) {
                continue;
            }
            match self.weather.fetch_sample(point).await {
                Ok(sample) => {
                    table.insert(key, sample);
                }
                Err(ProviderError::BackingOff) => break,
                Err(err) => {
                    tracing::warn!("Weather unavailable, continuing without it: {}", err);
                    break;
                }
            }
        }
        table
    }
}
