//! Sea route engine: direct, regional-network and provider-backed strategies.
//!
//! Strategies are tried in order:
//! 1. short routes take the direct leg, or a single network waypoint detour;
//! 2. routes inside the configured region use interpolated great-circle legs,
//!    or a shortest path through the waypoint graph when land blocks them;
//! 3. anything else uses provider waypoints corrected for land crossings,
//!    falling back to strategy 2 when the provider has nothing.
//!
//! The engine performs no I/O. Callers fetch provider waypoints themselves
//! and hand them to [`RouteEngine::route_with_provider`].

use crate::error::RouteError;
use crate::geometry::{
    bearing_deg, distance_nm, interpolate_great_circle, interpolate_linear, path_distance_nm,
};
use crate::land::segment_crosses_land;
use crate::models::{
    GeoPoint, Route, RouteSegment, RouteSource, RouteStatus, SeaRoute, SeaRouteWaypoint,
};
use crate::network::NavGraph;
use crate::vessel::VesselProfile;
use crate::weather::{weather_fuel_factor, weather_risk, WeatherSample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionBounds {
    pub name: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RegionBounds {
    /// The Arabian Gulf up to the Strait of Hormuz.
    pub fn arabian_gulf() -> Self {
        Self {
            name: "Arabian Gulf".to_string(),
            min_lat: 23.5,
            max_lat: 30.5,
            min_lon: 47.5,
            max_lon: 56.6,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEngineConfig {
    /// Direct distance below which the short-route strategy applies
    pub short_route_threshold_nm: f64,
    /// Spacing of interpolated points on open-water legs
    pub interpolation_step_nm: f64,
    /// Routes shorter than this are not interpolated
    pub interpolation_min_route_nm: f64,
    /// Endpoints farther than this from their nearest node get an interpolated tail
    pub max_snap_distance_nm: f64,
    /// Graph nodes closer than this to the previous waypoint are skipped
    pub min_waypoint_spacing_nm: f64,
    /// Origin/destination closer than this produce a zero-length route
    pub degenerate_distance_nm: f64,
    pub region: RegionBounds,
}

impl Default for RouteEngineConfig {
    fn default() -> Self {
        Self {
            short_route_threshold_nm: 25.0,
            interpolation_step_nm: 25.0,
            interpolation_min_route_nm: 50.0,
            max_snap_distance_nm: 30.0,
            min_waypoint_spacing_nm: 3.0,
            degenerate_distance_nm: 0.01,
            region: RegionBounds::arabian_gulf(),
        }
    }
}

/// Raw waypoints from an external sea-route provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRoute {
    pub waypoints: Vec<GeoPoint>,
    /// Informational only; totals are always recomputed from waypoints
    pub reported_distance_nm: Option<f64>,
}

/// Accumulates waypoints while suppressing degenerate hops.
struct WaypointTrail {
    points: Vec<SeaRouteWaypoint>,
    min_spacing_nm: f64,
}

impl WaypointTrail {
    fn start(origin: SeaRouteWaypoint, min_spacing_nm: f64) -> Self {
        Self {
            points: vec![origin],
            min_spacing_nm,
        }
    }

    fn last_point(&self) -> GeoPoint {
        self.points
            .last()
            .map(SeaRouteWaypoint::point)
            .unwrap_or(GeoPoint::new(f64::NAN, f64::NAN))
    }

    /// Push unless within the minimum spacing of the last point or of `guard`.
    fn push_spaced(&mut self, waypoint: SeaRouteWaypoint, guard: Option<GeoPoint>) -> bool {
        let point = waypoint.point();
        if distance_nm(self.last_point(), point) < self.min_spacing_nm {
            return false;
        }
        if let Some(guard) = guard {
            if distance_nm(point, guard) < self.min_spacing_nm {
                return false;
            }
        }
        self.points.push(waypoint);
        true
    }

    fn push(&mut self, waypoint: SeaRouteWaypoint) {
        self.points.push(waypoint);
    }

    fn finish(self) -> Vec<SeaRouteWaypoint> {
        self.points
    }
}

fn sea_route(waypoints: Vec<SeaRouteWaypoint>, source: RouteSource) -> SeaRoute {
    let points: Vec<GeoPoint> = waypoints.iter().map(SeaRouteWaypoint::point).collect();
    SeaRoute {
        total_distance_nm: path_distance_nm(&points),
        waypoints,
        source,
    }
}

fn validate(label: &'static str, point: GeoPoint) -> Result<(), RouteError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(RouteError::InvalidCoordinate {
            label,
            lat: point.lat,
            lon: point.lon,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RouteEngine {
    graph: &'static NavGraph,
    config: RouteEngineConfig,
}

impl Default for RouteEngine {
    fn default() -> Self {
        Self::new(RouteEngineConfig::default())
    }
}

impl RouteEngine {
    pub fn new(config: RouteEngineConfig) -> Self {
        Self::with_graph(NavGraph::gulf(), config)
    }

    pub fn with_graph(graph: &'static NavGraph, config: RouteEngineConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &RouteEngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &'static NavGraph {
        self.graph
    }

    /// Compute a route without any external provider.
    pub fn compute_route(&self, from: GeoPoint, to: GeoPoint) -> Result<SeaRoute, RouteError> {
        match self.local_route(from, to)? {
            Some(route) => Ok(route),
            None => self.route_with_provider(from, to, None),
        }
    }

    /// True when [`RouteEngine::local_route`] would defer to a provider.
    pub fn needs_provider(&self, from: GeoPoint, to: GeoPoint) -> bool {
        from.is_valid()
            && to.is_valid()
            && distance_nm(from, to) >= self.config.short_route_threshold_nm
            && !(self.config.region.contains(from) && self.config.region.contains(to))
    }

    /// Strategies 1 and 2. `Ok(None)` means the route leaves the region and
    /// should go through [`RouteEngine::route_with_provider`].
    pub fn local_route(&self, from: GeoPoint, to: GeoPoint) -> Result<Option<SeaRoute>, RouteError> {
        validate("origin", from)?;
        validate("destination", to)?;

        let direct_nm = distance_nm(from, to);
        if direct_nm < self.config.degenerate_distance_nm {
            tracing::debug!("Origin equals destination, returning zero-length route");
            return Ok(Some(sea_route(
                vec![SeaRouteWaypoint::at(from).with_note("origin equals destination")],
                RouteSource::Network,
            )));
        }

        if direct_nm < self.config.short_route_threshold_nm {
            tracing::debug!("Short route ({:.1} nm)", direct_nm);
            return Ok(Some(self.short_route(from, to)));
        }

        if self.config.region.contains(from) && self.config.region.contains(to) {
            tracing::debug!("In-region route within {}", self.config.region.name);
            return Ok(Some(self.regional_route(from, to)));
        }

        Ok(None)
    }

    /// Strategy 3: correct provider waypoints, or fall back to network routing.
    pub fn route_with_provider(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        provider: Option<ProviderRoute>,
    ) -> Result<SeaRoute, RouteError> {
        validate("origin", from)?;
        validate("destination", to)?;

        let waypoints: Vec<GeoPoint> = provider
            .map(|route| route.waypoints)
            .unwrap_or_default()
            .into_iter()
            .filter(GeoPoint::is_valid)
            .collect();
        if waypoints.len() < 2 {
            tracing::debug!("No provider waypoints, falling back to network routing");
            return Ok(self.regional_route(from, to));
        }

        let mut raw: Vec<SeaRouteWaypoint> = Vec::with_capacity(waypoints.len() + 2);
        if distance_nm(from, waypoints[0]) > self.config.degenerate_distance_nm {
            raw.push(SeaRouteWaypoint::at(from));
        }
        raw.extend(waypoints.iter().copied().map(SeaRouteWaypoint::at));
        if let Some(&last) = waypoints.last() {
            if distance_nm(last, to) > self.config.degenerate_distance_nm {
                raw.push(SeaRouteWaypoint::at(to));
            }
        }

        let (corrected, detours) = self.correct_land_crossings(&raw);
        let source = if detours == 0 {
            RouteSource::Api
        } else {
            tracing::debug!("Spliced {} network detour(s) into provider route", detours);
            RouteSource::Hybrid
        };
        Ok(sea_route(corrected, source))
    }

    /// Replace land-crossing legs with network detours.
    ///
    /// Returns the corrected waypoints and the number of legs that needed a detour.
    pub fn correct_land_crossings(
        &self,
        waypoints: &[SeaRouteWaypoint],
    ) -> (Vec<SeaRouteWaypoint>, usize) {
        let Some(first) = waypoints.first() else {
            return (Vec::new(), 0);
        };
        let mut trail = WaypointTrail::start(first.clone(), self.config.min_waypoint_spacing_nm);
        let mut detours = 0usize;

        for pair in waypoints.windows(2) {
            let (a, b) = (pair[0].point(), pair[1].point());
            let crossing = segment_crosses_land(a, b);
            if crossing.crosses {
                let note = crossing
                    .land_area
                    .map(|area| format!("detour around {}", area))
                    .unwrap_or_else(|| "land detour".to_string());
                let mut pushed = 0usize;
                for node in self.network_nodes_between(a, b) {
                    if trail.push_spaced(node.with_note(note.clone()), Some(b)) {
                        pushed += 1;
                    }
                }
                if pushed > 0 {
                    detours += 1;
                }
            }
            trail.push(pair[1].clone());
        }

        (trail.finish(), detours)
    }

    fn short_route(&self, from: GeoPoint, to: GeoPoint) -> SeaRoute {
        if !segment_crosses_land(from, to).crosses {
            return sea_route(
                vec![SeaRouteWaypoint::at(from), SeaRouteWaypoint::at(to)],
                RouteSource::Network,
            );
        }

        let nodes = self.network_nodes_between(from, to);
        let mut waypoints = vec![SeaRouteWaypoint::at(from)];
        match nodes.get(nodes.len() / 2) {
            Some(mid) => waypoints.push(mid.clone().with_note("short-route detour")),
            None => tracing::warn!("No network detour available for short route, using direct leg"),
        }
        waypoints.push(SeaRouteWaypoint::at(to));
        sea_route(waypoints, RouteSource::Network)
    }

    fn regional_route(&self, from: GeoPoint, to: GeoPoint) -> SeaRoute {
        if segment_crosses_land(from, to).crosses {
            return self.network_route(from, to);
        }

        let direct_nm = distance_nm(from, to);
        let mut waypoints = vec![SeaRouteWaypoint::at(from)];
        if direct_nm >= self.config.interpolation_min_route_nm {
            let steps = (direct_nm / self.config.interpolation_step_nm.max(1.0)).ceil() as usize;
            for step in 1..steps {
                let fraction = step as f64 / steps as f64;
                waypoints.push(SeaRouteWaypoint::at(interpolate_great_circle(from, to, fraction)));
            }
        }
        waypoints.push(SeaRouteWaypoint::at(to));
        sea_route(waypoints, RouteSource::Network)
    }

    /// Snap both ends to the graph and follow the shortest path.
    fn network_route(&self, from: GeoPoint, to: GeoPoint) -> SeaRoute {
        let (Some((start, start_gap)), Some((end, end_gap))) =
            (self.graph.nearest_node(from), self.graph.nearest_node(to))
        else {
            tracing::warn!("Navigational graph is empty, using direct leg");
            return sea_route(
                vec![SeaRouteWaypoint::at(from), SeaRouteWaypoint::at(to)],
                RouteSource::Network,
            );
        };

        let path = self.graph.shortest_path(&start.id, &end.id);
        if path.is_empty() {
            tracing::warn!("No network path between {} and {}, using direct leg", start.id, end.id);
            return sea_route(
                vec![SeaRouteWaypoint::at(from), SeaRouteWaypoint::at(to)],
                RouteSource::Network,
            );
        }

        let step_nm = self.config.interpolation_step_nm.max(1.0);
        let mut trail = WaypointTrail::start(
            SeaRouteWaypoint::at(from),
            self.config.min_waypoint_spacing_nm,
        );

        if start_gap > self.config.max_snap_distance_nm {
            let steps = (start_gap / step_nm).ceil() as usize;
            for step in 1..steps {
                let point = interpolate_linear(from, start.point(), step as f64 / steps as f64);
                trail.push_spaced(SeaRouteWaypoint::at(point).with_note("approach"), Some(to));
            }
        }

        for node in &path {
            trail.push_spaced(SeaRouteWaypoint::named(node.point(), node.name.clone()), Some(to));
        }

        if end_gap > self.config.max_snap_distance_nm {
            let tail_start = trail.last_point();
            let gap = distance_nm(tail_start, to);
            let steps = (gap / step_nm).ceil() as usize;
            for step in 1..steps {
                let point = interpolate_linear(tail_start, to, step as f64 / steps as f64);
                trail.push_spaced(SeaRouteWaypoint::at(point).with_note("approach"), Some(to));
            }
        }

        trail.push(SeaRouteWaypoint::at(to));
        sea_route(trail.finish(), RouteSource::Network)
    }

    /// Named graph waypoints on the shortest path between the nodes nearest `a` and `b`.
    fn network_nodes_between(&self, a: GeoPoint, b: GeoPoint) -> Vec<SeaRouteWaypoint> {
        let (Some((start, _)), Some((end, _))) =
            (self.graph.nearest_node(a), self.graph.nearest_node(b))
        else {
            return Vec::new();
        };
        self.graph
            .shortest_path(&start.id, &end.id)
            .into_iter()
            .map(|node| SeaRouteWaypoint::named(node.point(), node.name.clone()))
            .collect()
    }
}

/// Fuel burned on one segment: `rate × distance × weather factor`.
pub fn segment_fuel_l(vessel: &VesselProfile, distance_nm: f64, weather_risk: f64) -> f64 {
    vessel.fuel_consumption_l_per_nm * distance_nm * weather_fuel_factor(weather_risk)
}

/// Price a route for a vessel, sampling weather at each segment midpoint.
pub fn build_route<F>(sea_route: &SeaRoute, vessel: &VesselProfile, weather: F) -> Route
where
    F: Fn(GeoPoint) -> Option<WeatherSample>,
{
    let segments: Vec<RouteSegment> = sea_route
        .waypoints
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0].point(), pair[1].point());
            let distance = distance_nm(from, to);
            let midpoint = interpolate_great_circle(from, to, 0.5);
            let risk = weather(midpoint)
                .map(|sample| weather_risk(&sample))
                .unwrap_or(0.0);
            RouteSegment {
                from: pair[0].clone(),
                to: pair[1].clone(),
                distance_nm: distance,
                bearing_deg: bearing_deg(from, to),
                estimated_time_hrs: distance / vessel.cruising_speed_kn,
                fuel_consumption_l: segment_fuel_l(vessel, distance, risk),
                weather_risk: risk,
            }
        })
        .collect();

    let total_time_hrs = segments.iter().map(|s| s.estimated_time_hrs).sum();
    let total_fuel_l: f64 = segments.iter().map(|s| s.fuel_consumption_l).sum();

    Route {
        vessel_type: vessel.vessel_type.to_string(),
        waypoints: sea_route.waypoints.clone(),
        segments,
        total_distance_nm: sea_route.total_distance_nm,
        total_time_hrs,
        total_fuel_l,
        emissions: vessel.emissions_for(total_fuel_l),
        total_cost: total_fuel_l * vessel.fuel_cost_per_l,
        source: sea_route.source,
        status: RouteStatus::Planned,
    }
}
