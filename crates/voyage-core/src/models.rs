//! Core data models for voyage planning.

use crate::error::StatusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both components are finite and within the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// An ordered point of a computed route. `name` and `note` are advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeaRouteWaypoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SeaRouteWaypoint {
    pub fn at(point: GeoPoint) -> Self {
        Self {
            lat: point.lat,
            lon: point.lon,
            name: None,
            note: None,
        }
    }

    pub fn named(point: GeoPoint, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::at(point)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Which strategy produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    /// Local graph or direct geometry
    Network,
    /// Provider waypoints with graph detours spliced in
    Hybrid,
    /// Provider waypoints used as-is
    Api,
}

/// Geometry produced by the route engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeaRoute {
    pub waypoints: Vec<SeaRouteWaypoint>,
    pub total_distance_nm: f64,
    pub source: RouteSource,
}

impl SeaRoute {
    pub fn points(&self) -> Vec<GeoPoint> {
        self.waypoints.iter().map(SeaRouteWaypoint::point).collect()
    }

    /// A route whose origin and destination coincide.
    pub fn is_trivial(&self) -> bool {
        self.waypoints.len() < 2
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Emissions {
    pub co2_kg: f64,
    pub nox_kg: f64,
    pub sox_kg: f64,
}

impl std::ops::Add for Emissions {
    type Output = Emissions;

    fn add(self, rhs: Emissions) -> Emissions {
        Emissions {
            co2_kg: self.co2_kg + rhs.co2_kg,
            nox_kg: self.nox_kg + rhs.nox_kg,
            sox_kg: self.sox_kg + rhs.sox_kg,
        }
    }
}

/// One leg between consecutive waypoints, with derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from: SeaRouteWaypoint,
    pub to: SeaRouteWaypoint,
    pub distance_nm: f64,
    pub bearing_deg: f64,
    pub estimated_time_hrs: f64,
    pub fuel_consumption_l: f64,
    /// 0 (benign) to 100 (severe)
    pub weather_risk: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

/// A priced route for one vessel. Owned by the caller for one planning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub vessel_type: String,
    pub waypoints: Vec<SeaRouteWaypoint>,
    pub segments: Vec<RouteSegment>,
    pub total_distance_nm: f64,
    pub total_time_hrs: f64,
    pub total_fuel_l: f64,
    pub emissions: Emissions,
    pub total_cost: f64,
    pub source: RouteSource,
    pub status: RouteStatus,
}

impl Route {
    /// Planned -> Active.
    pub fn activate(&mut self) -> Result<(), StatusError> {
        self.transition(RouteStatus::Planned, RouteStatus::Active)
    }

    /// Active -> Completed.
    pub fn complete(&mut self) -> Result<(), StatusError> {
        self.transition(RouteStatus::Active, RouteStatus::Completed)
    }

    fn transition(&mut self, expected: RouteStatus, next: RouteStatus) -> Result<(), StatusError> {
        if self.status != expected {
            return Err(StatusError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn origin(&self) -> Option<GeoPoint> {
        self.waypoints.first().map(SeaRouteWaypoint::point)
    }

    pub fn destination(&self) -> Option<GeoPoint> {
        self.waypoints.last().map(SeaRouteWaypoint::point)
    }
}

/// A caller-supplied stop for multi-stop sequencing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Higher values are visited first when any stop declares a priority
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub time_window_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_window_end: Option<DateTime<Utc>>,
}

impl Stop {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lon,
            priority: None,
            time_window_start: None,
            time_window_end: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.time_window_start = start;
        self.time_window_end = end;
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_route() -> Route {
        Route {
            vessel_type: "tugboat".to_string(),
            waypoints: Vec::new(),
            segments: Vec::new(),
            total_distance_nm: 0.0,
            total_time_hrs: 0.0,
            total_fuel_l: 0.0,
            emissions: Emissions::default(),
            total_cost: 0.0,
            source: RouteSource::Network,
            status: RouteStatus::Planned,
        }
    }

    #[test]
    fn route_status_follows_lifecycle() {
        let mut route = empty_route();
        assert!(route.complete().is_err());
        route.activate().expect("planned route activates");
        assert!(route.activate().is_err());
        route.complete().expect("active route completes");
        assert_eq!(route.status, RouteStatus::Completed);
    }

    #[test]
    fn geo_point_validation_rejects_nan_and_range() {
        assert!(GeoPoint::new(24.4, 54.1).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 54.1).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
    }

    #[test]
    fn route_source_serializes_lowercase() {
        let json = serde_json::to_string(&RouteSource::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");
    }
}
