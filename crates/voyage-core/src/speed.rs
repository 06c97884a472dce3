//! Per-segment speed optimization.
//!
//! Fuel burn per hour grows with the cube of speed, so per nautical mile it
//! grows with the square. Wind, current and waves change both the speed made
//! good and the resistance, and are folded into an adjusted rate per segment.

use crate::geometry::interpolate_great_circle;
use crate::models::{GeoPoint, Route, RouteSegment};
use crate::vessel::{VesselProfile, DEFAULT_VESSEL_TYPE};
use crate::weather::{weather_risk, WeatherSample};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Ground speed never drops below this, whatever the set against the vessel.
pub const MIN_GROUND_SPEED_KN: f64 = 0.5;

const ECONOMY_FRACTION: f64 = 0.85;
const HEAVY_SEA_WAVE_M: f64 = 2.5;
const HEAVY_SEA_FRACTION: f64 = 0.8;
const STRONG_PRIORITY: f64 = 70.0;

fn neutral_priority() -> f64 {
    50.0
}

fn clamp_priority(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        neutral_priority()
    }
}

#[derive(Deserialize)]
struct RawPriorities {
    #[serde(default = "neutral_priority")]
    fuel: f64,
    #[serde(default = "neutral_priority")]
    time: f64,
}

/// Relative weight of fuel economy against schedule, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPriorities")]
pub struct Priorities {
    fuel: f64,
    time: f64,
}

impl From<RawPriorities> for Priorities {
    fn from(raw: RawPriorities) -> Self {
        Self::new(raw.fuel, raw.time)
    }
}

impl Default for Priorities {
    fn default() -> Self {
        Self::new(neutral_priority(), neutral_priority())
    }
}

impl Priorities {
    pub fn new(fuel: f64, time: f64) -> Self {
        Self {
            fuel: clamp_priority(fuel),
            time: clamp_priority(time),
        }
    }

    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Share of fuel in the blend, 0.5 when both priorities are zero.
    pub fn fuel_weight(&self) -> f64 {
        let total = self.fuel + self.time;
        if total > 0.0 {
            self.fuel / total
        } else {
            0.5
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrivalWindow {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    #[serde(default)]
    pub preferred: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortConditions {
    #[serde(default)]
    pub berth_available_at: Option<DateTime<Utc>>,
}

fn default_vessel_type() -> String {
    DEFAULT_VESSEL_TYPE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedRequest {
    #[serde(default = "default_vessel_type")]
    pub vessel_type: String,
    #[serde(default)]
    pub priorities: Priorities,
    #[serde(default)]
    pub arrival_window: Option<ArrivalWindow>,
    #[serde(default)]
    pub port_conditions: Option<PortConditions>,
    pub departure: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedProfile {
    pub segment_index: usize,
    pub recommended_speed_kn: f64,
    pub min_speed_kn: f64,
    pub max_speed_kn: f64,
    pub reason: String,
    /// Litres per nm through the water at the recommended speed
    pub fuel_rate: f64,
    /// Litres per nm over ground after wind, current and waves
    pub adjusted_fuel_rate: f64,
}

/// Speed band implied by an arrival window and the speed chosen inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPlan {
    pub min_required_speed_kn: f64,
    pub max_allowed_speed_kn: f64,
    pub recommended_speed_kn: f64,
    pub feasible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WindowPlan {
    /// Lowest speed a segment may run at and still respect the window.
    pub fn speed_floor_kn(&self) -> f64 {
        if self.feasible {
            self.min_required_speed_kn
        } else {
            self.recommended_speed_kn
        }
    }

    /// Highest speed a segment may run at without arriving before the window.
    pub fn speed_ceiling_kn(&self) -> f64 {
        if self.feasible {
            self.max_allowed_speed_kn
        } else {
            self.recommended_speed_kn
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualArrival {
    pub recommended_speed_kn: f64,
    pub normal_speed_kn: f64,
    pub arrival: DateTime<Utc>,
    pub fuel_saved_l: f64,
    pub co2_saved_kg: f64,
    pub waiting_hours_avoided: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedMetrics {
    pub total_distance_nm: f64,
    pub total_time_hrs: f64,
    pub total_fuel_l: f64,
    /// Cruising speed on every segment under the same conditions
    pub baseline_fuel_l: f64,
    pub fuel_savings_l: f64,
    pub fuel_savings_percent: f64,
    pub co2_kg: f64,
    pub co2_savings_kg: f64,
    pub total_cost: f64,
    pub average_speed_kn: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTiming {
    pub departure: DateTime<Utc>,
    pub eta: DateTime<Utc>,
    pub window: Option<WindowPlan>,
    pub virtual_arrival: Option<VirtualArrival>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedOptimization {
    pub recommended_route: Route,
    pub speed_profile: Vec<SpeedProfile>,
    pub metrics: SpeedMetrics,
    pub timing: SpeedTiming,
    pub recommendations: Vec<String>,
}

/// Fuel burned per nm at `speed_kn`, clamped to the vessel's envelope.
pub fn fuel_rate_at_speed(vessel: &VesselProfile, speed_kn: f64) -> f64 {
    let ratio = vessel.clamp_speed(speed_kn) / vessel.cruising_speed_kn;
    vessel.fuel_consumption_l_per_nm * ratio * ratio
}

fn cos_between(direction_deg: f64, heading_deg: f64) -> f64 {
    (direction_deg - heading_deg).to_radians().cos()
}

/// Speed gained (positive) or lost to wind blowing from `from_deg`.
///
/// Headwinds cost 0.1 kn per knot of wind, tailwinds return 0.03.
pub fn wind_effect(wind_speed_kn: f64, from_deg: f64, heading_deg: f64) -> f64 {
    let alignment = cos_between(from_deg + 180.0, heading_deg);
    let factor = if alignment < 0.0 { 0.1 } else { 0.03 };
    alignment * wind_speed_kn.max(0.0) * factor
}

/// Component of a current setting toward `toward_deg` along the heading.
pub fn current_effect(current_speed_kn: f64, toward_deg: f64, heading_deg: f64) -> f64 {
    cos_between(toward_deg, heading_deg) * current_speed_kn.max(0.0)
}

/// Resistance multiplier for waves of `height_m` arriving from `from_deg`.
pub fn wave_resistance(height_m: f64, from_deg: f64, heading_deg: f64) -> f64 {
    let alignment = cos_between(from_deg + 180.0, heading_deg);
    1.0 + height_m.max(0.0).powf(1.5) * 0.08 * (1.0 - alignment * 0.3)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelRates {
    pub fuel_rate: f64,
    pub adjusted_fuel_rate: f64,
    pub ground_speed_kn: f64,
    pub wave_multiplier: f64,
}

/// Through-water and over-ground fuel rates for one segment.
pub fn segment_fuel_rates(
    vessel: &VesselProfile,
    speed_kn: f64,
    heading_deg: f64,
    weather: Option<&WeatherSample>,
) -> FuelRates {
    let fuel_rate = fuel_rate_at_speed(vessel, speed_kn);
    let (ground_speed_kn, wave_multiplier) = match weather {
        Some(sample) => {
            let wind = wind_effect(sample.wind_speed_kn, sample.wind_direction_deg, heading_deg);
            let current = match (sample.current_speed_kn, sample.current_direction_deg) {
                (Some(speed), Some(direction)) => current_effect(speed, direction, heading_deg),
                _ => 0.0,
            };
            let waves = wave_resistance(
                sample.wave_height_m,
                sample.effective_wave_direction_deg(),
                heading_deg,
            );
            (speed_kn + wind + current, waves)
        }
        None => (speed_kn, 1.0),
    };
    let ground_speed_kn = ground_speed_kn.max(MIN_GROUND_SPEED_KN);
    FuelRates {
        fuel_rate,
        adjusted_fuel_rate: fuel_rate * wave_multiplier * (speed_kn / ground_speed_kn),
        ground_speed_kn,
        wave_multiplier,
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

fn after_hours(start: DateTime<Utc>, hours: f64) -> DateTime<Utc> {
    start + Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

/// Choose a speed that lands `distance_nm` inside `window`.
pub fn optimize_arrival_window(
    distance_nm: f64,
    departure: DateTime<Utc>,
    window: &ArrivalWindow,
    vessel: &VesselProfile,
    priorities: &Priorities,
) -> WindowPlan {
    let (earliest, latest) = if window.latest < window.earliest {
        (window.latest, window.earliest)
    } else {
        (window.earliest, window.latest)
    };
    let hours_to_latest = hours_between(departure, latest);
    let hours_to_earliest = hours_between(departure, earliest);

    let min_needed = if hours_to_latest > 0.0 {
        distance_nm / hours_to_latest
    } else {
        f64::INFINITY
    };
    let max_allowed = if hours_to_earliest > 0.0 {
        distance_nm / hours_to_earliest
    } else {
        f64::INFINITY
    };

    if min_needed > vessel.max_speed_kn {
        return WindowPlan {
            min_required_speed_kn: min_needed,
            max_allowed_speed_kn: max_allowed,
            recommended_speed_kn: vessel.max_speed_kn,
            feasible: false,
            reason: Some(format!(
                "latest arrival unreachable: needs {:.1} kn, vessel maximum is {:.1} kn",
                min_needed, vessel.max_speed_kn
            )),
        };
    }
    if max_allowed < vessel.min_speed_kn {
        return WindowPlan {
            min_required_speed_kn: min_needed,
            max_allowed_speed_kn: max_allowed,
            recommended_speed_kn: vessel.min_speed_kn,
            feasible: false,
            reason: Some(format!(
                "arrives before the window opens even at minimum speed {:.1} kn",
                vessel.min_speed_kn
            )),
        };
    }

    let lo = min_needed.max(vessel.min_speed_kn);
    let hi = max_allowed.min(vessel.max_speed_kn);
    let economical = vessel.cruising_speed_kn.clamp(lo, hi);
    let fuel_weight = priorities.fuel_weight();
    let mut recommended = lo * fuel_weight + economical * (1.0 - fuel_weight);

    if let Some(preferred) = window.preferred {
        let hours_to_preferred = hours_between(departure, preferred);
        if hours_to_preferred > 0.0 {
            let preferred_speed = (distance_nm / hours_to_preferred).clamp(lo, hi);
            recommended = (recommended + preferred_speed) / 2.0;
        }
    }

    WindowPlan {
        min_required_speed_kn: lo,
        max_allowed_speed_kn: hi,
        recommended_speed_kn: recommended,
        feasible: true,
        reason: None,
    }
}

/// Slow-steam advice when the vessel would otherwise wait for a berth.
///
/// Returns `None` when the berth is free on arrival or no slower speed helps.
pub fn virtual_arrival(
    distance_nm: f64,
    normal_speed_kn: f64,
    departure: DateTime<Utc>,
    berth_available_at: DateTime<Utc>,
    vessel: &VesselProfile,
) -> Option<VirtualArrival> {
    if distance_nm <= 0.0 || normal_speed_kn <= 0.0 {
        return None;
    }
    let normal_hours = distance_nm / normal_speed_kn;
    let hours_until_berth = hours_between(departure, berth_available_at);
    if normal_hours >= hours_until_berth {
        return None;
    }

    let speed = (distance_nm / hours_until_berth).max(vessel.min_speed_kn);
    if speed >= normal_speed_kn {
        return None;
    }
    let transit_hours = distance_nm / speed;
    let fuel_saved_l =
        distance_nm * (fuel_rate_at_speed(vessel, normal_speed_kn) - fuel_rate_at_speed(vessel, speed));

    Some(VirtualArrival {
        recommended_speed_kn: speed,
        normal_speed_kn,
        arrival: after_hours(departure, transit_hours),
        fuel_saved_l,
        co2_saved_kg: fuel_saved_l * vessel.emission_factors.co2,
        waiting_hours_avoided: transit_hours - normal_hours,
    })
}

fn segment_speed(
    vessel: &VesselProfile,
    priorities: &Priorities,
    window: Option<&WindowPlan>,
    weather: Option<&WeatherSample>,
) -> (f64, String) {
    let mut speed = vessel.cruising_speed_kn * ECONOMY_FRACTION;
    let mut reasons = vec!["economical cruise".to_string()];

    if let Some(plan) = window {
        let floor = plan.speed_floor_kn();
        if floor > speed {
            speed = floor;
            reasons.push("raised to meet arrival window".to_string());
        }
    }
    if let Some(sample) = weather {
        if sample.wave_height_m > HEAVY_SEA_WAVE_M {
            speed = speed.min(vessel.cruising_speed_kn * HEAVY_SEA_FRACTION);
            reasons.push(format!("reduced for {:.1} m seas", sample.wave_height_m));
        }
    }
    if priorities.fuel() > STRONG_PRIORITY {
        speed *= 0.9;
        reasons.push("fuel priority".to_string());
    }
    if priorities.time() > STRONG_PRIORITY {
        speed *= 1.1;
        reasons.push("time priority".to_string());
    }
    if let Some(plan) = window {
        let ceiling = plan.speed_ceiling_kn();
        if speed > ceiling {
            speed = ceiling;
            reasons.push("held back to avoid arriving before the window".to_string());
        }
    }

    (vessel.clamp_speed(speed), reasons.join("; "))
}

fn segment_midpoint(segment: &RouteSegment) -> GeoPoint {
    interpolate_great_circle(segment.from.point(), segment.to.point(), 0.5)
}

/// Recommend per-segment speeds for `route` without changing its geometry.
pub fn optimize_speeds<F>(route: &Route, request: &SpeedRequest, weather: F) -> SpeedOptimization
where
    F: Fn(GeoPoint) -> Option<WeatherSample>,
{
    let vessel = VesselProfile::lookup(&request.vessel_type);
    let window = request.arrival_window.as_ref().map(|window| {
        optimize_arrival_window(
            route.total_distance_nm,
            request.departure,
            window,
            vessel,
            &request.priorities,
        )
    });

    let mut recommended_route = route.clone();
    recommended_route.vessel_type = vessel.vessel_type.to_string();
    let mut speed_profile = Vec::with_capacity(route.segments.len());
    let mut baseline_fuel_l = 0.0;
    let mut heavy_sea_segments = 0usize;

    for (segment_index, segment) in recommended_route.segments.iter_mut().enumerate() {
        let sample = weather(segment_midpoint(segment));
        let (speed, reason) =
            segment_speed(vessel, &request.priorities, window.as_ref(), sample.as_ref());
        if sample
            .as_ref()
            .is_some_and(|s| s.wave_height_m > HEAVY_SEA_WAVE_M)
        {
            heavy_sea_segments += 1;
        }

        let rates = segment_fuel_rates(vessel, speed, segment.bearing_deg, sample.as_ref());
        let cruise = segment_fuel_rates(
            vessel,
            vessel.cruising_speed_kn,
            segment.bearing_deg,
            sample.as_ref(),
        );
        baseline_fuel_l += segment.distance_nm * cruise.adjusted_fuel_rate;

        segment.estimated_time_hrs = segment.distance_nm / rates.ground_speed_kn;
        segment.fuel_consumption_l = segment.distance_nm * rates.adjusted_fuel_rate;
        segment.weather_risk = sample.as_ref().map(weather_risk).unwrap_or(0.0);

        speed_profile.push(SpeedProfile {
            segment_index,
            recommended_speed_kn: speed,
            min_speed_kn: vessel.min_speed_kn,
            max_speed_kn: vessel.max_speed_kn,
            reason,
            fuel_rate: rates.fuel_rate,
            adjusted_fuel_rate: rates.adjusted_fuel_rate,
        });
    }

    let total_distance_nm = recommended_route.total_distance_nm;
    let total_time_hrs: f64 = recommended_route
        .segments
        .iter()
        .map(|s| s.estimated_time_hrs)
        .sum();
    let total_fuel_l: f64 = recommended_route
        .segments
        .iter()
        .map(|s| s.fuel_consumption_l)
        .sum();
    let through_water_hrs: f64 = recommended_route
        .segments
        .iter()
        .zip(&speed_profile)
        .map(|(s, p)| s.distance_nm / p.recommended_speed_kn)
        .sum();
    let average_speed_kn = if through_water_hrs > 0.0 {
        total_distance_nm / through_water_hrs
    } else {
        0.0
    };

    recommended_route.total_time_hrs = total_time_hrs;
    recommended_route.total_fuel_l = total_fuel_l;
    recommended_route.emissions = vessel.emissions_for(total_fuel_l);
    recommended_route.total_cost = total_fuel_l * vessel.fuel_cost_per_l;

    let fuel_savings_l = baseline_fuel_l - total_fuel_l;
    let metrics = SpeedMetrics {
        total_distance_nm,
        total_time_hrs,
        total_fuel_l,
        baseline_fuel_l,
        fuel_savings_l,
        fuel_savings_percent: if baseline_fuel_l > 0.0 {
            fuel_savings_l / baseline_fuel_l * 100.0
        } else {
            0.0
        },
        co2_kg: recommended_route.emissions.co2_kg,
        co2_savings_kg: fuel_savings_l * vessel.emission_factors.co2,
        total_cost: recommended_route.total_cost,
        average_speed_kn,
    };

    let virtual_arrival = request
        .port_conditions
        .and_then(|port| port.berth_available_at)
        .and_then(|berth| {
            virtual_arrival(total_distance_nm, average_speed_kn, request.departure, berth, vessel)
        });

    let mut recommendations = Vec::new();
    if let Some(plan) = &window {
        match &plan.reason {
            Some(reason) => recommendations.push(format!("Arrival window cannot be met: {}", reason)),
            None => recommendations.push(format!(
                "Hold {:.1} kn to arrive inside the window ({:.1}-{:.1} kn feasible)",
                plan.recommended_speed_kn, plan.min_required_speed_kn, plan.max_allowed_speed_kn
            )),
        }
    }
    if let Some(va) = &virtual_arrival {
        recommendations.push(format!(
            "Slow to {:.1} kn for virtual arrival: saves {:.0} L fuel and {:.1} h at anchor",
            va.recommended_speed_kn, va.fuel_saved_l, va.waiting_hours_avoided
        ));
    }
    if heavy_sea_segments > 0 {
        recommendations.push(format!(
            "Reduced speed on {} segment(s) with waves above {:.1} m",
            heavy_sea_segments, HEAVY_SEA_WAVE_M
        ));
    }
    if fuel_savings_l > 0.0 {
        recommendations.push(format!(
            "Profile saves {:.0} L ({:.1}%) against cruising at {:.1} kn",
            fuel_savings_l, metrics.fuel_savings_percent, vessel.cruising_speed_kn
        ));
    }
    if recommendations.is_empty() {
        recommendations.push("Maintain recommended speeds".to_string());
    }

    tracing::debug!(
        "Speed profile for {} segments: {:.0} L vs {:.0} L baseline",
        speed_profile.len(),
        total_fuel_l,
        baseline_fuel_l
    );

    SpeedOptimization {
        timing: SpeedTiming {
            departure: request.departure,
            eta: after_hours(request.departure, total_time_hrs),
            window,
            virtual_arrival,
        },
        recommended_route,
        speed_profile,
        metrics,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, RouteSource, SeaRoute, SeaRouteWaypoint};
    use crate::route_engine::build_route;
    use chrono::TimeZone;

    fn departure() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn request(vessel_type: &str) -> SpeedRequest {
        SpeedRequest {
            vessel_type: vessel_type.to_string(),
            priorities: Priorities::default(),
            arrival_window: None,
            port_conditions: None,
            departure: departure(),
        }
    }

    /// Two eastbound legs along 25N.
    fn eastbound_route(vessel_type: &str) -> Route {
        let waypoints = vec![
            SeaRouteWaypoint::at(GeoPoint::new(25.0, 53.0)),
            SeaRouteWaypoint::at(GeoPoint::new(25.0, 53.5)),
            SeaRouteWaypoint::at(GeoPoint::new(25.0, 54.0)),
        ];
        let points: Vec<GeoPoint> = waypoints.iter().map(SeaRouteWaypoint::point).collect();
        let sea = SeaRoute {
            total_distance_nm: crate::geometry::path_distance_nm(&points),
            waypoints,
            source: RouteSource::Network,
        };
        build_route(&sea, VesselProfile::lookup(vessel_type), |_| None)
    }

    #[test]
    fn fuel_rate_at_cruise_equals_base_rate() {
        for vessel in VesselProfile::all() {
            let rate = fuel_rate_at_speed(vessel, vessel.cruising_speed_kn);
            assert!((rate - vessel.fuel_consumption_l_per_nm).abs() < 1e-9);
        }
        let tug = VesselProfile::lookup("tugboat");
        assert!((fuel_rate_at_speed(tug, 5.0) - 7.0).abs() < 1e-9);
        // Clamped to the envelope
        assert_eq!(fuel_rate_at_speed(tug, 40.0), fuel_rate_at_speed(tug, 13.0));
    }

    #[test]
    fn wind_costs_more_ahead_than_it_gives_astern() {
        // Heading east into an easterly
        assert!((wind_effect(20.0, 90.0, 90.0) + 2.0).abs() < 1e-9);
        // Westerly behind
        assert!((wind_effect(20.0, 270.0, 90.0) - 0.6).abs() < 1e-9);
        assert!(wind_effect(20.0, 0.0, 90.0).abs() < 1e-9);
    }

    #[test]
    fn current_follows_travel_direction() {
        assert!((current_effect(2.0, 90.0, 90.0) - 2.0).abs() < 1e-9);
        assert!((current_effect(2.0, 270.0, 90.0) + 2.0).abs() < 1e-9);
    }

    #[test]
    fn head_seas_cost_more_than_following_seas() {
        let head = wave_resistance(2.0, 90.0, 90.0);
        let following = wave_resistance(2.0, 270.0, 90.0);
        assert!(head > following);
        assert!((head - (1.0 + 2.0f64.powf(1.5) * 0.08 * 1.3)).abs() < 1e-9);
        assert_eq!(wave_resistance(0.0, 90.0, 90.0), 1.0);
    }

    #[test]
    fn ground_speed_is_floored() {
        let tug = VesselProfile::lookup("tugboat");
        let sample = WeatherSample {
            current_speed_kn: Some(10.0),
            current_direction_deg: Some(270.0),
            ..WeatherSample::calm()
        };
        let rates = segment_fuel_rates(tug, 4.0, 90.0, Some(&sample));
        assert_eq!(rates.ground_speed_kn, MIN_GROUND_SPEED_KN);
        assert!((rates.adjusted_fuel_rate - rates.fuel_rate * 8.0).abs() < 1e-9);
    }

    #[test]
    fn tugboat_in_head_seas_burns_noticeably_more() {
        let route = eastbound_route("tugboat");
        let result = optimize_speeds(&route, &request("tugboat"), |_| {
            Some(WeatherSample {
                wave_height_m: 3.0,
                wave_direction_deg: Some(90.0),
                ..WeatherSample::calm()
            })
        });

        for profile in &result.speed_profile {
            assert!(profile.adjusted_fuel_rate > 1.15 * profile.fuel_rate);
            assert_eq!(profile.recommended_speed_kn, 8.0);
            assert!(profile.reason.contains("3.0 m seas"), "{}", profile.reason);
        }
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("waves above 2.5 m")));
    }

    #[test]
    fn calm_profile_runs_at_economy_speed() {
        let route = eastbound_route("supply_vessel");
        let result = optimize_speeds(&route, &request("supply_vessel"), |_| None);

        assert_eq!(result.speed_profile.len(), route.segments.len());
        for profile in &result.speed_profile {
            assert!((profile.recommended_speed_kn - 10.2).abs() < 1e-9);
            assert_eq!(profile.adjusted_fuel_rate, profile.fuel_rate);
        }
        assert!(result.metrics.fuel_savings_l > 0.0);
        assert!((result.metrics.average_speed_kn - 10.2).abs() < 1e-9);
        assert_eq!(
            result.recommended_route.waypoints, route.waypoints,
            "geometry must not change"
        );
        let expected_eta = after_hours(departure(), route.total_distance_nm / 10.2);
        assert!((result.timing.eta - expected_eta).num_milliseconds().abs() <= 1);
    }

    #[test]
    fn priorities_scale_speed_and_are_clamped() {
        let route = eastbound_route("supply_vessel");
        let mut fuel_first = request("supply_vessel");
        fuel_first.priorities = Priorities::new(250.0, -5.0);
        assert_eq!(fuel_first.priorities.fuel(), 100.0);
        assert_eq!(fuel_first.priorities.time(), 0.0);

        let result = optimize_speeds(&route, &fuel_first, |_| None);
        assert!((result.speed_profile[0].recommended_speed_kn - 12.0 * 0.85 * 0.9).abs() < 1e-9);

        let mut time_first = request("supply_vessel");
        time_first.priorities = Priorities::new(10.0, 90.0);
        let result = optimize_speeds(&route, &time_first, |_| None);
        assert!((result.speed_profile[0].recommended_speed_kn - 12.0 * 0.85 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn window_speed_stays_inside_feasible_band() {
        let vessel = VesselProfile::lookup("supply_vessel");
        let window = ArrivalWindow {
            earliest: departure() + Duration::hours(10),
            latest: departure() + Duration::hours(20),
            preferred: None,
        };
        let plan = optimize_arrival_window(150.0, departure(), &window, vessel, &Priorities::default());
        assert!(plan.feasible);
        assert!((plan.min_required_speed_kn - 7.5).abs() < 1e-9);
        assert!((plan.max_allowed_speed_kn - 15.0).abs() < 1e-9);
        assert!(plan.recommended_speed_kn >= 7.5 && plan.recommended_speed_kn <= 15.0);
        assert!((plan.recommended_speed_kn - 9.75).abs() < 1e-9);

        let with_preference = ArrivalWindow {
            preferred: Some(departure() + Duration::hours(12)),
            ..window
        };
        let plan =
            optimize_arrival_window(150.0, departure(), &with_preference, vessel, &Priorities::default());
        assert!((plan.recommended_speed_kn - (9.75 + 12.5) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn infeasible_windows_pick_closest_speed() {
        let vessel = VesselProfile::lookup("supply_vessel");
        let too_soon = ArrivalWindow {
            earliest: departure() + Duration::hours(1),
            latest: departure() + Duration::hours(2),
            preferred: None,
        };
        let plan = optimize_arrival_window(150.0, departure(), &too_soon, vessel, &Priorities::default());
        assert!(!plan.feasible);
        assert_eq!(plan.recommended_speed_kn, vessel.max_speed_kn);
        assert!(plan.reason.is_some());

        let too_late = ArrivalWindow {
            earliest: departure() + Duration::hours(100),
            latest: departure() + Duration::hours(120),
            preferred: None,
        };
        let plan = optimize_arrival_window(150.0, departure(), &too_late, vessel, &Priorities::default());
        assert!(!plan.feasible);
        assert_eq!(plan.recommended_speed_kn, vessel.min_speed_kn);
    }

    #[test]
    fn tight_window_raises_segment_speed() {
        let route = eastbound_route("supply_vessel");
        let mut req = request("supply_vessel");
        let hours = route.total_distance_nm / 14.0;
        req.arrival_window = Some(ArrivalWindow {
            earliest: departure(),
            latest: after_hours(departure(), hours),
            preferred: None,
        });
        let result = optimize_speeds(&route, &req, |_| None);
        for profile in &result.speed_profile {
            assert!((profile.recommended_speed_kn - 14.0).abs() < 1e-6);
            assert!(profile.reason.contains("arrival window"));
        }
    }

    #[test]
    fn wide_window_holds_speed_below_economy() {
        let route = eastbound_route("supply_vessel");
        let earliest = departure() + Duration::hours(7);
        let latest = departure() + Duration::hours(9);
        let mut req = request("supply_vessel");
        req.arrival_window = Some(ArrivalWindow {
            earliest,
            latest,
            preferred: None,
        });

        let result = optimize_speeds(&route, &req, |_| None);
        let plan = result.timing.window.as_ref().unwrap();
        assert!(plan.feasible);
        for profile in &result.speed_profile {
            assert!(profile.recommended_speed_kn <= plan.max_allowed_speed_kn + 1e-9);
            assert!(profile.reason.contains("before the window"));
        }
        assert!(result.timing.eta >= earliest);
        assert!(result.timing.eta <= latest);
    }

    #[test]
    fn virtual_arrival_slows_within_envelope() {
        let vessel = VesselProfile::lookup("supply_vessel");
        let berth = departure() + Duration::hours(20);
        let va = virtual_arrival(120.0, 12.0, departure(), berth, vessel).unwrap();
        assert!(va.recommended_speed_kn >= vessel.min_speed_kn);
        assert!(va.recommended_speed_kn < 12.0);
        assert!((va.recommended_speed_kn - 6.0).abs() < 1e-9);
        assert!((va.waiting_hours_avoided - 10.0).abs() < 1e-9);
        assert!(va.fuel_saved_l > 0.0);
        assert!((va.co2_saved_kg - va.fuel_saved_l * 2.68).abs() < 1e-9);
        assert_eq!(va.arrival, berth);

        // Berth ready before normal arrival
        let early_berth = departure() + Duration::hours(5);
        assert!(virtual_arrival(120.0, 12.0, departure(), early_berth, vessel).is_none());
    }

    #[test]
    fn virtual_arrival_respects_minimum_speed() {
        let vessel = VesselProfile::lookup("supply_vessel");
        let berth = departure() + Duration::hours(100);
        let va = virtual_arrival(120.0, 12.0, departure(), berth, vessel).unwrap();
        assert_eq!(va.recommended_speed_kn, vessel.min_speed_kn);
        assert!((va.waiting_hours_avoided - (24.0 - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn optimize_speeds_reports_virtual_arrival() {
        let route = eastbound_route("supply_vessel");
        let mut req = request("supply_vessel");
        req.port_conditions = Some(PortConditions {
            berth_available_at: Some(departure() + Duration::hours(8)),
        });
        let result = optimize_speeds(&route, &req, |_| None);
        let va = result.timing.virtual_arrival.as_ref().unwrap();
        assert!(va.recommended_speed_kn < result.metrics.average_speed_kn);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("virtual arrival")));
    }

    #[test]
    fn priorities_deserialize_with_defaults_and_clamping() {
        let priorities: Priorities = serde_json::from_str(r#"{"fuel": 180}"#).unwrap();
        assert_eq!(priorities.fuel(), 100.0);
        assert_eq!(priorities.time(), 50.0);
        assert_eq!(Priorities::new(0.0, 0.0).fuel_weight(), 0.5);
    }

    #[test]
    fn empty_route_yields_empty_profile() {
        let sea = SeaRoute {
            waypoints: vec![SeaRouteWaypoint::at(GeoPoint::new(25.0, 55.0))],
            total_distance_nm: 0.0,
            source: RouteSource::Network,
        };
        let route = build_route(&sea, VesselProfile::default_profile(), |_| None);
        let result = optimize_speeds(&route, &request("supply_vessel"), |_| None);
        assert!(result.speed_profile.is_empty());
        assert_eq!(result.metrics.total_fuel_l, 0.0);
        assert_eq!(result.timing.eta, departure());
    }
}
