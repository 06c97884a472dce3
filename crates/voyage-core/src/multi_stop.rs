//! Multi-stop voyage sequencing.
//!
//! Stops are ordered by nearest-neighbour construction refined with 2-opt
//! over a matrix of sea-route distances. When any stop declares a priority
//! the order is re-sorted by priority instead. Legs are then resolved through
//! the route engine and summarised against the order the caller supplied.

use crate::error::{MultiStopError, RouteError};
use crate::models::{Emissions, GeoPoint, Route, Stop};
use crate::route_engine::{build_route, RouteEngine};
use crate::vessel::{VesselProfile, DEFAULT_VESSEL_TYPE};
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

fn default_vessel_type() -> String {
    DEFAULT_VESSEL_TYPE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiStopRequest {
    pub origin: Stop,
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub return_to_origin: bool,
    #[serde(default = "default_vessel_type")]
    pub vessel_type: String,
    /// Enables per-stop ETAs and time-window checks
    #[serde(default)]
    pub departure: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiStopOptions {
    /// Upper bound on full 2-opt sweeps
    pub max_two_opt_passes: usize,
    /// Optional wall-clock budget for 2-opt, checked between sweeps
    pub two_opt_budget_ms: Option<u64>,
}

impl Default for MultiStopOptions {
    fn default() -> Self {
        Self {
            max_two_opt_passes: 200,
            two_opt_budget_ms: None,
        }
    }
}

/// Symmetric pairwise distances. Index 0 is the origin, `i + 1` is stop `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Evaluate `distance` for every unordered pair in parallel.
    pub fn build<F, E>(size: usize, distance: F) -> Result<Self, E>
    where
        F: Fn(usize, usize) -> Result<f64, E> + Sync,
        E: Send,
    {
        let pairs: Vec<(usize, usize)> = (0..size)
            .flat_map(|i| (i + 1..size).map(move |j| (i, j)))
            .collect();
        let distances = pairs
            .par_iter()
            .map(|&(i, j)| distance(i, j))
            .collect::<Result<Vec<f64>, E>>()?;

        let mut values = vec![0.0; size * size];
        for (&(i, j), d) in pairs.iter().zip(distances) {
            values[i * size + j] = d;
            values[j * size + i] = d;
        }
        Ok(Self { size, values })
    }

    /// Sea-route distances between points, as the engine routes them offline.
    pub fn from_points(engine: &RouteEngine, points: &[GeoPoint]) -> Result<Self, RouteError> {
        Self::build(points.len(), |i, j| {
            engine
                .compute_route(points[i], points[j])
                .map(|route| route.total_distance_nm)
        })
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Cost of visiting `tour` in order, optionally closing back to `tour[0]`.
pub fn tour_distance(matrix: &DistanceMatrix, tour: &[usize], return_to_origin: bool) -> f64 {
    let open: f64 = tour.windows(2).map(|w| matrix.get(w[0], w[1])).sum();
    match (return_to_origin, tour.first(), tour.last()) {
        (true, Some(&first), Some(&last)) if tour.len() > 1 => open + matrix.get(last, first),
        _ => open,
    }
}

/// Greedy tour from index 0, always moving to the closest unvisited index.
pub fn nearest_neighbor_tour(matrix: &DistanceMatrix) -> Vec<usize> {
    if matrix.is_empty() {
        return Vec::new();
    }
    let mut visited = vec![false; matrix.len()];
    let mut tour = Vec::with_capacity(matrix.len());
    let mut current = 0;
    visited[0] = true;
    tour.push(0);

    while tour.len() < matrix.len() {
        let next = (0..matrix.len())
            .filter(|&candidate| !visited[candidate])
            .min_by(|&a, &b| matrix.get(current, a).total_cmp(&matrix.get(current, b)));
        let Some(next) = next else {
            break;
        };
        visited[next] = true;
        tour.push(next);
        current = next;
    }
    tour
}

/// Improve `tour` by segment reversals, keeping position 0 fixed.
///
/// Each candidate reversal is scored by the change in its two boundary edges,
/// so a sweep costs O(n²). Only strictly improving reversals are accepted, so
/// the result never costs more than the input.
pub fn two_opt(
    matrix: &DistanceMatrix,
    mut tour: Vec<usize>,
    return_to_origin: bool,
    options: &MultiStopOptions,
) -> Vec<usize> {
    let n = tour.len();
    if n < 3 {
        return tour;
    }
    let started = Instant::now();

    for pass in 0..options.max_two_opt_passes {
        let mut improved = false;
        for i in 1..n - 1 {
            for j in i + 1..n {
                if reversal_delta(matrix, &tour, i, j, return_to_origin) < -1e-9 {
                    tour[i..=j].reverse();
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
        if let Some(budget) = options.two_opt_budget_ms {
            if started.elapsed().as_millis() >= u128::from(budget) {
                tracing::debug!("2-opt budget exhausted after {} passes", pass + 1);
                break;
            }
        }
    }
    tour
}

/// Cost change from reversing `tour[i..=j]` with `i >= 1`.
fn reversal_delta(
    matrix: &DistanceMatrix,
    tour: &[usize],
    i: usize,
    j: usize,
    return_to_origin: bool,
) -> f64 {
    let (before, first, last) = (tour[i - 1], tour[i], tour[j]);
    let after = match tour.get(j + 1) {
        Some(&next) => Some(next),
        None if return_to_origin => Some(tour[0]),
        None => None,
    };
    let head = matrix.get(before, last) - matrix.get(before, first);
    match after {
        Some(after) => head + matrix.get(first, after) - matrix.get(last, after),
        None => head,
    }
}

/// Re-sort the visiting order by descending stop priority.
///
/// Ties are broken by ascending distance from the origin; stops without a
/// priority count as zero. Returns `None` when no stop declares a priority.
pub fn apply_priorities(matrix: &DistanceMatrix, stops: &[Stop], tour: &[usize]) -> Option<Vec<usize>> {
    if stops.iter().all(|stop| stop.priority.is_none()) {
        return None;
    }
    let priority = |index: usize| stops[index - 1].priority.unwrap_or(0);
    let mut visits: Vec<usize> = tour.iter().copied().filter(|&index| index != 0).collect();
    visits.sort_by(|&a, &b| {
        priority(b)
            .cmp(&priority(a))
            .then_with(|| matrix.get(0, a).total_cmp(&matrix.get(0, b)))
    });
    let mut ordered = Vec::with_capacity(tour.len());
    ordered.push(0);
    ordered.extend(visits);
    Some(ordered)
}

/// A visiting order with the matrix it was derived from.
#[derive(Debug, Clone, Serialize)]
pub struct StopPlan {
    /// Matrix indices starting with the origin (0)
    pub tour: Vec<usize>,
    pub matrix: DistanceMatrix,
    pub priority_applied: bool,
    /// Matrix cost of the order the caller supplied
    pub given_distance_nm: f64,
    /// Matrix cost of `tour`
    pub planned_distance_nm: f64,
}

impl StopPlan {
    /// Stop indices (into the request's `stops`) in visiting order.
    pub fn stop_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.tour.iter().filter(|&&index| index != 0).map(|&index| index - 1)
    }

    /// Endpoints of every leg, including the return leg when requested.
    pub fn leg_endpoints(&self, request: &MultiStopRequest) -> Vec<(GeoPoint, GeoPoint)> {
        let mut points: Vec<GeoPoint> = Vec::with_capacity(self.tour.len() + 1);
        points.push(request.origin.point());
        points.extend(self.stop_order().map(|index| request.stops[index].point()));
        if request.return_to_origin {
            points.push(request.origin.point());
        }
        points.windows(2).map(|w| (w[0], w[1])).collect()
    }
}

fn validate_request(request: &MultiStopRequest) -> Result<(), MultiStopError> {
    if request.stops.is_empty() {
        return Err(MultiStopError::NoStops);
    }
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(request.origin.id.as_str());
    for stop in &request.stops {
        if !seen.insert(stop.id.as_str()) {
            return Err(MultiStopError::DuplicateStop(stop.id.clone()));
        }
    }
    for stop in std::iter::once(&request.origin).chain(&request.stops) {
        let point = stop.point();
        if !point.is_valid() {
            return Err(RouteError::InvalidCoordinate {
                label: "stop",
                lat: point.lat,
                lon: point.lon,
            }
            .into());
        }
    }
    Ok(())
}

/// Decide the visiting order for a request.
pub fn plan_stop_order(
    engine: &RouteEngine,
    request: &MultiStopRequest,
    options: &MultiStopOptions,
) -> Result<StopPlan, MultiStopError> {
    validate_request(request)?;

    let points: Vec<GeoPoint> = std::iter::once(request.origin.point())
        .chain(request.stops.iter().map(Stop::point))
        .collect();
    let matrix = DistanceMatrix::from_points(engine, &points)?;
    let given: Vec<usize> = (0..points.len()).collect();
    let given_distance_nm = tour_distance(&matrix, &given, request.return_to_origin);

    // Refine both the greedy tour and the caller's order; keep the cheaper.
    let greedy = two_opt(
        &matrix,
        nearest_neighbor_tour(&matrix),
        request.return_to_origin,
        options,
    );
    let refined_given = two_opt(&matrix, given, request.return_to_origin, options);
    let mut tour = if tour_distance(&matrix, &greedy, request.return_to_origin)
        <= tour_distance(&matrix, &refined_given, request.return_to_origin)
    {
        greedy
    } else {
        refined_given
    };

    let priority_applied = match apply_priorities(&matrix, &request.stops, &tour) {
        Some(prioritized) => {
            tour = prioritized;
            true
        }
        None => false,
    };
    let planned_distance_nm = tour_distance(&matrix, &tour, request.return_to_origin);
    tracing::debug!(
        "Planned {} stops: {:.1} nm vs {:.1} nm as given",
        request.stops.len(),
        planned_distance_nm,
        given_distance_nm
    );

    Ok(StopPlan {
        tour,
        matrix,
        priority_applied,
        given_distance_nm,
        planned_distance_nm,
    })
}

/// Reduction relative to visiting the stops in the order given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Savings {
    pub distance_nm: f64,
    pub time_hrs: f64,
    pub fuel_l: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    OnTime,
    Early,
    Late,
    Unconstrained,
}

impl WindowStatus {
    pub fn classify(eta: Option<DateTime<Utc>>, stop: &Stop) -> Self {
        let Some(eta) = eta else {
            return WindowStatus::Unconstrained;
        };
        match (stop.time_window_start, stop.time_window_end) {
            (None, None) => WindowStatus::Unconstrained,
            (Some(start), _) if eta < start => WindowStatus::Early,
            (_, Some(end)) if eta > end => WindowStatus::Late,
            _ => WindowStatus::OnTime,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopArrival {
    pub stop_id: String,
    pub cumulative_distance_nm: f64,
    pub cumulative_time_hrs: f64,
    pub eta: Option<DateTime<Utc>>,
    pub window_status: WindowStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiStopResult {
    pub order: Vec<String>,
    pub vessel_type: String,
    pub total_distance_nm: f64,
    pub total_time_hrs: f64,
    pub total_fuel_l: f64,
    pub total_cost: f64,
    pub emissions: Emissions,
    pub legs: Vec<Route>,
    pub savings: Savings,
    pub arrivals: Vec<StopArrival>,
    pub priority_applied: bool,
}

fn hours(value: f64) -> Duration {
    Duration::milliseconds((value * 3_600_000.0).round() as i64)
}

/// Summarise priced legs for a plan. `legs` must follow [`StopPlan::leg_endpoints`].
pub fn assemble(request: &MultiStopRequest, plan: &StopPlan, legs: Vec<Route>) -> MultiStopResult {
    let vessel = VesselProfile::lookup(&request.vessel_type);

    let total_distance_nm = legs.iter().map(|leg| leg.total_distance_nm).sum();
    let total_time_hrs = legs.iter().map(|leg| leg.total_time_hrs).sum();
    let total_fuel_l = legs.iter().map(|leg| leg.total_fuel_l).sum();
    let total_cost = legs.iter().map(|leg| leg.total_cost).sum();
    let emissions = legs
        .iter()
        .fold(Emissions::default(), |acc, leg| acc + leg.emissions);

    let saved_nm = plan.given_distance_nm - plan.planned_distance_nm;
    let savings = Savings {
        distance_nm: saved_nm,
        time_hrs: saved_nm / vessel.cruising_speed_kn,
        fuel_l: saved_nm * vessel.fuel_consumption_l_per_nm,
        percent: if plan.given_distance_nm > 0.0 {
            saved_nm / plan.given_distance_nm * 100.0
        } else {
            0.0
        },
    };

    let mut arrivals = Vec::with_capacity(request.stops.len());
    let (mut distance_so_far, mut time_so_far) = (0.0, 0.0);
    for (stop_index, leg) in plan.stop_order().zip(&legs) {
        distance_so_far += leg.total_distance_nm;
        time_so_far += leg.total_time_hrs;
        let stop = &request.stops[stop_index];
        let eta = request.departure.map(|departure| departure + hours(time_so_far));
        arrivals.push(StopArrival {
            stop_id: stop.id.clone(),
            cumulative_distance_nm: distance_so_far,
            cumulative_time_hrs: time_so_far,
            eta,
            window_status: WindowStatus::classify(eta, stop),
        });
    }

    MultiStopResult {
        order: plan
            .stop_order()
            .map(|index| request.stops[index].id.clone())
            .collect(),
        vessel_type: vessel.vessel_type.to_string(),
        total_distance_nm,
        total_time_hrs,
        total_fuel_l,
        total_cost,
        emissions,
        legs,
        savings,
        arrivals,
        priority_applied: plan.priority_applied,
    }
}

/// Plan and price a multi-stop voyage without external providers.
pub fn optimize_multi_stop(
    engine: &RouteEngine,
    request: &MultiStopRequest,
    options: &MultiStopOptions,
) -> Result<MultiStopResult, MultiStopError> {
    let plan = plan_stop_order(engine, request, options)?;
    let vessel = VesselProfile::lookup(&request.vessel_type);
    let legs = plan
        .leg_endpoints(request)
        .into_iter()
        .map(|(from, to)| {
            engine
                .compute_route(from, to)
                .map(|sea| build_route(&sea, vessel, |_| None))
        })
        .collect::<Result<Vec<Route>, RouteError>>()?;
    Ok(assemble(request, &plan, legs))
}
