//! Spherical geometry for sea route distances, bearings and interpolation.

use crate::models::GeoPoint;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3_440.065;

/// Calculate great-circle distance between two points in nautical miles.
///
/// Standard haversine formula. Symmetric in its arguments and exactly zero
/// for identical points. Non-finite input propagates as NaN.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two points in nautical miles.
pub fn distance_nm(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_nm(a.lat, a.lon, b.lat, b.lon)
}

/// Initial great-circle bearing from `a` to `b` in degrees, normalized to [0, 360).
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalize_deg(x.atan2(y).to_degrees())
}

/// Wrap an angle in degrees into [0, 360).
pub fn normalize_deg(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Point at `fraction` of the way from `a` to `b` along the great circle.
pub fn interpolate_great_circle(a: GeoPoint, b: GeoPoint, fraction: f64) -> GeoPoint {
    let phi1 = a.lat.to_radians();
    let lambda1 = a.lon.to_radians();
    let phi2 = b.lat.to_radians();
    let lambda2 = b.lon.to_radians();

    let delta = distance_nm(a, b) / EARTH_RADIUS_NM;
    if delta.abs() < 1e-12 {
        return a;
    }

    let sin_delta = delta.sin();
    let wa = ((1.0 - fraction) * delta).sin() / sin_delta;
    let wb = (fraction * delta).sin() / sin_delta;

    let x = wa * phi1.cos() * lambda1.cos() + wb * phi2.cos() * lambda2.cos();
    let y = wa * phi1.cos() * lambda1.sin() + wb * phi2.cos() * lambda2.sin();
    let z = wa * phi1.sin() + wb * phi2.sin();

    GeoPoint::new(
        z.atan2((x * x + y * y).sqrt()).to_degrees(),
        y.atan2(x).to_degrees(),
    )
}

/// Point at `fraction` of the way from `a` to `b` in plain lat/lon space.
pub fn interpolate_linear(a: GeoPoint, b: GeoPoint, fraction: f64) -> GeoPoint {
    GeoPoint::new(
        a.lat + (b.lat - a.lat) * fraction,
        a.lon + (b.lon - a.lon) * fraction,
    )
}

/// Sum of consecutive great-circle legs.
pub fn path_distance_nm(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_nm(pair[0], pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_sixty_miles() {
        let dist = haversine_nm(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 60.04).abs() < 0.1, "got {dist}");
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = GeoPoint::new(25.27, 55.30);
        let b = GeoPoint::new(26.55, 56.45);
        assert_eq!(distance_nm(a, b), distance_nm(b, a));
        assert_eq!(distance_nm(a, a), 0.0);
    }

    #[test]
    fn distance_respects_triangle_inequality() {
        let a = GeoPoint::new(24.55, 54.38);
        let b = GeoPoint::new(25.35, 51.75);
        let c = GeoPoint::new(26.65, 50.30);
        assert!(distance_nm(a, c) <= distance_nm(a, b) + distance_nm(b, c) + 1e-9);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!((bearing_deg(origin, GeoPoint::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(origin, GeoPoint::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(origin, GeoPoint::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(origin, GeoPoint::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn great_circle_midpoint_splits_distance() {
        let a = GeoPoint::new(24.95, 52.95);
        let b = GeoPoint::new(26.40, 53.50);
        let mid = interpolate_great_circle(a, b, 0.5);
        let half = distance_nm(a, b) / 2.0;
        assert!((distance_nm(a, mid) - half).abs() < 1e-6);
        assert!((distance_nm(mid, b) - half).abs() < 1e-6);
    }
}
