//! Geodesic distance between lat/lon points.
//!
//! Uses the ellipsoidal geodesic metric rather than haversine: over
//! city-scale distances the difference is small but the proximity threshold
//! of the punctuality matcher sits right where it can matter.

use geo::{Distance, Geodesic, Point};

/// Geodesic distance in meters, or `None` if any coordinate is not finite.
///
/// Callers treat `None` as an undefined segment and skip it rather than
/// propagating an error.
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    if !(lat1.is_finite() && lon1.is_finite() && lat2.is_finite() && lon2.is_finite()) {
        return None;
    }
    // geo points are (x, y) = (lon, lat)
    let a = Point::new(lon1, lat1);
    let b = Point::new(lon2, lat2);
    Some(Geodesic::distance(a, b))
}

/// Geodesic distance in kilometers. See [`distance_m`].
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
    distance_m(lat1, lon1, lat2, lon2).map(|m| m / 1000.0)
}
