//! Trip-level kinematics: duration, distance, average speed.

use crate::analysis::trajectory::{Trajectory, TrajectoryMap};
use crate::config::SpeedBand;
use crate::geo::distance_km;
use crate::model::VehicleKey;
use serde::Serialize;

/// Derived kinematics for one vehicle trajectory.
///
/// `avg_speed_kmh` is `None` when the trip duration is zero; the value is
/// undefined, not zero, and such rows never survive the plausibility filter.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TripMetrics {
    pub line: u32,
    pub brigade: u32,
    pub duration_hours: f64,
    pub total_distance_km: f64,
    pub avg_speed_kmh: Option<f64>,
}

/// Trip duration in hours: last minus first timestamp of the (sorted)
/// trajectory. A single-ping trajectory has duration 0.
pub fn trip_duration_hours(trajectory: &Trajectory) -> f64 {
    match (trajectory.pings.first(), trajectory.pings.last()) {
        (Some(first), Some(last)) => {
            (last.time - first.time).num_seconds() as f64 / 3600.0
        }
        _ => 0.0,
    }
}

/// Sum of geodesic distances over consecutive ping pairs. Fewer than 2
/// pings yields 0; segments with undefined distance are skipped.
pub fn total_distance_km(trajectory: &Trajectory) -> f64 {
    trajectory
        .segments()
        .filter_map(|(prev, curr)| distance_km(prev.lat, prev.lon, curr.lat, curr.lon))
        .sum()
}

/// `distance / duration`, undefined when the duration is zero.
pub fn avg_speed_kmh(total_distance_km: f64, duration_hours: f64) -> Option<f64> {
    if duration_hours > 0.0 {
        Some(total_distance_km / duration_hours)
    } else {
        None
    }
}

fn metrics_for(key: &VehicleKey, trajectory: &Trajectory) -> TripMetrics {
    let duration_hours = trip_duration_hours(trajectory);
    let total_distance_km = total_distance_km(trajectory);
    TripMetrics {
        line: key.line,
        brigade: key.brigade,
        duration_hours,
        total_distance_km,
        avg_speed_kmh: avg_speed_kmh(total_distance_km, duration_hours),
    }
}

/// True when the row survives the plausibility filter: average speed is
/// defined and inside the band, boundaries included. GPS noise and very
/// short or long sampling windows produce non-physical averages; the band
/// encodes a plausible urban bus speed.
pub fn is_plausible(metrics: &TripMetrics, band: &SpeedBand) -> bool {
    metrics
        .avg_speed_kmh
        .is_some_and(|v| band.contains_inclusive(v))
}

/// Computes metrics for every trajectory and applies the plausibility
/// filter. Rows are sorted by vehicle key for deterministic output.
pub fn compute_trip_metrics(trajectories: &TrajectoryMap, band: &SpeedBand) -> Vec<TripMetrics> {
    let mut rows: Vec<TripMetrics> = trajectories
        .iter()
        .map(|(key, trajectory)| metrics_for(key, trajectory))
        .filter(|m| is_plausible(m, band))
        .collect();
    rows.sort_by_key(|m| (m.line, m.brigade));
    rows
}
