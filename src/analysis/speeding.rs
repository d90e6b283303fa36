//! Detection of inter-ping segments with suspicious implied speed.

use crate::analysis::trajectory::{Trajectory, TrajectoryMap};
use crate::config::SpeedBand;
use crate::geo::distance_km;
use crate::model::VehicleKey;
use serde::Serialize;

/// A segment between two consecutive pings whose implied speed fell in the
/// flagged band. The coordinate is the arithmetic midpoint of the two
/// pings, a planar approximation that is fine at this granularity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpeedingSegment {
    pub line: u32,
    pub brigade: u32,
    pub midpoint_lat: f64,
    pub midpoint_lon: f64,
    pub speed_kmh: f64,
}

/// Implied speed of a segment in km/h. A zero (or negative) time delta is
/// defined as zero speed, not infinity and not an error.
pub fn segment_speed_kmh(distance_km: f64, dt_hours: f64) -> f64 {
    if dt_hours > 0.0 {
        distance_km / dt_hours
    } else {
        0.0
    }
}

/// Scans one trajectory for segments whose implied speed lies strictly
/// inside `band`. Fewer than 2 pings yields an empty list; segments with
/// undefined distance are skipped.
pub fn detect_speeding(
    key: &VehicleKey,
    trajectory: &Trajectory,
    band: &SpeedBand,
) -> Vec<SpeedingSegment> {
    let mut segments = Vec::new();

    for (prev, curr) in trajectory.segments() {
        let Some(dist) = distance_km(prev.lat, prev.lon, curr.lat, curr.lon) else {
            continue;
        };
        let dt_hours = (curr.time - prev.time).num_seconds() as f64 / 3600.0;
        let speed = segment_speed_kmh(dist, dt_hours);

        if band.contains_exclusive(speed) {
            segments.push(SpeedingSegment {
                line: key.line,
                brigade: key.brigade,
                midpoint_lat: (prev.lat + curr.lat) / 2.0,
                midpoint_lon: (prev.lon + curr.lon) / 2.0,
                speed_kmh: speed,
            });
        }
    }

    segments
}

/// Flattens per-trajectory detections across the whole trajectory table,
/// sorted by vehicle key for deterministic output.
pub fn detect_all_speeding(trajectories: &TrajectoryMap, band: &SpeedBand) -> Vec<SpeedingSegment> {
    let mut all: Vec<SpeedingSegment> = trajectories
        .iter()
        .flat_map(|(key, trajectory)| detect_speeding(key, trajectory, band))
        .collect();
    all.sort_by(|a, b| {
        (a.line, a.brigade)
            .cmp(&(b.line, b.brigade))
            .then(a.speed_kmh.total_cmp(&b.speed_kmh))
    });
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trajectory::build_trajectories;
    use crate::model::Ping;
    use chrono::NaiveDateTime;

    fn ping(time: &str, lat: f64, lon: f64) -> Ping {
        Ping {
            line: 213,
            brigade: 4,
            time: NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").unwrap(),
            lat,
            lon,
        }
    }

    fn band() -> SpeedBand {
        SpeedBand {
            min_kmh: 50.0,
            max_kmh: 85.0,
        }
    }

    #[test]
    fn test_band_is_open() {
        assert!(!band().contains_exclusive(50.0));
        assert!(!band().contains_exclusive(85.0));
        assert!(band().contains_exclusive(60.0));
        assert!(band().contains_exclusive(50.001));
    }

    #[test]
    fn test_zero_time_delta_is_zero_speed() {
        assert_eq!(segment_speed_kmh(1.5, 0.0), 0.0);
        assert_eq!(segment_speed_kmh(1.5, -0.1), 0.0);
        assert_eq!(segment_speed_kmh(30.0, 0.5), 60.0);
    }

    #[test]
    fn test_flags_segment_inside_band() {
        // ~1.1 km in 60 s is ~67 km/h, inside (50, 85)
        let map = build_trajectories(vec![
            ping("2024-02-05 08:00:00", 52.2000, 21.0),
            ping("2024-02-05 08:01:00", 52.2100, 21.0),
        ]);
        let key = VehicleKey {
            line: 213,
            brigade: 4,
        };
        let segments = detect_speeding(&key, &map[&key], &band());
        assert_eq!(segments.len(), 1);
        assert!(segments[0].speed_kmh > 50.0 && segments[0].speed_kmh < 85.0);
        assert!((segments[0].midpoint_lat - 52.2050).abs() < 1e-9);
        assert!((segments[0].midpoint_lon - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_slow_segment_not_flagged() {
        // ~1.1 km in 5 minutes is ~13 km/h
        let map = build_trajectories(vec![
            ping("2024-02-05 08:00:00", 52.2000, 21.0),
            ping("2024-02-05 08:05:00", 52.2100, 21.0),
        ]);
        let key = VehicleKey {
            line: 213,
            brigade: 4,
        };
        assert!(detect_speeding(&key, &map[&key], &band()).is_empty());
    }

    #[test]
    fn test_short_trajectory_yields_no_segments() {
        let map = build_trajectories(vec![ping("2024-02-05 08:00:00", 52.2000, 21.0)]);
        let key = VehicleKey {
            line: 213,
            brigade: 4,
        };
        assert!(detect_speeding(&key, &map[&key], &band()).is_empty());
    }

    #[test]
    fn test_detect_all_flattens_across_vehicles() {
        let mut pings = vec![
            ping("2024-02-05 08:00:00", 52.2000, 21.0),
            ping("2024-02-05 08:01:00", 52.2100, 21.0),
        ];
        pings.push(Ping {
            line: 180,
            ..ping("2024-02-05 08:00:00", 52.2000, 21.0)
        });
        pings.push(Ping {
            line: 180,
            ..ping("2024-02-05 08:01:00", 52.2100, 21.0)
        });

        let map = build_trajectories(pings);
        let all = detect_all_speeding(&map, &band());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].line, 180);
        assert_eq!(all[1].line, 213);
    }
}
