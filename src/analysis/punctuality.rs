//! Matching observed arrivals against the published timetable.

use crate::analysis::trajectory::TrajectoryLookup;
use crate::config::PunctualityConfig;
use crate::geo::distance_m;
use crate::model::{StopTimetable, VehicleKey};
use serde::Serialize;
use tracing::trace;

/// One matched arrival: the best delay found for a single timetable entry.
/// Entries with no observable GPS evidence produce nothing at all, never a
/// zero-filled row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PunctualityObservation {
    pub stop_id: String,
    pub line: u32,
    pub brigade: u32,
    pub delay_minutes: f64,
}

/// Minutes from `arrival` to `scheduled`, on a common reference date so
/// only time-of-day matters. Positive when the vehicle was at the stop
/// before the scheduled time.
fn diff_minutes(scheduled: chrono::NaiveTime, arrival: chrono::NaiveTime) -> f64 {
    scheduled.signed_duration_since(arrival).num_seconds() as f64 / 60.0
}

/// Estimates the delay of every scheduled departure at one stop.
///
/// For each timetable entry the candidate vehicle's trajectory is scanned
/// in time order; pings within the proximity radius of the stop are arrival
/// events, and the smallest delay in `[0, max_delay_minutes]` wins (ties go
/// to the earliest ping). Scanning stops early once the best candidate is
/// below `early_exit_minutes`: a near-on-time match is accepted as-is
/// instead of exhaustively searching for a smaller one. That heuristic
/// bounds the scan cost but can keep a slightly larger delay than a later
/// ping would have produced, so it is part of the output contract, not an
/// optimization to remove.
///
/// A missing or empty trajectory, like a trajectory that never comes near
/// the stop, just produces no observation for that entry.
pub fn match_stop(
    timetable: &StopTimetable,
    trajectories: &impl TrajectoryLookup,
    config: &PunctualityConfig,
) -> Vec<PunctualityObservation> {
    let stop = &timetable.stop;
    let stop_id = stop.id();
    let mut observations = Vec::new();

    for (line, departures) in &timetable.departures {
        for departure in departures {
            let key = VehicleKey {
                line: *line,
                brigade: departure.brigade,
            };
            let Some(trajectory) = trajectories.trajectory(&key) else {
                continue;
            };

            let mut best: Option<f64> = None;
            for ping in &trajectory.pings {
                let Some(dist) = distance_m(ping.lat, ping.lon, stop.lat, stop.lon) else {
                    continue;
                };
                if dist >= config.proximity_radius_m {
                    continue;
                }

                let diff = diff_minutes(departure.time, ping.time.time());
                // Negative or implausibly large gaps are mismatched runs,
                // not real lateness.
                if diff < 0.0 || diff > config.max_delay_minutes {
                    continue;
                }

                if best.is_none_or(|b| diff < b) {
                    best = Some(diff);
                }
                if best.is_some_and(|b| b < config.early_exit_minutes) {
                    break;
                }
            }

            if let Some(delay) = best {
                trace!(stop = %stop_id, line, brigade = departure.brigade, delay, "Arrival matched");
                observations.push(PunctualityObservation {
                    stop_id: stop_id.clone(),
                    line: *line,
                    brigade: departure.brigade,
                    delay_minutes: delay,
                });
            }
        }
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trajectory::{TrajectoryMap, build_trajectories};
    use crate::model::{Departure, Ping, Stop};
    use chrono::{NaiveDateTime, NaiveTime};

    const STOP_LAT: f64 = 52.2200;
    const STOP_LON: f64 = 21.0000;

    fn config() -> PunctualityConfig {
        PunctualityConfig::default()
    }

    fn stop() -> Stop {
        Stop {
            complex: "7009".to_string(),
            pole: "01".to_string(),
            lat: STOP_LAT,
            lon: STOP_LON,
        }
    }

    fn ping_at(time: &str, lat: f64, lon: f64) -> Ping {
        Ping {
            line: 213,
            brigade: 4,
            time: NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").unwrap(),
            lat,
            lon,
        }
    }

    /// A ping roughly 50 m north of the stop.
    fn near_ping(time: &str) -> Ping {
        ping_at(time, STOP_LAT + 0.00045, STOP_LON)
    }

    fn timetable_at(scheduled: &str) -> StopTimetable {
        StopTimetable {
            stop: stop(),
            departures: vec![(
                213,
                vec![Departure {
                    time: NaiveTime::parse_from_str(scheduled, "%H:%M:%S").unwrap(),
                    brigade: 4,
                }],
            )],
        }
    }

    fn run(timetable: &StopTimetable, pings: Vec<Ping>) -> Vec<PunctualityObservation> {
        let map = build_trajectories(pings);
        match_stop(timetable, &map, &config())
    }

    #[test]
    fn test_nearby_ping_yields_expected_delay() {
        // 50 m from the stop at 07:57:30 against an 08:00:00 schedule
        let obs = run(
            &timetable_at("08:00:00"),
            vec![near_ping("2024-02-05 07:57:30")],
        );
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].stop_id, "7009/01");
        assert_eq!(obs[0].delay_minutes, 2.5);
    }

    #[test]
    fn test_distant_ping_yields_no_observation() {
        // ~150 m away: outside the proximity radius
        let obs = run(
            &timetable_at("08:00:00"),
            vec![ping_at("2024-02-05 07:57:30", STOP_LAT + 0.00135, STOP_LON)],
        );
        assert!(obs.is_empty());
    }

    #[test]
    fn test_early_exit_keeps_first_near_on_time_candidate() {
        // Candidates in scan order: 4.0 then 2.0 minutes. The first one is
        // already below the early-exit threshold, so 2.0 is never seen.
        let obs = run(
            &timetable_at("08:00:00"),
            vec![
                near_ping("2024-02-05 07:56:00"),
                near_ping("2024-02-05 07:58:00"),
            ],
        );
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].delay_minutes, 4.0);
    }

    #[test]
    fn test_minimum_candidate_wins_above_early_exit() {
        // 170 and 20 minutes: both valid, neither below 5, minimum wins
        let obs = run(
            &timetable_at("08:00:00"),
            vec![
                near_ping("2024-02-05 05:10:00"),
                near_ping("2024-02-05 07:40:00"),
            ],
        );
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].delay_minutes, 20.0);
    }

    #[test]
    fn test_delay_range_boundaries() {
        // 181 minutes: rejected
        let obs = run(
            &timetable_at("08:00:00"),
            vec![near_ping("2024-02-05 04:59:00")],
        );
        assert!(obs.is_empty());

        // 180 minutes exactly: accepted
        let obs = run(
            &timetable_at("08:00:00"),
            vec![near_ping("2024-02-05 05:00:00")],
        );
        assert_eq!(obs[0].delay_minutes, 180.0);

        // -0.5 minutes (arrival after the schedule): rejected
        let obs = run(
            &timetable_at("08:00:00"),
            vec![near_ping("2024-02-05 08:00:30")],
        );
        assert!(obs.is_empty());

        // 0 minutes exactly: accepted
        let obs = run(
            &timetable_at("08:00:00"),
            vec![near_ping("2024-02-05 08:00:00")],
        );
        assert_eq!(obs[0].delay_minutes, 0.0);
    }

    #[test]
    fn test_missing_trajectory_is_no_match() {
        let empty: TrajectoryMap = TrajectoryMap::new();
        let obs = match_stop(&timetable_at("08:00:00"), &empty, &config());
        assert!(obs.is_empty());
    }

    #[test]
    fn test_each_entry_matched_independently() {
        let timetable = StopTimetable {
            stop: stop(),
            departures: vec![(
                213,
                vec![
                    Departure {
                        time: NaiveTime::parse_from_str("08:00:00", "%H:%M:%S").unwrap(),
                        brigade: 4,
                    },
                    Departure {
                        time: NaiveTime::parse_from_str("08:30:00", "%H:%M:%S").unwrap(),
                        brigade: 7,
                    },
                ],
            )],
        };
        // Only brigade 4 has GPS evidence
        let obs = run(&timetable, vec![near_ping("2024-02-05 07:57:30")]);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].brigade, 4);
    }
}
