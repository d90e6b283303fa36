//! Core value types shared across the analysis pipeline.
//!
//! Everything here is immutable once constructed; ingestion is the only
//! place that builds these from raw feed records.

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Composite identity of one vehicle run: the line it serves plus the
/// brigade distinguishing vehicles on the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VehicleKey {
    pub line: u32,
    pub brigade: u32,
}

/// A single timestamped GPS position report for one vehicle.
///
/// Coordinates are validated against the configured bounding box and the
/// identifiers are already numeric by the time a `Ping` exists; the core
/// never re-validates.
#[derive(Debug, Clone, PartialEq)]
pub struct Ping {
    pub line: u32,
    pub brigade: u32,
    pub time: NaiveDateTime,
    pub lat: f64,
    pub lon: f64,
}

impl Ping {
    pub fn key(&self) -> VehicleKey {
        VehicleKey {
            line: self.line,
            brigade: self.brigade,
        }
    }
}

/// A physical bus stop pole. Warsaw stops are identified by a complex id
/// plus a pole number within the complex, e.g. `7009/01`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub complex: String,
    pub pole: String,
    pub lat: f64,
    pub lon: f64,
}

impl Stop {
    /// Canonical stop identifier used in summaries, `complex/pole`.
    pub fn id(&self) -> String {
        format!("{}/{}", self.complex, self.pole)
    }
}

/// One scheduled departure of a brigade from a stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Departure {
    pub time: NaiveTime,
    pub brigade: u32,
}

/// The timetable of a single stop: for each line serving it, the scheduled
/// departures inside the analysis window.
#[derive(Debug, Clone)]
pub struct StopTimetable {
    pub stop: Stop,
    pub departures: Vec<(u32, Vec<Departure>)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_key() {
        let ping = Ping {
            line: 213,
            brigade: 4,
            time: NaiveDateTime::parse_from_str("2024-02-05 08:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            lat: 52.22,
            lon: 21.0,
        };
        assert_eq!(
            ping.key(),
            VehicleKey {
                line: 213,
                brigade: 4
            }
        );
    }

    #[test]
    fn test_stop_id_format() {
        let stop = Stop {
            complex: "7009".to_string(),
            pole: "01".to_string(),
            lat: 52.22,
            lon: 21.0,
        };
        assert_eq!(stop.id(), "7009/01");
    }
}
