//! Ingestion boundary: raw feed JSON → strongly-typed records.
//!
//! All string-to-number coercion and validation happens here, so the
//! analysis core only ever sees well-formed values. Malformed records are
//! dropped and counted, never fatal; a run completes with a smaller result
//! set instead of halting on one bad record.
//!
//! Input shapes follow the upstream Warsaw open-data feed: ping partition
//! files (one JSON array per sampling window, optionally wrapped in a
//! `{"result": [...]}` envelope), a timetable file keyed by stop and line,
//! and a stop coordinates file with string-typed coordinates.

use crate::config::{GeoBounds, PING_TIME_FORMAT, TIMETABLE_TIME_FORMAT};
use crate::model::{Departure, Ping, Stop, StopTimetable};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct RawPing {
    #[serde(rename = "Lines")]
    lines: String,
    #[serde(rename = "Lon")]
    lon: f64,
    #[serde(rename = "Lat")]
    lat: f64,
    #[serde(rename = "Brigade")]
    brigade: String,
    #[serde(rename = "Time")]
    time: String,
}

/// Ping partitions come either as a bare array or wrapped in the API's
/// `result` envelope; both are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum PingFile {
    Wrapped { result: Vec<RawPing> },
    Bare(Vec<RawPing>),
}

impl PingFile {
    fn into_records(self) -> Vec<RawPing> {
        match self {
            PingFile::Wrapped { result } => result,
            PingFile::Bare(records) => records,
        }
    }
}

#[derive(Deserialize)]
struct RawDeparture {
    #[serde(rename = "czas")]
    time: String,
    #[serde(rename = "brygada")]
    brigade: String,
}

#[derive(Deserialize)]
struct RawStopTimetable {
    #[serde(rename = "busstopId")]
    busstop_id: String,
    #[serde(rename = "busstopNr")]
    busstop_nr: String,
    #[serde(rename = "rozklad")]
    timetable: HashMap<String, Vec<RawDeparture>>,
}

#[derive(Deserialize)]
struct RawStop {
    #[serde(rename = "zespol")]
    complex: String,
    #[serde(rename = "slupek")]
    pole: String,
    #[serde(rename = "szer_geo")]
    lat: String,
    #[serde(rename = "dlug_geo")]
    lon: String,
}

/// Per-reason reject counters for one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub files: usize,
    pub accepted: usize,
    pub bad_time: usize,
    pub out_of_bounds: usize,
    pub bad_line: usize,
    pub bad_brigade: usize,
}

impl IngestStats {
    pub fn rejected(&self) -> usize {
        self.bad_time + self.out_of_bounds + self.bad_line + self.bad_brigade
    }
}

fn validate_ping(raw: &RawPing, bounds: &GeoBounds, stats: &mut IngestStats) -> Option<Ping> {
    let Ok(time) = NaiveDateTime::parse_from_str(&raw.time, PING_TIME_FORMAT) else {
        stats.bad_time += 1;
        return None;
    };
    if !bounds.contains(raw.lat, raw.lon) {
        stats.out_of_bounds += 1;
        return None;
    }
    // Tram lines and night buses carry non-numeric identifiers; this
    // analysis covers numbered bus lines only.
    let Ok(line) = raw.lines.parse::<u32>() else {
        stats.bad_line += 1;
        return None;
    };
    let Ok(brigade) = raw.brigade.parse::<u32>() else {
        stats.bad_brigade += 1;
        return None;
    };
    stats.accepted += 1;
    Some(Ping {
        line,
        brigade,
        time,
        lat: raw.lat,
        lon: raw.lon,
    })
}

/// Loads and concatenates every `.json` ping partition in `dir`.
///
/// Unreadable or unparseable files are skipped with a warning; an empty or
/// all-invalid source simply yields an empty collection, leaving the run to
/// report empty result tables.
pub fn load_pings(dir: &str, bounds: &GeoBounds) -> Result<(Vec<Ping>, IngestStats)> {
    let mut pings = Vec::new();
    let mut stats = IngestStats::default();

    for entry in fs::read_dir(dir).with_context(|| format!("reading ping directory {dir}"))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable ping partition");
                continue;
            }
        };
        let file: PingFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed ping partition");
                continue;
            }
        };

        stats.files += 1;
        for raw in file.into_records() {
            if let Some(ping) = validate_ping(&raw, bounds, &mut stats) {
                pings.push(ping);
            }
        }
    }

    debug!(?stats, "Ping ingestion finished");
    Ok((pings, stats))
}

/// Loads the stop coordinates file into a `(complex, pole)` lookup.
/// Stops with unparseable coordinates are dropped with a warning.
pub fn load_stops(path: &str) -> Result<HashMap<(String, String), Stop>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading stops file {path}"))?;
    let raw: Vec<RawStop> = serde_json::from_str(&content)?;

    let mut stops = HashMap::new();
    for r in raw {
        let (Ok(lat), Ok(lon)) = (r.lat.parse::<f64>(), r.lon.parse::<f64>()) else {
            warn!(complex = %r.complex, pole = %r.pole, "Stop has non-numeric coordinates, dropped");
            continue;
        };
        stops.insert(
            (r.complex.clone(), r.pole.clone()),
            Stop {
                complex: r.complex,
                pole: r.pole,
                lat,
                lon,
            },
        );
    }
    Ok(stops)
}

/// Loads stop timetables and joins them with the coordinate lookup.
///
/// Departures with non-numeric brigades or unparseable times are dropped;
/// stops without known coordinates are skipped entirely (there is nothing to
/// match against). `hours`, when given, keeps only departures whose
/// scheduled hour is in the set — the original pipeline sampled pings in
/// fixed one-hour windows and trimmed timetables to match.
pub fn load_timetables(
    path: &str,
    stops: &HashMap<(String, String), Stop>,
    hours: Option<&[u32]>,
) -> Result<Vec<StopTimetable>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading timetable file {path}"))?;
    let raw: Vec<RawStopTimetable> = serde_json::from_str(&content)?;

    let mut timetables = Vec::new();
    for r in raw {
        let key = (r.busstop_id.clone(), r.busstop_nr.clone());
        let Some(stop) = stops.get(&key) else {
            debug!(complex = %r.busstop_id, pole = %r.busstop_nr, "Timetable stop has no coordinates, skipped");
            continue;
        };

        let mut departures: Vec<(u32, Vec<Departure>)> = Vec::new();
        for (line_str, raw_departures) in r.timetable {
            let Ok(line) = line_str.parse::<u32>() else {
                debug!(line = %line_str, "Non-numeric line in timetable, skipped");
                continue;
            };

            let mut parsed = Vec::new();
            for d in raw_departures {
                let Ok(time) = NaiveTime::parse_from_str(&d.time, TIMETABLE_TIME_FORMAT) else {
                    debug!(time = %d.time, "Unparseable departure time, dropped");
                    continue;
                };
                let Ok(brigade) = d.brigade.parse::<u32>() else {
                    continue;
                };
                if let Some(hours) = hours {
                    if !hours.contains(&time.hour()) {
                        continue;
                    }
                }
                parsed.push(Departure { time, brigade });
            }
            if !parsed.is_empty() {
                departures.push((line, parsed));
            }
        }
        departures.sort_by_key(|(line, _)| *line);

        if !departures.is_empty() {
            timetables.push(StopTimetable {
                stop: stop.clone(),
                departures,
            });
        }
    }

    Ok(timetables)
}
