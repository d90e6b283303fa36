//! Analysis configuration.
//!
//! Every empirically tuned threshold (geographic bounding box, speed bands,
//! punctuality matching constants) lives here so it can be revisited per
//! city/dataset without touching the analytics code. Defaults encode the
//! Warsaw bus network the tool was originally tuned against.

use anyhow::Result;
use serde::Deserialize;

/// Timestamp format of raw position pings, e.g. `2024-02-05 17:30:21`.
pub const PING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Time-of-day format of timetable departures, e.g. `17:30:00`.
pub const TIMETABLE_TIME_FORMAT: &str = "%H:%M:%S";

/// Geographic bounding box; pings outside it are rejected at ingestion.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl GeoBounds {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        // Warsaw city limits, matching the upstream data feed.
        GeoBounds {
            lat_min: 52.1,
            lat_max: 52.3,
            lon_min: 20.8,
            lon_max: 21.3,
        }
    }
}

/// A speed range in km/h. Whether the endpoints count is up to the call site:
/// the plausibility filter includes them, the speeding band excludes them.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpeedBand {
    pub min_kmh: f64,
    pub max_kmh: f64,
}

impl SpeedBand {
    /// `min <= v <= max`.
    pub fn contains_inclusive(&self, v: f64) -> bool {
        v >= self.min_kmh && v <= self.max_kmh
    }

    /// `min < v < max`.
    pub fn contains_exclusive(&self, v: f64) -> bool {
        v > self.min_kmh && v < self.max_kmh
    }
}

/// Thresholds of the punctuality matcher.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PunctualityConfig {
    /// A ping closer than this (strict) to a stop counts as an arrival event.
    pub proximity_radius_m: f64,
    /// Candidate delays above this are treated as mismatched runs, not
    /// lateness. The boundary value itself is still accepted.
    pub max_delay_minutes: f64,
    /// Once the best candidate drops below this, scanning stops; a
    /// near-on-time match is accepted without searching for a smaller one.
    pub early_exit_minutes: f64,
}

impl Default for PunctualityConfig {
    fn default() -> Self {
        PunctualityConfig {
            proximity_radius_m: 100.0,
            max_delay_minutes: 180.0,
            early_exit_minutes: 5.0,
        }
    }
}

/// Complete configuration for one analysis run.
///
/// Stored as plain JSON on disk:
/// ```json
/// {
///   "bounds": { "lat_min": 52.1, "lat_max": 52.3, "lon_min": 20.8, "lon_max": 21.3 },
///   "plausible_speed": { "min_kmh": 30.0, "max_kmh": 80.0 },
///   "speeding": { "min_kmh": 50.0, "max_kmh": 85.0 },
///   "punctuality": { "proximity_radius_m": 100.0, "max_delay_minutes": 180.0, "early_exit_minutes": 5.0 }
/// }
/// ```
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub bounds: GeoBounds,
    /// Trips whose average speed falls outside this band (inclusive) are
    /// discarded as sensor/sampling artifacts.
    pub plausible_speed: SpeedBand,
    /// Segments whose implied speed falls strictly inside this band are
    /// flagged. Deliberately independent of `plausible_speed`.
    pub speeding: SpeedBand,
    pub punctuality: PunctualityConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            bounds: GeoBounds::default(),
            plausible_speed: SpeedBand {
                min_kmh: 30.0,
                max_kmh: 80.0,
            },
            speeding: SpeedBand {
                min_kmh: 50.0,
                max_kmh: 85.0,
            },
            punctuality: PunctualityConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
