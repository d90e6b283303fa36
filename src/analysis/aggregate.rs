//! Rolling per-entry delay observations into summary statistics.
//!
//! A pure fold: nothing is filtered here beyond what upstream already
//! excluded, and missing observations are never imputed as zero.

use crate::analysis::punctuality::PunctualityObservation;
use crate::analysis::utility::{mean, stddev};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-stop punctuality summary. `avg_delay_minutes` is `None` when no
/// observation was recorded for the stop — serialized as an empty field,
/// explicitly distinct from a numeric zero.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopPunctualitySummary {
    pub stop_id: String,
    pub avg_delay_minutes: Option<f64>,
    pub stddev_delay_minutes: Option<f64>,
    pub observation_count: usize,
}

/// Per-line punctuality summary across all stops.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LinePunctualitySummary {
    pub line: u32,
    pub avg_delay_minutes: Option<f64>,
    pub stddev_delay_minutes: Option<f64>,
    pub observation_count: usize,
}

/// Summarizes the observations of a single stop. An empty slice is valid
/// and yields the "no data" sentinel row.
pub fn summarize_stop(stop_id: &str, observations: &[PunctualityObservation]) -> StopPunctualitySummary {
    let delays: Vec<f64> = observations.iter().map(|o| o.delay_minutes).collect();
    let avg = mean(&delays);
    StopPunctualitySummary {
        stop_id: stop_id.to_string(),
        avg_delay_minutes: avg,
        stddev_delay_minutes: avg.and_then(|m| stddev(&delays, m)),
        observation_count: delays.len(),
    }
}

/// Groups all observations by line and summarizes each group. Lines with no
/// observations never appear here; absence already says "no data".
pub fn summarize_lines(observations: &[PunctualityObservation]) -> Vec<LinePunctualitySummary> {
    let mut by_line: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        by_line.entry(obs.line).or_default().push(obs.delay_minutes);
    }

    by_line
        .into_iter()
        .map(|(line, delays)| {
            let avg = mean(&delays);
            LinePunctualitySummary {
                line,
                avg_delay_minutes: avg,
                stddev_delay_minutes: avg.and_then(|m| stddev(&delays, m)),
                observation_count: delays.len(),
            }
        })
        .collect()
}
