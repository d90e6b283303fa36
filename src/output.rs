//! CSV persistence for the result tables.
//!
//! One writer per table; `Option<f64>` columns serialize as empty fields,
//! which is the explicit "no data" marker downstream reporting relies on.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::aggregate::{LinePunctualitySummary, StopPunctualitySummary};
use crate::analysis::metrics::TripMetrics;
use crate::analysis::speeding::SpeedingSegment;
use csv::Writer;
use std::path::Path;

fn write_rows<T: Serialize>(path: &str, rows: &[T]) -> Result<()> {
    debug!(path, rows = rows.len(), "Writing CSV table");

    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the post-plausibility-filter trip metrics table.
pub fn write_trip_metrics(path: &str, rows: &[TripMetrics]) -> Result<()> {
    write_rows(path, rows)
}

/// Writes the flattened speeding segment list.
pub fn write_speeding_segments(path: &str, rows: &[SpeedingSegment]) -> Result<()> {
    write_rows(path, rows)
}

/// Writes the per-stop punctuality summary table.
pub fn write_stop_summaries(path: &str, rows: &[StopPunctualitySummary]) -> Result<()> {
    write_rows(path, rows)
}

/// Writes the per-line punctuality summary table.
pub fn write_line_summaries(path: &str, rows: &[LinePunctualitySummary]) -> Result<()> {
    write_rows(path, rows)
}

/// Logs a result table as pretty-printed JSON.
pub fn print_json<T: Serialize>(rows: &[T]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

/// Output file names inside the run's output directory.
pub fn output_paths(dir: &str) -> (String, String, String, String) {
    let join = |name: &str| Path::new(dir).join(name).to_string_lossy().into_owned();
    (
        join("trip_metrics.csv"),
        join("speeding_segments.csv"),
        join("stop_punctuality.csv"),
        join("line_punctuality.csv"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_write_trip_metrics_creates_file_with_header() {
        let path = temp_path("bus_punctuality_test_metrics.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        let rows = vec![TripMetrics {
            line: 213,
            brigade: 4,
            duration_hours: 0.5,
            total_distance_km: 20.0,
            avg_speed_kmh: Some(40.0),
        }];
        write_trip_metrics(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("avg_speed_kmh"));
        assert!(lines[1].starts_with("213,4,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_no_data_summary_serializes_empty_fields() {
        let path = temp_path("bus_punctuality_test_summary.csv");
        let _ = fs::remove_file(&path);

        let rows = vec![StopPunctualitySummary {
            stop_id: "7009/01".to_string(),
            avg_delay_minutes: None,
            stddev_delay_minutes: None,
            observation_count: 0,
        }];
        write_stop_summaries(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let data_line = content.lines().nth(1).unwrap();
        // Empty fields, not zeros
        assert_eq!(data_line, "7009/01,,,0");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let rows = vec![LinePunctualitySummary {
            line: 213,
            avg_delay_minutes: Some(5.0),
            stddev_delay_minutes: Some(2.5),
            observation_count: 2,
        }];
        print_json(&rows).unwrap();
    }

    #[test]
    fn test_output_paths_join_directory() {
        let (metrics, speeding, stops, lines) = output_paths("out");
        assert!(metrics.ends_with("trip_metrics.csv"));
        assert!(speeding.ends_with("speeding_segments.csv"));
        assert!(stops.ends_with("stop_punctuality.csv"));
        assert!(lines.ends_with("line_punctuality.csv"));
    }
}
