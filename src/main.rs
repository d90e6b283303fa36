//! CLI entry point for the bus punctuality analyzer.
//!
//! Provides subcommands for running the full analysis over a set of
//! already-fetched feed files and for inspecting ingestion quality.

use anyhow::Result;
use bus_punctuality::{
    analysis::{
        aggregate::{summarize_lines, summarize_stop},
        metrics::compute_trip_metrics,
        punctuality::{PunctualityObservation, match_stop},
        speeding::detect_all_speeding,
        trajectory::build_trajectories,
    },
    config::AnalysisConfig,
    ingest::{load_pings, load_stops, load_timetables},
    output,
};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bus_punctuality")]
#[command(about = "Trajectory and punctuality analytics over bus GPS pings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write the result tables as CSV
    Analyze {
        /// Directory of ping partition JSON files
        #[arg(short, long, default_value = "data/pings")]
        pings_dir: String,

        /// Timetables JSON file
        #[arg(short, long, default_value = "data/timetables.json")]
        timetables: String,

        /// Stop coordinates JSON file
        #[arg(short, long, default_value = "data/stops.json")]
        stops: String,

        /// Directory to write result CSVs to
        #[arg(short, long, default_value = "results")]
        output_dir: String,

        /// Optional JSON file overriding the analysis thresholds
        #[arg(short, long)]
        config: Option<String>,

        /// Restrict timetable departures to these hours (repeatable)
        #[arg(long)]
        hours: Vec<u32>,

        /// Number of stops matched concurrently
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Ingest the ping source and report per-reason reject counts
    Inspect {
        /// Directory of ping partition JSON files
        #[arg(short, long, default_value = "data/pings")]
        pings_dir: String,

        /// Optional JSON file overriding the analysis thresholds
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bus_punctuality.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_punctuality.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            pings_dir,
            timetables,
            stops,
            output_dir,
            config,
            hours,
            concurrency,
        } => {
            let config = load_config(config.as_deref())?;
            let hours = if hours.is_empty() { None } else { Some(hours) };
            analyze(
                &pings_dir,
                &timetables,
                &stops,
                &output_dir,
                config,
                hours.as_deref(),
                concurrency,
            )
            .await?;
        }
        Commands::Inspect { pings_dir, config } => {
            let config = load_config(config.as_deref())?;
            let (pings, stats) = load_pings(&pings_dir, &config.bounds)?;
            let trajectories = build_trajectories(pings);
            info!(
                files = stats.files,
                accepted = stats.accepted,
                rejected = stats.rejected(),
                bad_time = stats.bad_time,
                out_of_bounds = stats.out_of_bounds,
                bad_line = stats.bad_line,
                bad_brigade = stats.bad_brigade,
                vehicles = trajectories.len(),
                "Ping source inspected"
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => {
            info!(path = p, "Loading analysis config");
            AnalysisConfig::load(p)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

/// Runs the whole pipeline: ingest, trajectory building, trip metrics,
/// speeding detection, punctuality matching, aggregation, CSV output.
///
/// Per-stop matching is embarrassingly parallel, so stops are distributed
/// across a bounded worker pool; trajectories are shared read-only.
#[tracing::instrument(skip(config, hours), fields(pings_dir, output_dir, concurrency))]
async fn analyze(
    pings_dir: &str,
    timetables_path: &str,
    stops_path: &str,
    output_dir: &str,
    config: AnalysisConfig,
    hours: Option<&[u32]>,
    concurrency: usize,
) -> Result<()> {
    let (pings, ingest_stats) = load_pings(pings_dir, &config.bounds)?;
    info!(
        accepted = ingest_stats.accepted,
        rejected = ingest_stats.rejected(),
        "Pings ingested"
    );
    if pings.is_empty() {
        warn!("Ping source is empty; result tables will be empty");
    }

    let stops = load_stops(stops_path)?;
    let timetables = load_timetables(timetables_path, &stops, hours)?;
    info!(
        stops = stops.len(),
        timetabled_stops = timetables.len(),
        "Timetables ingested"
    );

    let trajectories = build_trajectories(pings);
    info!(vehicles = trajectories.len(), "Trajectories built");

    let trip_metrics = compute_trip_metrics(&trajectories, &config.plausible_speed);
    let speeding = detect_all_speeding(&trajectories, &config.speeding);
    info!(
        plausible_trips = trip_metrics.len(),
        speeding_segments = speeding.len(),
        "Trip analysis complete"
    );

    let trajectories = Arc::new(trajectories);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));

    let mut tasks = Vec::new();
    for timetable in timetables {
        let sem = semaphore.clone();
        let trajectories = trajectories.clone();
        let punctuality_config = config.punctuality;

        let stop_span = tracing::info_span!("match_stop", stop = %timetable.stop.id());
        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                let observations =
                    match_stop(&timetable, trajectories.as_ref(), &punctuality_config);
                (timetable.stop.id(), observations)
            }
            .instrument(stop_span),
        );
        tasks.push(task);
    }

    let mut stop_summaries = Vec::new();
    let mut all_observations: Vec<PunctualityObservation> = Vec::new();
    for task in tasks {
        let (stop_id, observations) = task.await?;
        stop_summaries.push(summarize_stop(&stop_id, &observations));
        all_observations.extend(observations);
    }
    stop_summaries.sort_by(|a, b| a.stop_id.cmp(&b.stop_id));

    let line_summaries = summarize_lines(&all_observations);
    info!(
        observations = all_observations.len(),
        stops = stop_summaries.len(),
        lines = line_summaries.len(),
        "Punctuality matching complete"
    );

    std::fs::create_dir_all(output_dir)?;
    let (metrics_path, speeding_path, stops_path, lines_path) = output::output_paths(output_dir);
    output::write_trip_metrics(&metrics_path, &trip_metrics)?;
    output::write_speeding_segments(&speeding_path, &speeding)?;
    output::write_stop_summaries(&stops_path, &stop_summaries)?;
    output::write_line_summaries(&lines_path, &line_summaries)?;

    info!(output_dir, "Analysis finished");
    Ok(())
}
