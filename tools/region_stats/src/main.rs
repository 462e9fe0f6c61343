//! Summarize clustered tracking regions: sample and individual counts,
//! temporal segment durations and polygon area per region label.

use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::info;
use rsmove_core::coords::{collect_individuals, collect_timestamps};
use rsmove_core::{summarize_regions, AreaMode, RegionAssignment, RegionStatsParams, SamplePoint};

#[derive(Parser, Debug)]
#[command(name = "region_stats", about = "Per-region summary statistics of clustered tracking data")]
struct Args {
    /// Clustering output JSON: {"indices": [...], "polygons": [...]}.
    #[arg(short, long)]
    assignment: String,

    /// Sample JSON array in assignment order; individual ids and timestamps
    /// are used when every sample carries them.
    #[arg(short, long)]
    samples: Option<String>,

    /// Polygon coordinate interpretation: metric or degrees. Only checked
    /// when the assignment has polygons.
    #[arg(long, default_value = "metric")]
    area_mode: String,

    /// Output JSON path; stdout when omitted.
    #[arg(short, long)]
    output: Option<String>,

    /// Log level filter, e.g. "debug". Falls back to RUST_LOG, then "info".
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) -> Result<LoggerHandle> {
    let logger = match level {
        Some(filter) => Logger::try_with_str(filter)?,
        None => Logger::try_with_env_or_str("info")?,
    };
    Ok(logger.log_to_stderr().start()?)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = init_logging(args.log_level.as_deref())?;

    let text = fs::read_to_string(&args.assignment)
        .with_context(|| format!("reading assignment {}", args.assignment))?;
    let assignment = RegionAssignment::from_json(&text)?;

    let samples: Vec<SamplePoint> = match &args.samples {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading samples {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing samples {path}"))?
        }
        None => Vec::new(),
    };
    if args.samples.is_some() && samples.len() != assignment.len() {
        bail!("{} samples for {} region labels", samples.len(), assignment.len());
    }
    let individuals = collect_individuals(&samples).filter(|v| !v.is_empty());
    let timestamps = collect_timestamps(&samples).filter(|v| !v.is_empty());

    let area_mode = if assignment.has_polygons() {
        args.area_mode.parse::<AreaMode>()?
    } else {
        AreaMode::Metric
    };
    let params = RegionStatsParams { area_mode };

    let rows = summarize_regions(&assignment, individuals.as_deref(), timestamps.as_deref(), &params)?;
    let json = serde_json::to_string_pretty(&rows)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {path}"))?;
            info!("Wrote {} region summaries to {path}", rows.len());
        }
        None => println!("{json}"),
    }
    Ok(())
}
