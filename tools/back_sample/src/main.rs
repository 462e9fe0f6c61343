//! Select background (pseudo-absence) samples for a set of presences over a
//! raster stack, either as all unoccupied cells or filtered by PCA consensus.

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::{info, warn};
use rsmove_core::coords::collect_regions;
use rsmove_core::{
    select_background, BackgroundParams, Crs, Point, RasterStack, RegionAssignment, SamplePoint, SelectionMode,
};

#[derive(Parser, Debug)]
#[command(name = "back_sample", about = "Background sample selection against a raster stack")]
struct Args {
    /// Presence samples JSON array ({"x", "y", optional "region"}).
    #[arg(short, long)]
    presences: String,

    /// EPSG code of the presence coordinates; must match the raster.
    #[arg(long)]
    presence_epsg: u32,

    /// Raster stack JSON: an array of same-geometry layers.
    #[arg(short, long)]
    raster: String,

    /// Clustering output JSON with one label per presence. Without it the
    /// presences' own "region" fields are used, else a single region.
    #[arg(long)]
    regions: Option<String>,

    /// Base parameters JSON ({"mode", "n_samples", "seed"}).
    #[arg(long)]
    params: Option<String>,

    /// Selection mode override: random or pca.
    #[arg(short, long)]
    mode: Option<String>,

    /// Number of candidates to draw with replacement.
    #[arg(short, long)]
    n_samples: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Retry in random mode when the PCA filter has nothing to select from.
    #[arg(long)]
    fallback_random: bool,

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

fn read(path: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

fn resolve_params(args: &Args) -> Result<BackgroundParams> {
    let mut params: BackgroundParams = match &args.params {
        Some(path) => serde_json::from_str(&read(path)?).with_context(|| format!("parsing {path}"))?,
        None => BackgroundParams::default(),
    };
    if let Some(mode) = &args.mode {
        params.mode = mode.parse()?;
    }
    if let Some(n) = args.n_samples {
        params.n_samples = Some(n);
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    Ok(params)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = init_logging(args.log_level.as_deref())?;
    let params = resolve_params(&args)?;

    let samples: Vec<SamplePoint> =
        serde_json::from_str(&read(&args.presences)?).with_context(|| format!("parsing {}", args.presences))?;
    let raster: RasterStack =
        serde_json::from_str(&read(&args.raster)?).with_context(|| format!("parsing {}", args.raster))?;
    let regions = match &args.regions {
        Some(path) => RegionAssignment::from_json(&read(path)?)?,
        None => match collect_regions(&samples) {
            Some(labels) if !labels.is_empty() => RegionAssignment::new(labels),
            _ => RegionAssignment::single_region(samples.len()),
        },
    };
    let presences: Vec<Point> = samples.iter().map(SamplePoint::point).collect();
    let crs = Crs::from_epsg(args.presence_epsg);

    let selection = match select_background(&presences, crs, &raster, &regions, &params) {
        Err(e) if e.is_recoverable() && args.fallback_random && params.mode == SelectionMode::Pca => {
            warn!("{e}; falling back to random mode");
            let random = BackgroundParams { mode: SelectionMode::Random, ..params };
            select_background(&presences, crs, &raster, &regions, &random)?
        }
        other => other?,
    };

    let json = serde_json::to_string_pretty(&selection)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {path}"))?;
            info!("Wrote {} background samples to {path}", selection.points.len());
        }
        None => println!("{json}"),
    }
    Ok(())
}
