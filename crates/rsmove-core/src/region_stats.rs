//! Region statistics engine: one summary row per region label.
//!
//! Per region: sample count, distinct individuals, temporal segment
//! durations and polygon area. Everything that depends on an optional input
//! is `None` (NA) when that input is absent.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::coords::RegionLabel;
use crate::error::{Error, Result};
use crate::geodesy::Polygon;
use crate::params::{AreaMode, RegionStatsParams};
use crate::regions::RegionAssignment;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Gaps strictly longer than this (in days) split a temporal segment.
pub const SEGMENT_GAP_DAYS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: RegionLabel,
    /// Polygon area: m² in both modes (degrees are projected first), or the
    /// square of the polygon's own unit for other metric systems.
    pub area: Option<f64>,
    pub sample_count: usize,
    pub individual_count: Option<usize>,
    pub min_segment_days: Option<f64>,
    pub mean_segment_days: Option<f64>,
    pub max_segment_days: Option<f64>,
}

/// Summarize every region of `assignment`, labels ascending.
///
/// `individuals` and `timestamps`, when given, must hold one entry per
/// sample. All inputs are validated before anything is computed.
pub fn summarize_regions(
    assignment: &RegionAssignment,
    individuals: Option<&[String]>,
    timestamps: Option<&[DateTime<Utc>]>,
    params: &RegionStatsParams,
) -> Result<Vec<RegionSummary>> {
    let n = assignment.len();
    if let Some(ids) = individuals {
        if ids.len() != n {
            return Err(Error::invalid(format!("{} individual ids for {n} samples", ids.len())));
        }
    }
    if let Some(ts) = timestamps {
        if ts.len() != n {
            return Err(Error::invalid(format!("{} timestamps for {n} samples", ts.len())));
        }
    }
    let polygons = assignment.polygon_map()?;

    let members = assignment.members();
    for label in polygons.keys() {
        if !members.contains_key(*label) {
            warn!("Polygon for region {label} has no samples; ignored");
        }
    }
    debug!("Summarizing {n} samples in {} regions ({} polygons)", members.len(), polygons.len());

    let summaries: Vec<RegionSummary> = members
        .into_iter()
        .map(|(label, idx)| {
            let individual_count = individuals.map(|ids| {
                idx.iter().map(|&i| ids[i].as_str()).collect::<HashSet<_>>().len()
            });

            let (min_segment_days, mean_segment_days, max_segment_days) = match timestamps {
                Some(ts) => {
                    let region_ts: Vec<DateTime<Utc>> = idx.iter().map(|&i| ts[i]).collect();
                    segment_stats(&segment_durations(&region_ts))
                }
                None => (None, None, None),
            };

            let area = polygons.get(label).map(|poly| polygon_area(poly, params.area_mode));

            RegionSummary {
                region: label.clone(),
                area,
                sample_count: idx.len(),
                individual_count,
                min_segment_days,
                mean_segment_days,
                max_segment_days,
            }
        })
        .collect();

    info!("Summarized {} regions", summaries.len());
    Ok(summaries)
}

/// Durations in days of the temporal segments of one region.
///
/// Timestamps are sorted ascending; whenever the absolute gap between
/// neighbours exceeds [`SEGMENT_GAP_DAYS`], the running segment closes at the
/// earlier timestamp and a new one opens at the later. A lone timestamp is a
/// single zero-length segment. Empty input has no segments.
pub fn segment_durations(timestamps: &[DateTime<Utc>]) -> Vec<f64> {
    let mut sorted = timestamps.to_vec();
    sorted.sort();
    let Some(&first) = sorted.first() else {
        return Vec::new();
    };

    let mut durations = Vec::new();
    let mut start = first;
    let mut prev = first;
    for &t in &sorted[1..] {
        if days_between(prev, t).abs() > SEGMENT_GAP_DAYS {
            durations.push(days_between(start, prev).abs());
            start = t;
        }
        prev = t;
    }
    durations.push(days_between(start, prev).abs());
    durations
}

fn days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (b - a).num_milliseconds() as f64 / MS_PER_DAY
}

fn segment_stats(durations: &[f64]) -> (Option<f64>, Option<f64>, Option<f64>) {
    if durations.is_empty() {
        return (None, None, None);
    }
    let min = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let max = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    (Some(min), Some(mean), Some(max))
}

fn polygon_area(poly: &Polygon, mode: AreaMode) -> f64 {
    match mode {
        AreaMode::Metric => poly.planar_area(),
        AreaMode::Degrees => poly.degrees_area(),
    }
}
