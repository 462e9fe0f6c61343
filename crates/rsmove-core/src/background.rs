//! Background (pseudo-absence) sample selection.
//!
//! Pipeline:
//!   1. Collapse presences to one per occupied raster cell.
//!   2. Take every unoccupied cell as a candidate, or draw a fixed number of
//!      them with replacement.
//!   3. `random` mode stops here.
//!   4. `pca` mode scores presences and candidates on the Kaiser-retained
//!      components of a standardized PCA. A candidate is kept when, on at
//!      least one component, it lies further than the MAD from the median of
//!      every presence region.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::coords::{Crs, Point, RegionLabel};
use crate::error::{Error, Result};
use crate::pca::StandardizedPca;
use crate::params::{BackgroundParams, SelectionMode};
use crate::raster::RasterSource;
use crate::regions::RegionAssignment;
use crate::robust::median_mad;

/// Presences reduced to one per raster cell, first occurrence wins.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupiedCells {
    pub cells: Vec<usize>,
    pub points: Vec<Point>,
    pub regions: Vec<RegionLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundSelection {
    pub crs: Crs,
    pub cells: Vec<usize>,
    pub points: Vec<Point>,
    /// One row per point, one column per band. Only set in `pca` mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Vec<f64>>>,
    /// Principal components that drove a `pca` selection, by rank.
    #[serde(default)]
    pub retained_components: Vec<usize>,
}

/// Outcome of [`pca_filter`]: positions into the candidate rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaSelection {
    pub selected: Vec<usize>,
    pub components: Vec<usize>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Choose background samples for `presences` over `raster`.
///
/// `regions` labels each presence; pass [`RegionAssignment::single_region`]
/// when no clustering is available. Inputs are validated before any work is
/// done. In `pca` mode an `EmptySelection` error means the filter had no
/// components or no complete candidates; callers may retry in `random` mode.
pub fn select_background<R: RasterSource + ?Sized>(
    presences: &[Point],
    presence_crs: Crs,
    raster: &R,
    regions: &RegionAssignment,
    params: &BackgroundParams,
) -> Result<BackgroundSelection> {
    if regions.len() != presences.len() {
        return Err(Error::invalid(format!(
            "{} region labels for {} presences",
            regions.len(),
            presences.len()
        )));
    }
    raster.validate()?;
    if !presence_crs.is_equivalent(&raster.crs()) {
        return Err(Error::CrsMismatch {
            presence: presence_crs.to_string(),
            raster: raster.crs().to_string(),
        });
    }
    if params.n_samples == Some(0) {
        return Err(Error::invalid("requested background sample count must be positive"));
    }

    let occupied = deduplicate_presences(raster, presences, &regions.indices);
    let pool = background_candidates(raster, &occupied.cells);
    debug!(
        "{} presences → {} occupied cells, {} candidate cells",
        presences.len(),
        occupied.cells.len(),
        pool.len()
    );

    let candidates = match params.n_samples {
        Some(n) => {
            if pool.is_empty() {
                return Err(Error::EmptySelection("raster has no unoccupied cells to sample".into()));
            }
            subsample_with_replacement(&pool, n, params.seed)
        }
        None => pool,
    };

    match params.mode {
        SelectionMode::Random => {
            let points = candidates.iter().map(|&c| raster.coordinate_of_cell(c)).collect();
            info!("Random mode: {} background samples", candidates.len());
            Ok(BackgroundSelection {
                crs: raster.crs(),
                cells: candidates,
                points,
                values: None,
                retained_components: Vec::new(),
            })
        }
        SelectionMode::Pca => select_by_pca(raster, &occupied, &candidates),
    }
}

fn select_by_pca<R: RasterSource + ?Sized>(
    raster: &R,
    occupied: &OccupiedCells,
    candidates: &[usize],
) -> Result<BackgroundSelection> {
    let presence_values = raster.extract_values(&occupied.points);
    let candidate_points: Vec<Point> = candidates.iter().map(|&c| raster.coordinate_of_cell(c)).collect();
    let candidate_values = raster.extract_values(&candidate_points);

    // A row with any missing band leaves every downstream set.
    let complete = |row: &Vec<f64>| row.iter().all(|v| !v.is_nan());
    let mut p_rows = Vec::new();
    let mut p_labels = Vec::new();
    for (row, label) in presence_values.into_iter().zip(&occupied.regions) {
        if complete(&row) {
            p_rows.push(row);
            p_labels.push(label.clone());
        }
    }
    let keep: Vec<usize> = (0..candidates.len()).filter(|&i| complete(&candidate_values[i])).collect();
    let dropped = occupied.cells.len() - p_rows.len() + candidates.len() - keep.len();
    if dropped > 0 {
        warn!("Dropped {dropped} samples with missing raster values");
    }
    if keep.is_empty() {
        return Err(Error::EmptySelection("no background candidates with complete raster values".into()));
    }
    if p_rows.is_empty() {
        return Err(Error::EmptySelection("no presences with complete raster values".into()));
    }

    let c_rows: Vec<Vec<f64>> = keep.iter().map(|&i| candidate_values[i].clone()).collect();
    let selection = pca_filter(&p_rows, &p_labels, &c_rows)?;

    let cells: Vec<usize> = selection.selected.iter().map(|&s| candidates[keep[s]]).collect();
    let points = selection.selected.iter().map(|&s| candidate_points[keep[s]]).collect();
    let values = selection.selected.iter().map(|&s| c_rows[s].clone()).collect();
    info!(
        "PCA mode: {} of {} candidates selected on {} components",
        cells.len(),
        c_rows.len(),
        selection.components.len()
    );

    Ok(BackgroundSelection {
        crs: raster.crs(),
        cells,
        points,
        values: Some(values),
        retained_components: selection.components,
    })
}

// ── Pipeline steps ────────────────────────────────────────────────────────────

/// One presence per raster cell, carrying its region label. Presences outside
/// the raster extent are dropped.
pub fn deduplicate_presences<R: RasterSource + ?Sized>(
    raster: &R,
    presences: &[Point],
    labels: &[RegionLabel],
) -> OccupiedCells {
    let mut seen = HashSet::new();
    let mut out = OccupiedCells { cells: Vec::new(), points: Vec::new(), regions: Vec::new() };
    let mut outside = 0usize;
    for (&p, label) in presences.iter().zip(labels) {
        match raster.cell_index_of(p) {
            Some(cell) => {
                if seen.insert(cell) {
                    out.cells.push(cell);
                    out.points.push(p);
                    out.regions.push(label.clone());
                }
            }
            None => outside += 1,
        }
    }
    if outside > 0 {
        warn!("{outside} presences fall outside the raster extent");
    }
    out
}

/// Every raster cell not in `occupied`, ascending.
pub fn background_candidates<R: RasterSource + ?Sized>(raster: &R, occupied: &[usize]) -> Vec<usize> {
    let occupied: HashSet<usize> = occupied.iter().copied().collect();
    (0..raster.cell_count()).filter(|c| !occupied.contains(c)).collect()
}

/// `n` draws with replacement from `pool`, reproducible for a given seed.
/// `pool` must not be empty.
pub fn subsample_with_replacement(pool: &[usize], n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| pool[rng.gen_range(0..pool.len())]).collect()
}

/// Standardized-PCA consensus filter.
///
/// For each retained component and each distinct presence region, a
/// candidate is flagged when |score − median| > MAD of that region's
/// presence scores. Flags are AND-ed across regions, then OR-ed across
/// components. Rows must be complete (no NaN).
pub fn pca_filter(
    presence_rows: &[Vec<f64>],
    presence_regions: &[RegionLabel],
    candidate_rows: &[Vec<f64>],
) -> Result<PcaSelection> {
    if presence_rows.len() != presence_regions.len() {
        return Err(Error::invalid(format!(
            "{} region labels for {} presence rows",
            presence_regions.len(),
            presence_rows.len()
        )));
    }
    if presence_rows.is_empty() || candidate_rows.is_empty() {
        return Err(Error::EmptySelection("PCA filter needs presences and candidates".into()));
    }

    let combined: Vec<Vec<f64>> = presence_rows.iter().chain(candidate_rows).cloned().collect();
    let pca = StandardizedPca::fit(&combined)?;
    let components = pca.kaiser_components();
    if components.is_empty() {
        return Err(Error::EmptySelection("no principal component has eigenvalue above 1".into()));
    }
    debug!("Retained components {components:?} of eigenvalues {:?}", pca.eigenvalues());

    let presence_scores = pca.scores(presence_rows, &components);
    let candidate_scores = pca.scores(candidate_rows, &components);

    let mut groups: BTreeMap<&RegionLabel, Vec<usize>> = BTreeMap::new();
    for (i, label) in presence_regions.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }
    let members: Vec<&Vec<usize>> = groups.values().collect();

    // One mask per (component slot, region), laid out component-major.
    let pairs: Vec<(usize, &Vec<usize>)> = (0..components.len())
        .flat_map(|k| members.iter().map(move |m| (k, *m)))
        .collect();
    let flag = |&(k, idx): &(usize, &Vec<usize>)| -> Vec<bool> {
        let region_scores: Vec<f64> = idx.iter().map(|&i| presence_scores[k][i]).collect();
        match median_mad(&region_scores) {
            Some((med, mad)) => candidate_scores[k].iter().map(|s| (s - med).abs() > mad).collect(),
            None => vec![false; candidate_rows.len()],
        }
    };
    #[cfg(feature = "threading")]
    let masks: Vec<Vec<bool>> = pairs.par_iter().map(flag).collect();
    #[cfg(not(feature = "threading"))]
    let masks: Vec<Vec<bool>> = pairs.iter().map(flag).collect();

    let n_regions = members.len();
    let selected = (0..candidate_rows.len())
        .filter(|&j| {
            masks
                .chunks(n_regions)
                .any(|per_region| per_region.iter().all(|mask| mask[j]))
        })
        .collect();

    Ok(PcaSelection { selected, components })
}
