//! Median and median absolute deviation.
//!
//! The MAD here is unscaled: the plain median of |x - median(x)|, without
//! the 1.4826 normal-consistency factor. NaN inputs are skipped.

/// Median of the non-NaN values. Even-length inputs
/// average the two middle values. `None` when nothing remains.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// `(median, mad)` of `values`.
pub fn median_mad(values: &[f64]) -> Option<(f64, f64)> {
    let med = median(values)?;
    let deviations: Vec<f64> = values.iter().filter(|v| !v.is_nan()).map(|v| (v - med).abs()).collect();
    let mad = median(&deviations)?;
    Some((med, mad))
}
