//! Standardized principal component analysis over a row-per-sample,
//! column-per-band value matrix.
//!
//! Each band is centred and scaled by its sample standard deviation (n − 1),
//! so the eigenvalues are those of the correlation matrix and the Kaiser
//! rule (eigenvalue > 1) applies directly.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::error::{Error, Result};

/// Eigenvalue threshold of the Kaiser rule.
pub const KAISER_THRESHOLD: f64 = 1.0;

/// Round-off allowance: an eigenvalue of 1 computed as 1 + 2e-16 is not
/// above the threshold.
const KAISER_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct StandardizedPca {
    means: Vec<f64>,
    scales: Vec<f64>,
    /// Descending.
    eigenvalues: Vec<f64>,
    /// `loadings[component][band]`.
    loadings: Vec<Vec<f64>>,
}

impl StandardizedPca {
    /// Fit on complete rows (no NaN). Needs at least two rows and one band.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(Error::invalid(format!("PCA needs at least two rows, got {n}")));
        }
        let bands = rows[0].len();
        if bands == 0 {
            return Err(Error::invalid("PCA needs at least one band"));
        }
        if let Some(i) = rows.iter().position(|r| r.len() != bands) {
            return Err(Error::invalid(format!("row {i} has {} bands, expected {bands}", rows[i].len())));
        }

        let means: Vec<f64> = (0..bands)
            .map(|b| rows.iter().map(|r| r[b]).sum::<f64>() / n as f64)
            .collect();
        let scales: Vec<f64> = (0..bands)
            .map(|b| {
                let var = rows.iter().map(|r| (r[b] - means[b]).powi(2)).sum::<f64>() / (n - 1) as f64;
                var.sqrt()
            })
            .collect();

        let z = DMatrix::from_fn(n, bands, |i, b| standardize(rows[i][b], means[b], scales[b]));
        let corr = (z.transpose() * &z) / (n - 1) as f64;
        let eigen = SymmetricEigen::new(corr);

        let mut order: Vec<usize> = (0..bands).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let eigenvalues = order.iter().map(|&k| eigen.eigenvalues[k]).collect();
        let loadings = order
            .iter()
            .map(|&k| {
                let mut v: Vec<f64> = eigen.eigenvectors.column(k).iter().copied().collect();
                // Eigenvector sign is arbitrary; pin the dominant loading positive.
                let dominant = v.iter().copied().fold(0.0, |acc: f64, x| if x.abs() > acc.abs() { x } else { acc });
                if dominant < 0.0 {
                    v.iter_mut().for_each(|x| *x = -*x);
                }
                v
            })
            .collect();

        Ok(Self { means, scales, eigenvalues, loadings })
    }

    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn loadings(&self, component: usize) -> &[f64] {
        &self.loadings[component]
    }

    /// Components whose eigenvalue exceeds [`KAISER_THRESHOLD`].
    ///
    /// The comparison allows `KAISER_TOLERANCE` (1e-9) of slack, so an
    /// eigenvalue within 1e-9 above 1 is not retained.
    pub fn kaiser_components(&self) -> Vec<usize> {
        (0..self.eigenvalues.len())
            .filter(|&k| self.eigenvalues[k] > KAISER_THRESHOLD + KAISER_TOLERANCE)
            .collect()
    }

    pub fn score(&self, row: &[f64], component: usize) -> f64 {
        row.iter()
            .enumerate()
            .map(|(b, &x)| standardize(x, self.means[b], self.scales[b]) * self.loadings[component][b])
            .sum()
    }

    /// `scores[c][i]` = score of `rows[i]` on `components[c]`.
    pub fn scores(&self, rows: &[Vec<f64>], components: &[usize]) -> Vec<Vec<f64>> {
        components
            .iter()
            .map(|&c| rows.iter().map(|r| self.score(r, c)).collect())
            .collect()
    }
}

#[inline]
fn standardize(x: f64, mean: f64, scale: f64) -> f64 {
    if scale > 0.0 {
        (x - mean) / scale
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn eigenvalues_of_correlation_sum_to_band_count() {
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| {
                let t = i as f64;
                vec![t, (t * 0.7).sin() * 10.0, t * 0.5 + (t * 1.3).cos()]
            })
            .collect();
        let pca = StandardizedPca::fit(&rows).unwrap();
        assert_relative_eq!(pca.eigenvalues().iter().sum::<f64>(), 3.0, epsilon = 1e-9);
        assert!(pca.eigenvalues().windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn correlated_bands_give_one_kaiser_component() {
        // Band 2 is an exact multiple of band 1: correlation eigenvalues {2, 0}.
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 2.0 * i as f64 + 5.0]).collect();
        let pca = StandardizedPca::fit(&rows).unwrap();
        assert_relative_eq!(pca.eigenvalues()[0], 2.0, epsilon = 1e-9);
        assert_eq!(pca.kaiser_components(), vec![0]);
        // Equal loadings on both bands, sign pinned positive.
        for &w in pca.loadings(0) {
            assert_relative_eq!(w, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-9);
        }
        // Scores increase with the input along the dominant axis.
        assert!(pca.score(&rows[19], 0) > pca.score(&rows[0], 0));
        let scores = pca.scores(&rows, &[0]);
        assert_relative_eq!(scores[0].iter().sum::<f64>(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn uncorrelated_bands_may_retain_nothing() {
        // Two orthogonal ±1 patterns: correlation matrix is the identity,
        // both eigenvalues equal 1 and neither exceeds it.
        let rows = vec![vec![1.0, 1.0], vec![1.0, -1.0], vec![-1.0, 1.0], vec![-1.0, -1.0]];
        let pca = StandardizedPca::fit(&rows).unwrap();
        for &ev in pca.eigenvalues() {
            assert_relative_eq!(ev, 1.0, epsilon = 1e-9);
        }
        assert!(pca.kaiser_components().is_empty());
    }

    #[test]
    fn single_band_retains_nothing() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![(i * i) as f64]).collect();
        let pca = StandardizedPca::fit(&rows).unwrap();
        assert_relative_eq!(pca.eigenvalues()[0], 1.0, epsilon = 1e-9);
        assert!(pca.kaiser_components().is_empty());
    }

    #[test]
    fn constant_band_standardizes_to_zero() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 3.0]).collect();
        let pca = StandardizedPca::fit(&rows).unwrap();
        assert_relative_eq!(pca.eigenvalues()[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(pca.eigenvalues()[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(StandardizedPca::fit(&[vec![1.0]]).is_err());
        assert!(StandardizedPca::fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(StandardizedPca::fit(&[vec![], vec![]]).is_err());
    }
}
