//! Principal component analysis over the feature covariance.
//!
//! Purpose
//! -------
//! Project the standardized feature matrix onto its top `p` principal
//! components, producing the reduced matrix the clustering engine runs on.
//! The decomposition goes through the symmetric eigendecomposition of the
//! `d x d` feature covariance, which is tiny for this pipeline's feature
//! counts.
//!
//! Key behaviors
//! -------------
//! - Center the input, estimate the covariance with `n - 1` in the
//!   denominator, and eigendecompose it.
//! - Order components by descending explained variance and fix each
//!   component's sign so its largest-magnitude loading is positive; the
//!   projection is then deterministic, with no RNG involved at all.
//! - Log the component loadings and explained-variance ratios after the
//!   fit, the numbers an analyst checks before trusting the reduction.
//!
//! Invariants & assumptions
//! ------------------------
//! - `1 <= p <= d`; requesting more components than features is an error.
//! - The reduced matrix is row-aligned with the input: row `i` of the
//!   output is the projection of row `i` of the input.

use log::info;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::preprocessing::errors::{PreprocessingError, PreprocessingResult};

/// Iteration budget for the symmetric eigensolver.
const EIGEN_MAX_ITER: usize = 250;

/// Fitted principal component analysis.
///
/// Holds the component loadings (`p x d`, one component per row), the
/// per-component explained variance, and the explained-variance ratios
/// against the total variance of the fit data.
#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    mean: Array1<f64>,
    components: Array2<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
}

impl Pca {
    /// Fit a `p`-component PCA to `x`.
    ///
    /// Parameters
    /// ----------
    /// - `x`: `n x d` (standardized) feature matrix.
    /// - `p`: number of components to keep, `1 <= p <= d`.
    ///
    /// Errors
    /// ------
    /// - `PreprocessingError::EmptyMatrix` / `InsufficientSamples` /
    ///   `NonFiniteValue` for invalid input.
    /// - `PreprocessingError::InvalidComponentCount` when `p` is 0 or
    ///   exceeds `d`.
    /// - `PreprocessingError::EigenFailure` if the eigensolver does not
    ///   converge.
    pub fn fit(x: &ArrayView2<'_, f64>, p: usize) -> PreprocessingResult<Self> {
        let n = x.nrows();
        let d = x.ncols();
        if n == 0 || d == 0 {
            return Err(PreprocessingError::EmptyMatrix);
        }
        if n < 2 {
            return Err(PreprocessingError::InsufficientSamples { n });
        }
        if p == 0 || p > d {
            return Err(PreprocessingError::InvalidComponentCount { requested: p, available: d });
        }
        for ((row, col), &value) in x.indexed_iter() {
            if !value.is_finite() {
                return Err(PreprocessingError::NonFiniteValue { row, col, value });
            }
        }

        let mean = x.mean_axis(Axis(0)).expect("n >= 2 rows");

        // Covariance of the centered columns, d x d.
        let mut cov = DMatrix::<f64>::zeros(d, d);
        for row in x.rows() {
            for a in 0..d {
                let da = row[a] - mean[a];
                for b in a..d {
                    let db = row[b] - mean[b];
                    cov[(a, b)] += da * db;
                }
            }
        }
        let denom = (n - 1) as f64;
        for a in 0..d {
            for b in a..d {
                let v = cov[(a, b)] / denom;
                cov[(a, b)] = v;
                cov[(b, a)] = v;
            }
        }

        let eigen = nalgebra::SymmetricEigen::try_new(cov, f64::EPSILON, EIGEN_MAX_ITER)
            .ok_or(PreprocessingError::EigenFailure)?;

        // Order eigenpairs by descending variance.
        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[b]
                .partial_cmp(&eigen.eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total_variance: f64 = eigen.eigenvalues.iter().map(|&v| v.max(0.0)).sum();

        let mut components = Array2::<f64>::zeros((p, d));
        let mut explained_variance = Array1::<f64>::zeros(p);
        let mut explained_variance_ratio = Array1::<f64>::zeros(p);
        for (out_idx, &eig_idx) in order.iter().take(p).enumerate() {
            let column = eigen.eigenvectors.column(eig_idx);
            // Deterministic sign: largest-magnitude loading is positive.
            let dominant = column
                .iter()
                .cloned()
                .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            let flip = if dominant < 0.0 { -1.0 } else { 1.0 };
            for j in 0..d {
                components[[out_idx, j]] = flip * column[j];
            }
            let variance = eigen.eigenvalues[eig_idx].max(0.0);
            explained_variance[out_idx] = variance;
            explained_variance_ratio[out_idx] =
                if total_variance > 0.0 { variance / total_variance } else { 0.0 };
        }

        let pca = Pca { mean, components, explained_variance, explained_variance_ratio };
        info!("PCA components: {:?}", pca.components);
        info!("PCA explained variance ratio: {:?}", pca.explained_variance_ratio);
        Ok(pca)
    }

    /// Component loadings, `p x d`, one component per row.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Variance captured by each kept component.
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    /// Fraction of total variance captured by each kept component.
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Project `x` onto the fitted components, yielding an `n x p` matrix
    /// row-aligned with the input.
    ///
    /// Errors
    /// ------
    /// - `PreprocessingError::DimensionMismatch` when the column count
    ///   differs from the fit.
    pub fn transform(&self, x: &ArrayView2<'_, f64>) -> PreprocessingResult<Array2<f64>> {
        let d = self.mean.len();
        if x.ncols() != d {
            return Err(PreprocessingError::DimensionMismatch { expected: d, actual: x.ncols() });
        }
        let mut centered = x.to_owned();
        centered -= &self.mean;
        Ok(centered.dot(&self.components.t()))
    }

    /// Fit to `x` and return the reduced matrix with the model.
    pub fn fit_transform(
        x: &ArrayView2<'_, f64>, p: usize,
    ) -> PreprocessingResult<(Pca, Array2<f64>)> {
        let pca = Pca::fit(x, p)?;
        let reduced = pca.transform(x)?;
        Ok((pca, reduced))
    }
}
