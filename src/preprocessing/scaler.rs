//! Zero-mean / unit-variance feature standardization.
//!
//! Purpose
//! -------
//! Standardize each feature column before dimensionality reduction so no
//! feature dominates the covariance purely by scale. The fitted scaler
//! keeps its means and scales and can transform further matrices with the
//! same feature layout.
//!
//! Conventions
//! -----------
//! - Scales are population standard deviations (ddof = 0).
//! - Near-zero standard deviations (`< 1e-9`) are sanitized to 1.0 so a
//!   constant column passes through centered instead of exploding.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::preprocessing::errors::{PreprocessingError, PreprocessingResult};

/// Standard deviations below this are treated as a constant column.
const MIN_SCALE: f64 = 1e-9;

/// Fitted standardizer: per-column mean and sanitized scale.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit a scaler to the columns of `x`.
    ///
    /// Errors
    /// ------
    /// - `PreprocessingError::EmptyMatrix` for zero rows/columns.
    /// - `PreprocessingError::InsufficientSamples` when `n < 2`.
    /// - `PreprocessingError::NonFiniteValue` for NaN/±inf entries.
    pub fn fit(x: &ArrayView2<'_, f64>) -> PreprocessingResult<Self> {
        let n = x.nrows();
        let d = x.ncols();
        if n == 0 || d == 0 {
            return Err(PreprocessingError::EmptyMatrix);
        }
        if n < 2 {
            return Err(PreprocessingError::InsufficientSamples { n });
        }
        for ((row, col), &value) in x.indexed_iter() {
            if !value.is_finite() {
                return Err(PreprocessingError::NonFiniteValue { row, col, value });
            }
        }

        let mean = x.mean_axis(Axis(0)).expect("n >= 2 rows");
        let mut scale = Array1::<f64>::zeros(d);
        for (j, column) in x.columns().into_iter().enumerate() {
            let var: f64 =
                column.iter().map(|&v| (v - mean[j]) * (v - mean[j])).sum::<f64>() / n as f64;
            let sd = var.sqrt();
            scale[j] = if sd < MIN_SCALE { 1.0 } else { sd };
        }

        Ok(StandardScaler { mean, scale })
    }

    /// Per-column means seen at fit time.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Per-column sanitized scales.
    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    /// Standardize `x` with the fitted means and scales.
    ///
    /// Errors
    /// ------
    /// - `PreprocessingError::DimensionMismatch` when the column count
    ///   differs from the fit.
    pub fn transform(&self, x: &ArrayView2<'_, f64>) -> PreprocessingResult<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(PreprocessingError::DimensionMismatch {
                expected: self.mean.len(),
                actual: x.ncols(),
            });
        }
        let mut out = x.to_owned();
        for (j, mut column) in out.columns_mut().into_iter().enumerate() {
            let (m, s) = (self.mean[j], self.scale[j]);
            column.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }

    /// Fit to `x` and return the standardized matrix with the scaler.
    pub fn fit_transform(
        x: &ArrayView2<'_, f64>,
    ) -> PreprocessingResult<(StandardScaler, Array2<f64>)> {
        let scaler = StandardScaler::fit(x)?;
        let transformed = scaler.transform(x)?;
        Ok((scaler, transformed))
    }
}
