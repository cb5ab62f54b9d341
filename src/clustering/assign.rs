//! Final clusterer — one fit at the chosen count, labels plus posteriors.
//!
//! Purpose
//! -------
//! Once the analyst has picked a cluster count from the diagnostic series,
//! fit a single Gaussian mixture at that count and emit, for every entity,
//! its hard cluster assignment and full posterior distribution. This is the
//! path whose output is persisted by the result sink; the search path only
//! produces the diagnostic series.
//!
//! Key behaviors
//! -------------
//! - Fit with the same policy as the criterion evaluator (k-means
//!   initialization, tolerance 1e-3, 100-iteration budget) so the final
//!   model is comparable to the one that was scored.
//! - Validate the output invariants before returning: one label and one
//!   length-k posterior row per entity, rows summing to 1 within 1e-6,
//!   arg-max equal to the label.
//! - Log per-label population counts as a class-balance sanity check.
//!
//! Invariants & assumptions
//! ------------------------
//! - Output row order equals input row order; the entity-identifier
//!   alignment established at load time is never broken here.
//! - This path is single-shot and sequential; it does not use the worker
//!   pool.
//! - A degenerate model (singular covariance, `k >= n`) is fatal for the
//!   run and not retried.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the k = 4 scenario invariants, population logging
//!   inputs (counts per label), determinism, and the `k >= n` failures.

use log::{info, warn};
use ndarray::{Array2, ArrayView2};

use crate::clustering::errors::{ClusterResult, ClusteringError};
use crate::clustering::gmm::{GaussianMixture, GmmOptions};

/// Tolerance for the posterior-row normalization check.
const POSTERIOR_SUM_TOL: f64 = 1e-6;

/// Per-entity output of the final clusterer.
///
/// `labels` and `posteriors` are row-aligned with the reduced matrix the
/// fit was given; `posteriors` is `n x k` with rows summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// Hard label per entity, each in `[0, k)`.
    pub labels: Vec<usize>,
    /// Posterior distribution per entity, `n x k`.
    pub posteriors: Array2<f64>,
    /// Whether the EM fit converged within its budget.
    pub converged: bool,
}

impl ClusterAssignment {
    /// Number of entities assigned.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no entities were assigned.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Cluster count the assignment was fit with.
    pub fn n_clusters(&self) -> usize {
        self.posteriors.ncols()
    }

    /// Entity count per label, length `k`.
    pub fn population_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_clusters()];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}

/// Fit one mixture at the chosen count `k` and assign every entity.
///
/// Parameters
/// ----------
/// - `x`: `n x p` reduced matrix, in entity order; read-only.
/// - `k`: chosen cluster count (`1 <= k < n`).
/// - `seed`: mixture initialization seed.
/// - `gmm_opts`: fit policy; use the defaults to match the evaluator.
///
/// Returns
/// -------
/// `ClusterResult<ClusterAssignment>` with exactly `n` labels and an
/// `n x k` posterior matrix in input row order.
///
/// Errors
/// ------
/// - `ClusteringError::FitFailure` when the optimization cannot produce a
///   valid model for the requested `k` (singular covariance, `k >= n`), or
///   when the fitted posteriors violate the normalization invariant.
/// - `ClusteringError::EmptyMatrix` / `NonFiniteValue` for invalid input.
pub fn cluster_entities(
    x: &ArrayView2<'_, f64>, k: usize, seed: u64, gmm_opts: GmmOptions,
) -> ClusterResult<ClusterAssignment> {
    info!("GMM for {k} components started");

    let gmm = GaussianMixture::with_options(k, seed, gmm_opts);
    let fit = gmm.fit(x)?;

    if fit.converged() {
        info!("GMM fitted ({} iterations)", fit.n_iter());
    } else {
        warn!("GMM for {k} components did not converge within {} iterations", gmm_opts.max_iter);
    }

    let labels = fit.predict(x);
    let posteriors = fit.predict_proba(x);
    validate_assignment(&labels, &posteriors, k)?;

    let assignment = ClusterAssignment { labels, posteriors, converged: fit.converged() };
    info!("Cluster populations for {k} components: {:?}", assignment.population_counts());

    Ok(assignment)
}

/// Check the output invariants: label in range, posterior rows normalized,
/// arg-max equal to the hard label.
fn validate_assignment(
    labels: &[usize], posteriors: &Array2<f64>, k: usize,
) -> ClusterResult<()> {
    for (i, row) in posteriors.rows().into_iter().enumerate() {
        let label = labels[i];
        if label >= k {
            return Err(ClusteringError::FitFailure { k, reason: "label out of range" });
        }
        let sum: f64 = row.sum();
        if (sum - 1.0).abs() > POSTERIOR_SUM_TOL {
            return Err(ClusteringError::FitFailure {
                k,
                reason: "posterior row does not sum to 1",
            });
        }
        if row.iter().any(|&v| v < 0.0) {
            return Err(ClusteringError::FitFailure { k, reason: "negative posterior" });
        }
        let argmax = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, _)| c)
            .unwrap_or(0);
        if argmax != label {
            return Err(ClusteringError::FitFailure {
                k,
                reason: "hard label is not the posterior arg-max",
            });
        }
    }
    Ok(())
}
