//! Criterion evaluator — one mixture fit per candidate count, three scores.
//!
//! Purpose
//! -------
//! Fit a Gaussian mixture at a single candidate count `k` and compute the
//! three model-selection criteria: AIC, BIC, and the silhouette score. One
//! [`ScoreRecord`] per candidate is what the model-selection search
//! aggregates into its diagnostic series.
//!
//! Key behaviors
//! -------------
//! - Reject candidates for which the silhouette is undefined (`k < 2` or
//!   `k >= n`) before any fitting happens.
//! - Fit with the fixed policy (k-means initialization, tolerance 1e-3,
//!   100-iteration budget) so scores are comparable across candidates.
//! - Report non-convergence on the record and as a warning; the score is
//!   still returned. No parameters are retried or adjusted.
//! - Optionally log fit progress and per-cluster populations when the
//!   verbosity flag is set.
//!
//! Invariants & assumptions
//! ------------------------
//! - Each invocation is a pure function of (matrix, k, options): no shared
//!   mutable state is touched, which is what lets the search fan out
//!   evaluations across a worker pool without locks.
//! - Re-running with identical inputs and seed yields an identical record,
//!   including the silhouette when the subsample cap is unchanged.
//!
//! Testing notes
//! -------------
//! - Unit tests cover candidate rejection at both bounds, finiteness and
//!   range of the produced scores, and determinism under a fixed seed.

use log::{info, warn};
use ndarray::ArrayView2;
use serde::Serialize;

use crate::clustering::errors::{ClusterResult, ClusteringError};
use crate::clustering::gmm::{GaussianMixture, GmmOptions};
use crate::clustering::silhouette::silhouette_score;

/// Caller-supplied knobs for one evaluator invocation.
///
/// All fields are explicit; there are no hidden global defaults. The
/// `Default` impl encodes the documented baseline: seed 0, quiet, the fixed
/// fit policy, and a 100 000-row silhouette subsample cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationOptions {
    /// Seed shared by the mixture initialization and the silhouette
    /// subsample.
    pub seed: u64,
    /// Emit per-candidate progress and population logs.
    pub verbose: bool,
    /// Mixture fit policy (tolerance, iteration budget, regularization).
    pub gmm: GmmOptions,
    /// Upper bound on rows scored by the silhouette; effective sample is
    /// `min(n, cap)`.
    pub silhouette_cap: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        EvaluationOptions {
            seed: 0,
            verbose: false,
            gmm: GmmOptions::default(),
            silhouette_cap: 100_000,
        }
    }
}

/// Scores for one candidate cluster count.
///
/// Created by [`compute_scores`], consumed by the model-selection search to
/// build the ordered-by-k series behind the diagnostic plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    /// Candidate cluster count.
    pub k: usize,
    /// Akaike information criterion; lower is better.
    pub aic: f64,
    /// Bayesian information criterion; lower is better.
    pub bic: f64,
    /// Silhouette score in `[-1, 1]`; higher is better.
    pub silhouette: f64,
    /// Whether the EM fit reached its tolerance within the iteration
    /// budget. A `false` here flags the record; it does not invalidate it.
    pub converged: bool,
}

/// Fit one mixture at candidate count `k` and score it.
///
/// Parameters
/// ----------
/// - `x`: `n x p` reduced matrix; read-only, shared across candidates.
/// - `k`: candidate count; must satisfy `2 <= k <= n - 1`.
/// - `opts`: seed, verbosity, fit policy, and silhouette cap.
///
/// Returns
/// -------
/// `ClusterResult<ScoreRecord>` with finite AIC/BIC and a silhouette in
/// `[-1, 1]`.
///
/// Errors
/// ------
/// - `ClusteringError::InvalidCandidateCount` when `k < 2` or `k >= n`,
///   rejected before fitting.
/// - `ClusteringError::FitFailure` when the mixture cannot be fit
///   (singular covariance, degenerate labels).
pub fn compute_scores(
    x: &ArrayView2<'_, f64>, k: usize, opts: &EvaluationOptions,
) -> ClusterResult<ScoreRecord> {
    let n = x.nrows();
    if k < 2 || k >= n {
        return Err(ClusteringError::InvalidCandidateCount { k, n });
    }

    if opts.verbose {
        info!("GMM for {k} components started");
    }

    let gmm = GaussianMixture::with_options(k, opts.seed, opts.gmm);
    let fit = gmm.fit(x)?;

    if !fit.converged() {
        warn!("GMM for {k} components did not converge within {} iterations", opts.gmm.max_iter);
    } else if opts.verbose {
        info!("GMM for {k} components has been fitted ({} iterations)", fit.n_iter());
    }

    let labels = fit.predict(x);

    if opts.verbose {
        let mut counts = vec![0usize; k];
        for &l in &labels {
            counts[l] += 1;
        }
        info!("Cluster populations for {k} components: {counts:?}");
    }

    let aic = fit.aic();
    let bic = fit.bic();
    let silhouette = silhouette_score(x, &labels, k, opts.silhouette_cap, opts.seed)?;

    if opts.verbose {
        info!(
            "# Clusters: {k} | AIC: {aic:.4} | BIC: {bic:.4} | Silhouette Score: {silhouette:.4}"
        );
    }

    Ok(ScoreRecord { k, aic, bic, silhouette, converged: fit.converged() })
}
