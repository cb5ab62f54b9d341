//! Model-selection search — parallel criterion evaluation over a candidate
//! range.
//!
//! Purpose
//! -------
//! Evaluate every candidate cluster count in a half-open range
//! `[k_min, k_max)` against the reduced matrix, collect the per-candidate
//! [`ScoreRecord`]s into an ascending-by-k series, and optionally render the
//! dual-axis diagnostic plot. The search surfaces criteria for a human to
//! interpret; it deliberately does not pick a "best" k.
//!
//! Key behaviors
//! -------------
//! - Fan one criterion evaluation per candidate out over the rayon worker
//!   pool. Candidates are independent and order-insensitive: each
//!   evaluation is a pure function of (matrix, k, options), the matrix is
//!   shared read-only, and no locking is needed.
//! - Re-sort completed results into ascending-k order regardless of
//!   completion order, so the series (and the plot built from it) is
//!   deterministic across runs.
//! - Block until every scheduled candidate completes or one fails; a fatal
//!   per-candidate failure aborts the whole search as
//!   [`ClusteringError::SearchAborted`] carrying the failing `k`. Partial
//!   results are never presented as a complete series.
//!
//! Invariants & assumptions
//! ------------------------
//! - `CandidateRange` enforces `k_min >= 1` and `k_max > k_min` at
//!   construction; per-candidate bounds against the data size are the
//!   evaluator's job.
//! - Identical inputs and seed produce a bit-identical score series
//!   (order and values).
//! - The worker pool is rayon's global pool; it is released on every exit
//!   path, including the failure path, because the fan-out is a plain
//!   `par_iter` with no detached tasks.
//!
//! Testing notes
//! -------------
//! - Unit tests cover series length/ordering on a separable matrix, abort
//!   semantics when the range extends past the data size, idempotence of
//!   repeated searches, and range validation.

use std::path::Path;

use log::info;
use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::clustering::errors::{ClusterResult, ClusteringError};
use crate::clustering::plot::render_score_plot;
use crate::clustering::scores::{compute_scores, EvaluationOptions, ScoreRecord};

/// Half-open candidate interval `[k_min, k_max)`.
///
/// Validated at construction: `k_min >= 1` and `k_max > k_min`. Whether an
/// individual candidate fits the data size is checked per candidate by the
/// evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRange {
    k_min: usize,
    k_max: usize,
}

impl CandidateRange {
    /// Construct a validated half-open range.
    ///
    /// Errors
    /// ------
    /// - `ClusteringError::InvalidCandidateRange` when `k_min < 1` or
    ///   `k_max <= k_min`.
    pub fn new(k_min: usize, k_max: usize) -> ClusterResult<Self> {
        if k_min < 1 || k_max <= k_min {
            return Err(ClusteringError::InvalidCandidateRange { k_min, k_max });
        }
        Ok(CandidateRange { k_min, k_max })
    }

    /// Inclusive lower bound.
    pub fn k_min(&self) -> usize {
        self.k_min
    }

    /// Exclusive upper bound.
    pub fn k_max(&self) -> usize {
        self.k_max
    }

    /// Number of candidates in the range.
    pub fn len(&self) -> usize {
        self.k_max - self.k_min
    }

    /// Whether the range is empty (never true for a validated range).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidates in ascending order.
    pub fn candidates(&self) -> impl Iterator<Item = usize> {
        self.k_min..self.k_max
    }
}

/// Evaluate every candidate in `range` and return the ascending-by-k score
/// series, rendering the diagnostic plot when a target is given.
///
/// Parameters
/// ----------
/// - `x`: `n x p` reduced matrix, shared read-only across workers.
/// - `range`: validated candidate interval `[k_min, k_max)`.
/// - `opts`: seed, verbosity, fit policy, silhouette cap — identical for
///   every candidate so scores stay comparable.
/// - `plot_path`: output target for the dual-axis chart; `None` skips
///   rendering (the series is returned either way).
///
/// Returns
/// -------
/// `ClusterResult<Vec<ScoreRecord>>` with exactly `range.len()` records
/// sorted strictly ascending by `k`.
///
/// Errors
/// ------
/// - `ClusteringError::SearchAborted` when any candidate fails fatally,
///   carrying the failing `k` and the underlying failure.
/// - `ClusteringError::PlotRender` when the chart cannot be written.
pub fn find_n_clusters(
    x: &ArrayView2<'_, f64>, range: CandidateRange, opts: &EvaluationOptions,
    plot_path: Option<&Path>,
) -> ClusterResult<Vec<ScoreRecord>> {
    if opts.verbose {
        info!(
            "Evaluating {} candidate cluster counts in [{}, {})",
            range.len(),
            range.k_min(),
            range.k_max()
        );
    }

    let candidates: Vec<usize> = range.candidates().collect();
    let mut records: Vec<ScoreRecord> = candidates
        .par_iter()
        .map(|&k| {
            compute_scores(x, k, opts)
                .map_err(|e| ClusteringError::SearchAborted { k, source: Box::new(e) })
        })
        .collect::<ClusterResult<Vec<_>>>()?;

    // Deterministic post-hoc ordering, independent of completion order.
    records.sort_by_key(|r| r.k);

    if let Some(path) = plot_path {
        render_score_plot(&records, path)?;
        if opts.verbose {
            info!("Diagnostic plot written to {}", path.display());
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Series length and strict ascending-k ordering for a valid range.
    // - Abort semantics with the failing candidate attached.
    // - Idempotence of repeated searches with identical inputs.
    // - Range validation.
    //
    // They intentionally DO NOT cover:
    // - Plot rasterization (environment-dependent; tests pass None).
    // -------------------------------------------------------------------------

    /// 150 x 3 matrix with four well-separated blobs, the scenario matrix
    /// used across the crate's search tests.
    fn scenario_matrix() -> Array2<f64> {
        let centers =
            [(0.0, 0.0, 0.0), (15.0, 0.0, 0.0), (0.0, 15.0, 0.0), (0.0, 0.0, 15.0)];
        let mut flat = Vec::new();
        for (b, (cx, cy, cz)) in centers.iter().enumerate() {
            let count = if b == 0 { 39 } else { 37 };
            for i in 0..count {
                flat.push(cx + ((i * 7 % 11) as f64 - 5.0) * 0.05);
                flat.push(cy + ((i * 3 % 13) as f64 - 6.0) * 0.05);
                flat.push(cz + ((i * 5 % 7) as f64 - 3.0) * 0.05);
            }
        }
        Array2::from_shape_vec((150, 3), flat).expect("shape matches data")
    }

    #[test]
    // Purpose
    // -------
    // Verify the scenario from the search contract: range (2, 6) on a
    // 150 x 3 matrix yields exactly 4 records for k = 2..5, sorted
    // ascending, each with finite criteria and a silhouette in [-1, 1].
    fn search_returns_full_sorted_series_for_valid_range() {
        let x = scenario_matrix();
        let range = CandidateRange::new(2, 6).expect("valid range");
        let opts = EvaluationOptions::default();

        let records = find_n_clusters(&x.view(), range, &opts, None).expect("search succeeds");

        assert_eq!(records.len(), 4);
        let ks: Vec<usize> = records.iter().map(|r| r.k).collect();
        assert_eq!(ks, vec![2, 3, 4, 5]);
        for r in &records {
            assert!(r.aic.is_finite());
            assert!(r.bic.is_finite());
            assert!((-1.0..=1.0).contains(&r.silhouette));
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify idempotence: two searches with identical inputs and seed
    // produce identical series, order and values.
    fn search_is_idempotent_for_fixed_seed() {
        let x = scenario_matrix();
        let range = CandidateRange::new(2, 6).expect("valid range");
        let opts = EvaluationOptions { seed: 5, ..EvaluationOptions::default() };

        let a = find_n_clusters(&x.view(), range, &opts, None).expect("search succeeds");
        let b = find_n_clusters(&x.view(), range, &opts, None).expect("search succeeds");

        assert_eq!(a, b);
    }

    #[test]
    // Purpose
    // -------
    // Verify abort semantics: a range reaching past the sample count fails
    // with SearchAborted carrying an invalid candidate, instead of
    // returning a silently truncated series.
    fn search_aborts_when_a_candidate_is_invalid() {
        let flat: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let x = Array2::from_shape_vec((10, 2), flat).expect("shape");
        let range = CandidateRange::new(8, 12).expect("valid range");
        let opts = EvaluationOptions::default();

        let err = find_n_clusters(&x.view(), range, &opts, None).unwrap_err();

        match err {
            ClusteringError::SearchAborted { k, source } => {
                assert!(k >= 10, "failing candidate must be one of the invalid ones");
                assert!(matches!(
                    *source,
                    ClusteringError::InvalidCandidateCount { .. }
                ));
            }
            other => panic!("expected SearchAborted, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify range validation: k_min = 0 and empty intervals are rejected.
    fn candidate_range_rejects_invalid_bounds() {
        assert!(matches!(
            CandidateRange::new(0, 5),
            Err(ClusteringError::InvalidCandidateRange { k_min: 0, k_max: 5 })
        ));
        assert!(matches!(
            CandidateRange::new(4, 4),
            Err(ClusteringError::InvalidCandidateRange { k_min: 4, k_max: 4 })
        ));
        assert!(CandidateRange::new(2, 6).is_ok());
    }
}
