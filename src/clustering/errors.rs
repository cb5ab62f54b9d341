//! Errors for the clustering engine (candidate validation, mixture-fit
//! failures, parallel-search aborts, and plot rendering).
//!
//! This module defines the clustering error type, [`ClusteringError`], used
//! across the criterion evaluator, the model-selection search, and the final
//! clusterer. It implements `Display`/`Error` and carries enough context
//! (the offending candidate count, the failure reason) for an analyst to
//! re-run with a narrower range or a different seed.
//!
//! ## Conventions
//! - Candidate counts `k` are validated **before** any fitting happens;
//!   a `k` for which the silhouette score is undefined (`k < 2` or `k ≥ n`)
//!   is rejected as [`ClusteringError::InvalidCandidateCount`].
//! - Non-convergence of the EM fit within the iteration budget is **not** an
//!   error: it is carried as a `converged` flag on the fitted model and the
//!   score record, and logged as a warning. Silently adjusting parameters
//!   would invalidate score comparability across candidates.
//! - Per-candidate failures inside the parallel search are wrapped in
//!   [`ClusteringError::SearchAborted`] with the failing `k`; partial results
//!   are never presented as a complete series.

/// Result alias for clustering operations that may produce
/// [`ClusteringError`].
pub type ClusterResult<T> = Result<T, ClusteringError>;

/// Unified error type for the clustering engine.
///
/// Covers input validation, candidate-count validation, mixture-fit
/// degeneracy, parallel-search aborts, and diagnostic-plot rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusteringError {
    // ---- Input/data validation ----
    /// The reduced matrix has no rows or no columns.
    EmptyMatrix,

    /// A matrix entry is NaN/±inf.
    NonFiniteValue { row: usize, col: usize, value: f64 },

    // ---- Candidate validation ----
    /// Candidate count is outside the valid range for the data size
    /// (silhouette requires `2 <= k <= n - 1`).
    InvalidCandidateCount { k: usize, n: usize },

    /// Candidate range must satisfy `k_min >= 1` and `k_max > k_min`.
    InvalidCandidateRange { k_min: usize, k_max: usize },

    // ---- Mixture fitting ----
    /// The optimization could not produce a valid model for the requested
    /// candidate count (singular covariance, more components than samples,
    /// degenerate labels). Fatal for that candidate/run, not retried.
    FitFailure { k: usize, reason: &'static str },

    // ---- Parallel search ----
    /// One candidate failed fatally during the model-selection search.
    /// Carries the failing `k` and the underlying failure.
    SearchAborted { k: usize, source: Box<ClusteringError> },

    // ---- Diagnostic plot ----
    /// The diagnostic plot could not be rendered to the output target.
    PlotRender { path: String, reason: String },
}

impl std::error::Error for ClusteringError {}

impl std::fmt::Display for ClusteringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            ClusteringError::EmptyMatrix => {
                write!(f, "Reduced matrix is empty.")
            }
            ClusteringError::NonFiniteValue { row, col, value } => {
                write!(f, "Matrix entry at ({row}, {col}) is non-finite: {value}")
            }
            // ---- Candidate validation ----
            ClusteringError::InvalidCandidateCount { k, n } => {
                write!(
                    f,
                    "Candidate count {k} is invalid for {n} samples; silhouette requires 2 <= k <= n - 1."
                )
            }
            ClusteringError::InvalidCandidateRange { k_min, k_max } => {
                write!(
                    f,
                    "Candidate range [{k_min}, {k_max}) is invalid; need k_min >= 1 and k_max > k_min."
                )
            }
            // ---- Mixture fitting ----
            ClusteringError::FitFailure { k, reason } => {
                write!(f, "Mixture fit failed for k = {k}: {reason}")
            }
            // ---- Parallel search ----
            ClusteringError::SearchAborted { k, source } => {
                write!(f, "Model-selection search aborted at candidate k = {k}: {source}")
            }
            // ---- Diagnostic plot ----
            ClusteringError::PlotRender { path, reason } => {
                write!(f, "Failed to render diagnostic plot to {path}: {reason}")
            }
        }
    }
}
