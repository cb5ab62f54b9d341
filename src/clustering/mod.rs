//! clustering — model-selection and Gaussian-mixture clustering engine.
//!
//! Purpose
//! -------
//! Bundle the crate's core algorithmic surface under one namespace: the
//! criterion evaluator ([`scores`]), the parallel model-selection search
//! ([`search`]), and the final clusterer ([`assign`]), together with the
//! mixture estimator ([`gmm`]), its k-means initializer ([`kmeans`]), the
//! silhouette score ([`silhouette`]), the diagnostic plot ([`plot`]), and
//! the shared error types ([`errors`]). This is the surface most consumers
//! should depend on.
//!
//! Key behaviors
//! -------------
//! - Score a range of candidate cluster counts in parallel and aggregate an
//!   ordered, deterministic series for human model selection
//!   ([`find_n_clusters`]).
//! - Fit one mixture at a chosen count and emit hard assignments plus full
//!   posterior distributions per entity ([`cluster_entities`]).
//! - Centralize the error taxonomy in [`errors`] so callers see a uniform
//!   surface: invalid candidates are rejected before fitting, degenerate
//!   fits are fatal, search aborts carry the failing candidate, and
//!   non-convergence is a flag rather than an error.
//!
//! Invariants & assumptions
//! ------------------------
//! - The reduced matrix is owned by the caller for the duration of a run
//!   and never mutated here; scoring and fitting are read-only over it.
//! - Row order is preserved end to end: assignments and posteriors come
//!   back in the same order as the input rows.
//! - Determinism given a seed: candidate evaluation, the final fit, and
//!   the silhouette subsample are all driven by the caller's seed, so
//!   identical inputs reproduce identical outputs bit for bit.
//! - There is no process-wide mutable state; each invocation of the engine
//!   is self-contained given its inputs.
//!
//! Conventions
//! -----------
//! - Candidate ranges are half-open `[k_min, k_max)`.
//! - The fit policy (k-means initialization, tolerance 1e-3, 100 EM
//!   iterations, 1e-6 diagonal regularization) is fixed across the
//!   evaluator and the final clusterer so scores stay comparable.
//! - Logging goes through the `log` facade; this crate never installs a
//!   global logger. The binary (or embedding application) owns that.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its own contract; the
//!   end-to-end scenarios (150 x 3 matrix, range (2, 6), final k = 4) are
//!   exercised both here and in the crate-level integration test.

pub mod assign;
pub mod errors;
pub mod gmm;
pub mod kmeans;
pub mod plot;
pub mod scores;
pub mod search;
pub mod silhouette;

// ---- Re-exports (primary public surface) ----------------------------------
//
// These are the "everyday" items most users need. Lower-level pieces (the
// k-means initializer, the raw silhouette function, the plot renderer)
// remain under their respective submodules.

pub use self::assign::{cluster_entities, ClusterAssignment};
pub use self::errors::{ClusterResult, ClusteringError};
pub use self::gmm::{FittedMixture, GaussianMixture, GmmOptions};
pub use self::scores::{compute_scores, EvaluationOptions, ScoreRecord};
pub use self::search::{find_n_clusters, CandidateRange};
