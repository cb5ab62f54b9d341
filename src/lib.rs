//! chainclust — entity clustering for on-chain behavioral features.
//!
//! Purpose
//! -------
//! Serve as the crate root for the entity-clustering pipeline: load a
//! feature table keyed by entity id, standardize and reduce it with PCA,
//! search a range of candidate cluster counts with Gaussian mixtures
//! scored by AIC, BIC, and the silhouette, and produce a final clustering
//! with per-entity posterior memberships.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules (`clustering`, `dataset`, `preprocessing`,
//!   `config`) as the public crate surface.
//! - Keep all randomness seeded: identical inputs and settings give
//!   bit-identical scores, labels, and posteriors.
//! - Leave logger installation to the binary; library modules emit through
//!   the `log` facade only.
//!
//! Invariants & assumptions
//! ------------------------
//! - Feature matrices are dense `f64` with rows aligned to entity ids;
//!   every stage preserves row order, so the alignment established at load
//!   time holds through scaling, reduction, and assignment.
//! - All fallible operations return rich error types; no module panics on
//!   malformed input.
//!
//! Conventions
//! -----------
//! - Each module owns its error enum (`ClusteringError`, `DatasetError`,
//!   `PreprocessingError`, `SettingsError`) with a matching result alias.
//! - Candidate ranges are half-open: `[k_min, k_max)`.
//!
//! Downstream usage
//! ----------------
//! - The `chainclust` binary wires the full pipeline from a settings file;
//!   library callers can compose the same stages directly, e.g.
//!   `find_n_clusters` for model selection and `cluster_entities` for the
//!   final assignment.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in each module; the
//!   end-to-end flow is exercised by the integration test under `tests/`.

pub mod clustering;
pub mod config;
pub mod dataset;
pub mod preprocessing;

/// Convenience re-exports of the types most callers need.
pub mod prelude {
    pub use crate::clustering::{
        cluster_entities, compute_scores, find_n_clusters, CandidateRange, ClusterAssignment,
        ClusterResult, ClusteringError, EvaluationOptions, FittedMixture, GaussianMixture,
        GmmOptions, ScoreRecord,
    };
    pub use crate::config::{Settings, SettingsError, SettingsResult};
    pub use crate::dataset::{load_dataset, save_dataset, Dataset, DatasetError, DatasetResult};
    pub use crate::preprocessing::{Pca, PreprocessingError, PreprocessingResult, StandardScaler};
}
