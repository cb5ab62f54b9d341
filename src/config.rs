//! Application settings with documented defaults.
//!
//! Purpose
//! -------
//! Collect every knob the pipeline consumes into one explicit structure
//! with named, enumerated fields: dataset paths and the drop-NA policy,
//! PCA component count, the candidate-search range and its plot target,
//! and the final clustering count. Settings are passed by value into each
//! entry point; there are no hidden global defaults and no self-loading,
//! the caller decides where settings come from.
//!
//! Key behaviors
//! -------------
//! - `Settings::default()` encodes the documented baseline: 3 PCA
//!   components, candidate range [3, 30), final count 12, seed 0, verbose
//!   search, 100 000-row silhouette cap.
//! - [`Settings::from_path`] deserializes a JSON file with every field
//!   optional; omitted fields (or whole sections) keep their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Result alias for settings loading.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors from loading a settings file.
#[derive(Debug)]
pub enum SettingsError {
    /// The file could not be read.
    Io { path: String, reason: String },
    /// The file is not valid settings JSON.
    Parse { path: String, reason: String },
}

impl std::error::Error for SettingsError {}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io { path, reason } => {
                write!(f, "Cannot read settings file {path}: {reason}")
            }
            SettingsError::Parse { path, reason } => {
                write!(f, "Cannot parse settings file {path}: {reason}")
            }
        }
    }
}

/// Dataset location and load policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Headed CSV with the entity id in the first column.
    pub dataset_path: PathBuf,
    /// Output target for the merged result table.
    pub save_path: PathBuf,
    /// Drop rows with missing values instead of failing the load.
    pub drop_na: bool,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        DatasetSettings {
            dataset_path: PathBuf::from("dataset/entity_features_final.csv"),
            save_path: PathBuf::from("dataset/dataset_pca_clusters.csv"),
            drop_na: true,
        }
    }
}

/// Feature standardization and reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingSettings {
    /// Principal components kept for clustering.
    pub pca_components: usize,
}

impl Default for PreprocessingSettings {
    fn default() -> Self {
        PreprocessingSettings { pca_components: 3 }
    }
}

/// Model-selection search over candidate cluster counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Inclusive lower bound of the candidate range.
    pub k_min: usize,
    /// Exclusive upper bound of the candidate range.
    pub k_max: usize,
    /// Seed shared by every candidate evaluation.
    pub seed: u64,
    /// Emit per-candidate progress logs.
    pub verbose: bool,
    /// Output target for the dual-axis diagnostic plot.
    pub plot_path: PathBuf,
    /// Upper bound on rows scored by the silhouette.
    pub silhouette_cap: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            k_min: 3,
            k_max: 30,
            seed: 0,
            verbose: true,
            plot_path: PathBuf::from("clusters_AIC_BIC_Sil.png"),
            silhouette_cap: 100_000,
        }
    }
}

/// Final clustering at the chosen count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    /// Chosen cluster count.
    pub n_clusters: usize,
    /// Mixture initialization seed.
    pub seed: u64,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        ClusteringSettings { n_clusters: 12, seed: 0 }
    }
}

/// Full application settings tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Dataset location and load policy.
    pub dataset: DatasetSettings,
    /// Standardization and PCA.
    pub preprocessing: PreprocessingSettings,
    /// Candidate-search configuration.
    pub search: SearchSettings,
    /// Final clustering configuration.
    pub clustering: ClusteringSettings,
    /// Run the model-selection search instead of the final clustering.
    pub find_clusters: bool,
}

impl Settings {
    /// Load settings from a JSON file; omitted fields keep their defaults.
    ///
    /// Errors
    /// ------
    /// - `SettingsError::Io` when the file cannot be read.
    /// - `SettingsError::Parse` when the contents are not settings JSON.
    pub fn from_path(path: &Path) -> SettingsResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the documented defaults and partial JSON overrides.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify the documented baseline settings.
    fn defaults_match_documented_baseline() {
        let settings = Settings::default();

        assert_eq!(settings.preprocessing.pca_components, 3);
        assert_eq!((settings.search.k_min, settings.search.k_max), (3, 30));
        assert_eq!(settings.search.silhouette_cap, 100_000);
        assert_eq!(settings.clustering.n_clusters, 12);
        assert_eq!(settings.clustering.seed, 0);
        assert!(settings.dataset.drop_na);
        assert!(!settings.find_clusters);
    }

    #[test]
    // Purpose
    // -------
    // Verify that a partial JSON file overrides only the named fields and
    // leaves the rest at their defaults.
    fn from_path_applies_partial_overrides() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"{ "find_clusters": true, "search": { "k_min": 2, "k_max": 6 } }"#,
        )
        .expect("write");

        let settings = Settings::from_path(file.path()).expect("parse succeeds");

        assert!(settings.find_clusters);
        assert_eq!((settings.search.k_min, settings.search.k_max), (2, 6));
        // Untouched fields keep their defaults.
        assert_eq!(settings.search.seed, 0);
        assert_eq!(settings.clustering.n_clusters, 12);
    }

    #[test]
    // Purpose
    // -------
    // Verify that malformed JSON surfaces as a parse error with the path.
    fn from_path_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{ not json").expect("write");

        let err = Settings::from_path(file.path()).unwrap_err();

        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
