//! chainclust — pipeline binary for entity clustering.
//!
//! Purpose
//! -------
//! Wire the full pipeline from a settings file: load the entity feature
//! table, standardize and PCA-reduce it, then either search a range of
//! candidate cluster counts (model selection) or fit the final clustering
//! and persist the merged result table.
//!
//! Key behaviors
//! -------------
//! - `--config` points at a JSON settings file; omitted fields keep their
//!   documented defaults, and a missing flag means the built-in defaults
//!   run as-is.
//! - `--find-clusters` plus the path flags override the corresponding
//!   settings fields from the command line.
//! - Installs `env_logger` with an `info` default filter; the library
//!   modules only emit through the `log` facade.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use chainclust::clustering::{
    cluster_entities, find_n_clusters, CandidateRange, EvaluationOptions, GmmOptions,
};
use chainclust::config::Settings;
use chainclust::dataset::{load_dataset, save_dataset};
use chainclust::preprocessing::{Pca, StandardScaler};

/// Cluster on-chain entities by behavioral features.
#[derive(Debug, Parser)]
#[command(name = "chainclust", version, about)]
struct Cli {
    /// JSON settings file; omitted fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the model-selection search instead of the final clustering.
    #[arg(long)]
    find_clusters: bool,

    /// Override the input dataset path.
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Override the result-table output path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the diagnostic plot path.
    #[arg(long)]
    plot: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_path(path)?,
        None => Settings::default(),
    };
    if cli.find_clusters {
        settings.find_clusters = true;
    }
    if let Some(path) = cli.dataset {
        settings.dataset.dataset_path = path;
    }
    if let Some(path) = cli.output {
        settings.dataset.save_path = path;
    }
    if let Some(path) = cli.plot {
        settings.search.plot_path = path;
    }

    let dataset = load_dataset(&settings.dataset.dataset_path, settings.dataset.drop_na)?;
    info!(
        "Loaded {} entities with {} features from {}",
        dataset.ids.len(),
        dataset.feature_columns.len(),
        settings.dataset.dataset_path.display()
    );

    let (_, standardized) = StandardScaler::fit_transform(&dataset.features.view())?;
    let (_, reduced) =
        Pca::fit_transform(&standardized.view(), settings.preprocessing.pca_components)?;

    if settings.find_clusters {
        let range = CandidateRange::new(settings.search.k_min, settings.search.k_max)?;
        let opts = EvaluationOptions {
            seed: settings.search.seed,
            verbose: settings.search.verbose,
            gmm: GmmOptions::default(),
            silhouette_cap: settings.search.silhouette_cap,
        };
        let records =
            find_n_clusters(&reduced.view(), range, &opts, Some(&settings.search.plot_path))?;
        for record in &records {
            info!(
                "k={}: AIC={:.3} BIC={:.3} silhouette={:.4} converged={}",
                record.k, record.aic, record.bic, record.silhouette, record.converged
            );
        }
        info!("Score plot written to {}", settings.search.plot_path.display());
    } else {
        let assignment = cluster_entities(
            &reduced.view(),
            settings.clustering.n_clusters,
            settings.clustering.seed,
            GmmOptions::default(),
        )?;
        save_dataset(&dataset, &reduced.view(), &assignment, &settings.dataset.save_path)?;
        info!("Result table written to {}", settings.dataset.save_path.display());
    }

    Ok(())
}
