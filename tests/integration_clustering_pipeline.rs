//! Integration tests for the entity-clustering pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end flow: from a raw CSV feature table, through
//!   standardization and PCA reduction, to the model-selection search and
//!   the final clustering with persisted results.
//! - Exercise a realistic separable scenario (four blobs in three
//!   dimensions) rather than toy edge cases only.
//!
//! Coverage
//! --------
//! - `dataset::load` / `dataset::save`:
//!   - CSV load with headers and id alignment; result-table layout on save.
//! - `preprocessing`:
//!   - `StandardScaler` and `Pca` chained on loaded data.
//! - `clustering::search::find_n_clusters`:
//!   - Full sorted score series over a candidate range.
//! - `clustering::assign::cluster_entities`:
//!   - Hard labels plus posterior distributions at a chosen count.
//!
//! Exclusions
//! ----------
//! - Fine-grained validation of individual stages (missing-value policy,
//!   eigensolver behavior, EM internals); these are covered by unit tests.
//! - Plot rasterization; the search is run without a plot target because
//!   chart output depends on the environment's font stack.

use std::io::Write;

use ndarray::Array2;

use chainclust::clustering::{
    cluster_entities, find_n_clusters, CandidateRange, EvaluationOptions, GmmOptions,
};
use chainclust::dataset::{load_dataset, save_dataset};
use chainclust::preprocessing::{Pca, StandardScaler};

/// Four well-separated blobs in three dimensions, 150 rows total, with
/// small deterministic jitter so no two rows coincide.
fn scenario_matrix() -> Array2<f64> {
    let centers = [(0.0, 0.0, 0.0), (15.0, 0.0, 0.0), (0.0, 15.0, 0.0), (0.0, 0.0, 15.0)];
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

/// Write the scenario matrix as a headed CSV with an entity-id column.
fn write_scenario_csv(file: &mut tempfile::NamedTempFile) {
    let x = scenario_matrix();
    writeln!(file, "ENTITY_ID,F1,F2,F3").expect("write header");
    for (i, row) in x.rows().into_iter().enumerate() {
        writeln!(file, "{},{},{},{}", 1000 + i as i64, row[0], row[1], row[2])
            .expect("write row");
    }
    file.flush().expect("flush");
}

#[test]
// Purpose
// -------
// Run the model-selection path end to end on loaded CSV data: the range
// (2, 6) must yield four records in ascending-k order with finite
// criteria, and the separable scenario must score a strong silhouette at
// the true count of four.
fn search_path_scores_candidates_from_csv() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write_scenario_csv(&mut file);

    let dataset = load_dataset(file.path(), true).expect("load succeeds");
    assert_eq!(dataset.ids.len(), 150);
    assert_eq!(dataset.feature_columns, vec!["F1", "F2", "F3"]);

    let (_, standardized) =
        StandardScaler::fit_transform(&dataset.features.view()).expect("scaling succeeds");
    let (_, reduced) = Pca::fit_transform(&standardized.view(), 3).expect("pca succeeds");

    let range = CandidateRange::new(2, 6).expect("valid range");
    let opts = EvaluationOptions::default();
    let records = find_n_clusters(&reduced.view(), range, &opts, None).expect("search succeeds");

    assert_eq!(records.iter().map(|r| r.k).collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    for r in &records {
        assert!(r.aic.is_finite());
        assert!(r.bic.is_finite());
        assert!((-1.0..=1.0).contains(&r.silhouette));
    }
    let at_four = records.iter().find(|r| r.k == 4).expect("k=4 present");
    assert!(
        at_four.silhouette > 0.8,
        "separable scenario must score a strong silhouette at the true count"
    );
}

#[test]
// Purpose
// -------
// Run the final-clustering path end to end: load, standardize, reduce,
// cluster at k = 4, persist, and check the saved table's layout and row
// alignment against the input.
fn clustering_path_persists_aligned_result_table() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write_scenario_csv(&mut file);

    let dataset = load_dataset(file.path(), true).expect("load succeeds");
    let (_, standardized) =
        StandardScaler::fit_transform(&dataset.features.view()).expect("scaling succeeds");
    let (_, reduced) = Pca::fit_transform(&standardized.view(), 3).expect("pca succeeds");

    let assignment = cluster_entities(&reduced.view(), 4, 0, GmmOptions::default())
        .expect("clustering succeeds");
    assert_eq!(assignment.labels.len(), 150);
    assert!(assignment.labels.iter().all(|&l| l < 4));
    for row in assignment.posteriors.rows() {
        let total: f64 = row.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }
    let populations = assignment.population_counts();
    assert_eq!(populations.iter().sum::<usize>(), 150);
    assert!(populations.iter().all(|&c| c > 0), "every component should claim entities");

    let out = tempfile::NamedTempFile::new().expect("output file");
    save_dataset(&dataset, &reduced.view(), &assignment, out.path()).expect("save succeeds");

    let contents = std::fs::read_to_string(out.path()).expect("read back");
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().expect("header"),
        "ENTITY_ID,F1,F2,F3,PC1,PC2,PC3,CLUSTER,Cluster_1,Cluster_2,Cluster_3,Cluster_4"
    );
    assert_eq!(lines.count(), 150);
    // First data row starts with the first entity id, so row order survived
    // the whole pipeline.
    let first_row = contents.lines().nth(1).expect("first data row");
    assert!(first_row.starts_with("1000,"));
}

#[test]
// Purpose
// -------
// Verify determinism across the whole pipeline: identical CSV input and
// seeds give identical labels and posteriors.
fn pipeline_is_deterministic_for_fixed_seed() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write_scenario_csv(&mut file);

    let run = || {
        let dataset = load_dataset(file.path(), true).expect("load succeeds");
        let (_, standardized) =
            StandardScaler::fit_transform(&dataset.features.view()).expect("scaling succeeds");
        let (_, reduced) = Pca::fit_transform(&standardized.view(), 3).expect("pca succeeds");
        cluster_entities(&reduced.view(), 4, 7, GmmOptions::default())
            .expect("clustering succeeds")
    };

    let a = run();
    let b = run();

    assert_eq!(a.labels, b.labels);
    assert_eq!(a.posteriors, b.posteriors);
}
