//! Result persistence — one flat CSV record per entity.
//!
//! Purpose
//! -------
//! Write the final clustering output in the shape the result sink expects:
//! for each entity, its id, the original features, the reduced coordinates
//! (`PC1..PCp`), the hard label (`CLUSTER`), and the full posterior vector
//! (`Cluster_1..Cluster_k`). Row order equals input order, so the file
//! stays aligned with the source dataset.
//!
//! Key behaviors
//! -------------
//! - Refuse to write anything when the ids, features, reduced coordinates,
//!   and assignment disagree on the entity count; a half-aligned file is
//!   worse than no file.
//! - Column naming follows the established schema: `PC{i}` 1-based for
//!   reduced coordinates, `Cluster_{i}` 1-based for posterior columns.

use std::path::Path;

use log::info;
use ndarray::ArrayView2;

use crate::clustering::ClusterAssignment;
use crate::dataset::errors::{DatasetError, DatasetResult};
use crate::dataset::load::Dataset;

/// Write the merged result table to `path`.
///
/// Parameters
/// ----------
/// - `dataset`: ids, original features, and column names from the load.
/// - `reduced`: `n x p` reduced coordinates, row-aligned with the dataset.
/// - `assignment`: labels and posteriors from the final clusterer.
/// - `path`: output CSV target.
///
/// Errors
/// ------
/// - `DatasetError::ShapeMismatch` when any input disagrees on the entity
///   count.
/// - `DatasetError::Io` for file failures.
pub fn save_dataset(
    dataset: &Dataset, reduced: &ArrayView2<'_, f64>, assignment: &ClusterAssignment,
    path: &Path,
) -> DatasetResult<()> {
    let n = dataset.len();
    if reduced.nrows() != n {
        return Err(DatasetError::ShapeMismatch {
            what: "reduced matrix",
            expected: n,
            actual: reduced.nrows(),
        });
    }
    if assignment.len() != n {
        return Err(DatasetError::ShapeMismatch {
            what: "cluster assignment",
            expected: n,
            actual: assignment.len(),
        });
    }

    let io_err = |reason: String| DatasetError::Io {
        path: path.display().to_string(),
        reason,
    };

    let p = reduced.ncols();
    let k = assignment.n_clusters();

    let mut writer = csv::Writer::from_path(path).map_err(|e| io_err(e.to_string()))?;

    let mut header: Vec<String> = Vec::with_capacity(1 + dataset.feature_columns.len() + p + 1 + k);
    header.push(dataset.id_column.clone());
    header.extend(dataset.feature_columns.iter().cloned());
    header.extend((1..=p).map(|i| format!("PC{i}")));
    header.push("CLUSTER".to_string());
    header.extend((1..=k).map(|i| format!("Cluster_{i}")));
    writer.write_record(&header).map_err(|e| io_err(e.to_string()))?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for i in 0..n {
        record.clear();
        record.push(dataset.ids[i].to_string());
        record.extend(dataset.features.row(i).iter().map(|v| v.to_string()));
        record.extend(reduced.row(i).iter().map(|v| v.to_string()));
        record.push(assignment.labels[i].to_string());
        record.extend(assignment.posteriors.row(i).iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| io_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| io_err(e.to_string()))?;

    info!("Result table with {n} entities and {k} posterior columns saved to {}", path.display());
    Ok(())
}
