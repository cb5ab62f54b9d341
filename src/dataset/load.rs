//! Entity-feature dataset loading from headed CSV.
//!
//! Purpose
//! -------
//! Read the tabular entity-feature source into the in-memory form the rest
//! of the pipeline works on: an entity-id vector and an `n x d` feature
//! matrix, row-aligned, plus the column names needed to write results back
//! out. The first column is the entity id; every remaining column is a
//! numeric feature.
//!
//! Key behaviors
//! -------------
//! - Apply the drop-NA policy at load time: rows with missing or
//!   unparseable-as-missing values are either dropped (`drop_na = true`) or
//!   fail the load with the row and column named.
//! - Preserve file row order; the id vector and the feature matrix never
//!   diverge after load, and no row is reordered except together with its
//!   id.
//!
//! Invariants & assumptions
//! ------------------------
//! - The file has a header line; the id column parses as an integer; the
//!   feature columns parse as finite floats.
//! - Malformed values that are not missing markers are an error regardless
//!   of the drop-NA policy.

use std::path::Path;

use log::info;
use ndarray::Array2;

use crate::dataset::errors::{DatasetError, DatasetResult};

/// Row-aligned entity ids and features, plus the header names.
///
/// `ids.len() == features.nrows()` always holds; the loader refuses to
/// produce anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Entity identifiers, one per row, in file order.
    pub ids: Vec<i64>,
    /// Feature matrix, `n x d`, row-aligned with `ids`.
    pub features: Array2<f64>,
    /// Header name of the id column.
    pub id_column: String,
    /// Header names of the feature columns, length `d`.
    pub feature_columns: Vec<String>,
}

impl Dataset {
    /// Number of entities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the dataset holds no entities.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Markers treated as a missing value in any field.
fn is_missing(field: &str) -> bool {
    let trimmed = field.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
}

/// Load a headed CSV into a [`Dataset`].
///
/// Parameters
/// ----------
/// - `path`: CSV file with a header line; first column is the entity id.
/// - `drop_na`: drop rows containing missing values instead of failing.
///
/// Returns
/// -------
/// `DatasetResult<Dataset>` with ids and features row-aligned in file
/// order.
///
/// Errors
/// ------
/// - `DatasetError::Io` for file or CSV-level failures.
/// - `DatasetError::NoFeatureColumns` / `EmptyDataset` for structural
///   problems.
/// - `DatasetError::MissingValue` when a value is missing and `drop_na` is
///   disabled.
/// - `DatasetError::ParseField` for non-numeric, non-missing fields.
pub fn load_dataset(path: &Path, drop_na: bool) -> DatasetResult<Dataset> {
    let io_err = |reason: String| DatasetError::Io {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        // Let ragged rows through the transport layer so they can be
        // reported with row context below.
        .flexible(true)
        .from_path(path)
        .map_err(|e| io_err(e.to_string()))?;

    let headers = reader.headers().map_err(|e| io_err(e.to_string()))?.clone();
    if headers.len() < 2 {
        return Err(DatasetError::NoFeatureColumns { path: path.display().to_string() });
    }
    let id_column = headers[0].to_string();
    let feature_columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let d = feature_columns.len();

    let mut ids = Vec::new();
    let mut flat = Vec::new();
    let mut dropped = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| io_err(e.to_string()))?;
        if record.len() != headers.len() {
            return Err(DatasetError::RowLengthMismatch {
                row,
                expected: headers.len(),
                actual: record.len(),
            });
        }

        match parse_row(&record, row, &id_column, &feature_columns)? {
            Some((id, values)) => {
                ids.push(id);
                flat.extend(values);
            }
            None => {
                if drop_na {
                    dropped += 1;
                } else {
                    let column = first_missing_column(&record, &id_column, &feature_columns);
                    return Err(DatasetError::MissingValue { row, column });
                }
            }
        }
    }

    if ids.is_empty() {
        return Err(DatasetError::EmptyDataset { path: path.display().to_string() });
    }

    let n = ids.len();
    let features = Array2::from_shape_vec((n, d), flat)
        .map_err(|e| io_err(e.to_string()))?;

    info!(
        "Loaded {} entities with {} features from {} ({} rows dropped)",
        n,
        d,
        path.display(),
        dropped
    );

    Ok(Dataset { ids, features, id_column, feature_columns })
}

/// Parse one record; `Ok(None)` signals a row with missing values, which
/// the caller resolves against the drop-NA policy.
fn parse_row(
    record: &csv::StringRecord, row: usize, id_column: &str, feature_columns: &[String],
) -> DatasetResult<Option<(i64, Vec<f64>)>> {
    let id_field = &record[0];
    if is_missing(id_field) {
        return Ok(None);
    }
    let id: i64 = id_field.trim().parse().map_err(|_| DatasetError::ParseField {
        row,
        column: id_column.to_string(),
        value: id_field.to_string(),
    })?;

    let mut values = Vec::with_capacity(feature_columns.len());
    for (col, field) in record.iter().skip(1).enumerate() {
        if is_missing(field) {
            return Ok(None);
        }
        let value: f64 = field.trim().parse().map_err(|_| DatasetError::ParseField {
            row,
            column: feature_columns[col].clone(),
            value: field.to_string(),
        })?;
        if !value.is_finite() {
            // Parsed infinities behave like missing values.
            return Ok(None);
        }
        values.push(value);
    }
    Ok(Some((id, values)))
}

/// Name of the first missing field in a record, for the error message.
fn first_missing_column(
    record: &csv::StringRecord, id_column: &str, feature_columns: &[String],
) -> String {
    if is_missing(&record[0]) {
        return id_column.to_string();
    }
    for (col, field) in record.iter().skip(1).enumerate() {
        if is_missing(field) {
            return feature_columns[col].clone();
        }
    }
    // Row was rejected for a non-finite parsed value; attribute it broadly.
    "<non-finite value>".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Round-tripping a small headed CSV into ids + features.
    // - The drop-NA policy in both modes.
    // - Structural and parse failures with row/column context.
    // -------------------------------------------------------------------------

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    // Purpose
    // -------
    // Verify that a well-formed file loads with ids and features aligned in
    // file order and header names preserved.
    fn load_dataset_aligns_ids_and_features() {
        let file = write_csv(
            "ENTITY_ID,TOTAL_BTC_RECEIVED,TOTAL_BTC_SPENT\n1,0.5,0.25\n2,1.5,1.25\n3,2.5,2.25\n",
        );

        let dataset = load_dataset(file.path(), true).expect("load succeeds");

        assert_eq!(dataset.ids, vec![1, 2, 3]);
        assert_eq!(dataset.features.nrows(), 3);
        assert_eq!(dataset.features.ncols(), 2);
        assert_eq!(dataset.features[[1, 0]], 1.5);
        assert_eq!(dataset.id_column, "ENTITY_ID");
        assert_eq!(dataset.feature_columns, vec!["TOTAL_BTC_RECEIVED", "TOTAL_BTC_SPENT"]);
    }

    #[test]
    // Purpose
    // -------
    // Verify the drop-NA policy: with drop_na the affected row disappears
    // and alignment survives; without it the load fails naming the column.
    fn load_dataset_applies_drop_na_policy() {
        let contents = "ID,A,B\n1,0.5,0.25\n2,,0.5\n3,2.5,2.25\n";

        let dropped = load_dataset(write_csv(contents).path(), true).expect("load succeeds");
        assert_eq!(dropped.ids, vec![1, 3]);
        assert_eq!(dropped.features.nrows(), 2);
        assert_eq!(dropped.features[[1, 1]], 2.25);

        let err = load_dataset(write_csv(contents).path(), false).unwrap_err();
        match err {
            DatasetError::MissingValue { row, column } => {
                assert_eq!(row, 1);
                assert_eq!(column, "A");
            }
            other => panic!("expected MissingValue, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that non-numeric feature fields fail with the offending value
    // regardless of the drop-NA policy.
    fn load_dataset_rejects_unparseable_fields() {
        let file = write_csv("ID,A\n1,0.5\n2,bogus\n");

        let err = load_dataset(file.path(), true).unwrap_err();

        match err {
            DatasetError::ParseField { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "A");
                assert_eq!(value, "bogus");
            }
            other => panic!("expected ParseField, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify structural failures: id-only headers and files where every row
    // is dropped.
    fn load_dataset_rejects_degenerate_files() {
        let no_features = write_csv("ID\n1\n2\n");
        assert!(matches!(
            load_dataset(no_features.path(), true),
            Err(DatasetError::NoFeatureColumns { .. })
        ));

        let all_missing = write_csv("ID,A\n1,\n2,nan\n");
        assert!(matches!(
            load_dataset(all_missing.path(), true),
            Err(DatasetError::EmptyDataset { .. })
        ));
    }
}
