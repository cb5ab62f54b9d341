//! Errors for dataset I/O (CSV load, result save, shape/alignment checks).
//!
//! ## Conventions
//! - Row indices are 0-based and count data rows, not the header line.
//! - Missing-value handling is the loader's responsibility: with
//!   `drop_na = true` affected rows are dropped, otherwise loading fails
//!   with [`DatasetError::MissingValue`] naming the row and column.

/// Result alias for dataset operations that may produce [`DatasetError`].
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Unified error type for dataset load/save.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    // ---- File / CSV transport ----
    /// Underlying file or CSV-level failure.
    Io { path: String, reason: String },

    // ---- Structure ----
    /// The file contains a header but no data rows (or none survived the
    /// drop-NA policy).
    EmptyDataset { path: String },

    /// The file has an id column but no feature columns.
    NoFeatureColumns { path: String },

    /// A data row has a different field count than the header.
    RowLengthMismatch { row: usize, expected: usize, actual: usize },

    // ---- Values ----
    /// A required value is missing and `drop_na` is disabled.
    MissingValue { row: usize, column: String },

    /// A field could not be parsed as the expected numeric type.
    ParseField { row: usize, column: String, value: String },

    // ---- Save-side alignment ----
    /// Arrays handed to the saver disagree on the entity count.
    ShapeMismatch { what: &'static str, expected: usize, actual: usize },
}

impl std::error::Error for DatasetError {}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Io { path, reason } => {
                write!(f, "I/O failure on {path}: {reason}")
            }
            DatasetError::EmptyDataset { path } => {
                write!(f, "Dataset at {path} has no usable data rows.")
            }
            DatasetError::NoFeatureColumns { path } => {
                write!(f, "Dataset at {path} has no feature columns after the id column.")
            }
            DatasetError::RowLengthMismatch { row, expected, actual } => {
                write!(f, "Row {row} has {actual} fields; header declares {expected}.")
            }
            DatasetError::MissingValue { row, column } => {
                write!(f, "Missing value at row {row}, column {column} (drop_na is disabled).")
            }
            DatasetError::ParseField { row, column, value } => {
                write!(f, "Cannot parse {value:?} at row {row}, column {column} as a number.")
            }
            DatasetError::ShapeMismatch { what, expected, actual } => {
                write!(f, "{what} has {actual} rows; expected {expected} to match the entity ids.")
            }
        }
    }
}
