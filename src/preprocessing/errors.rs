//! Errors for feature scaling and dimensionality reduction.

/// Result alias for preprocessing operations that may produce
/// [`PreprocessingError`].
pub type PreprocessingResult<T> = Result<T, PreprocessingError>;

/// Unified error type for scaling and PCA.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// The feature matrix has no rows or no columns.
    EmptyMatrix,

    /// Too few rows to estimate variances (need at least 2).
    InsufficientSamples { n: usize },

    /// A matrix entry is NaN/±inf.
    NonFiniteValue { row: usize, col: usize, value: f64 },

    /// Requested component count is 0 or exceeds the feature count.
    InvalidComponentCount { requested: usize, available: usize },

    /// The covariance eigendecomposition did not converge.
    EigenFailure,

    /// Transform input has a different feature count than the fit.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::error::Error for PreprocessingError {}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::EmptyMatrix => {
                write!(f, "Feature matrix is empty.")
            }
            PreprocessingError::InsufficientSamples { n } => {
                write!(f, "Need at least 2 samples to estimate variances; got {n}.")
            }
            PreprocessingError::NonFiniteValue { row, col, value } => {
                write!(f, "Matrix entry at ({row}, {col}) is non-finite: {value}")
            }
            PreprocessingError::InvalidComponentCount { requested, available } => {
                write!(
                    f,
                    "Requested {requested} principal components; must be in 1..={available}."
                )
            }
            PreprocessingError::EigenFailure => {
                write!(f, "Covariance eigendecomposition did not converge.")
            }
            PreprocessingError::DimensionMismatch { expected, actual } => {
                write!(f, "Transform input has {actual} features; the fit used {expected}.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify that the component-count error echoes both the request and the
    // available feature count.
    fn invalid_component_count_display_echoes_bounds() {
        let err = PreprocessingError::InvalidComponentCount { requested: 9, available: 6 };

        let msg = err.to_string();

        assert!(msg.contains('9'));
        assert!(msg.contains("1..=6"));
    }
}
