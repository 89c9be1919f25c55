//! Typed failures raised by the preprocessing pipeline.
//!
//! Public functions return `anyhow::Result`; the variants below are what ends up inside the
//! `anyhow::Error` for every validation failure, so callers that care can recover them with
//! `err.downcast_ref::<PreprocessError>()`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
    /// A matrix with no rows or no columns was handed to a transform.
    #[error("Matrix is empty ({rows} x {cols})")]
    EmptyMatrix { rows: usize, cols: usize },

    /// A feature is zero in every observation, so its inverse document frequency is undefined.
    #[error("Feature {feature} has zero document frequency (all-zero column); filter it out or use ZeroFrequencyPolicy::ZeroWeight")]
    ZeroFrequencyFeature { feature: usize },

    #[error("Negative count {value} at ({row}, {col}); document frequency requires non-negative counts")]
    NegativeCount { row: usize, col: usize, value: f64 },

    #[error("Number of components must be at least 1")]
    InvalidComponents,

    #[error("Requested {requested} components but at most {available} are available")]
    TooManyComponents { requested: usize, available: usize },

    #[error("SVD did not converge for a {rows} x {cols} matrix")]
    SvdNotConverged { rows: usize, cols: usize },

    #[error("Model has not been fitted yet")]
    NotFitted,

    /// The two modalities disagree on the number of cells.
    #[error("Row count mismatch: accessibility matrix has {accessibility} cells, expression matrix has {expression}")]
    RowCountMismatch {
        accessibility: usize,
        expression: usize,
    },

    #[error("Index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: i128, len: usize },

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Numeric conversion failed for value at ({row}, {col})")]
    NumericConversion { row: usize, col: usize },

    /// NaN or an infinity in an input matrix; no decomposition is attempted on such data.
    #[error("Non-finite value at ({row}, {col})")]
    NonFinite { row: usize, col: usize },
}
