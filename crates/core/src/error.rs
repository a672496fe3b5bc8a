//! Error types for geoseries

use thiserror::Error;

/// Main error type for geoseries operations
///
/// Every variant except [`Error::Cancelled`] is a configuration error: it is
/// raised while an operation is being prepared, before any cell is written.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Not enough bands: need at least {required}, got {actual}")]
    InsufficientBands { required: usize, actual: usize },

    #[error("Wrong domain: expected {expected}, got {actual}")]
    DomainMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Duplicate feature id: {0}")]
    DuplicateFeatureId(u64),

    #[error("Unknown attribute column: {0}")]
    UnknownColumn(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for geoseries operations
pub type Result<T> = std::result::Result<T, Error>;
