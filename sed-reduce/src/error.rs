//! Error types for SED stack reductions.
//!
//! Every variant except the I/O and serialization ones describes a caller
//! buffer or parameter that was rejected before any computation started.
//! Degenerate-but-valid outcomes (no pixel above threshold, an empty
//! azimuthal bin) are never reported here; they are encoded in the result
//! arrays instead.

use thiserror::Error;

/// Errors raised by the reduction entry points.
#[derive(Error, Debug)]
pub enum ReduceError {
    #[error("Input must be a {expected}D array, got {actual}D")]
    WrongRank { expected: usize, actual: usize },

    #[error("Input array must be C-contiguous (row-major standard layout)")]
    NonContiguous,

    #[error("Input array has an empty dimension: shape {0:?}")]
    EmptyDimension(Vec<usize>),

    #[error("Geometry table is {geometry} but images are {images}")]
    GeometryMismatch { geometry: String, images: String },

    #[error("Geometry table has {geometry} bins but {requested} were requested")]
    BinCountMismatch { geometry: usize, requested: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Trim window for image {image} centred at ({row}, {col}) with radius {radius} falls outside the {height}x{width} detector")]
    TrimOutOfBounds {
        image: usize,
        row: f64,
        col: f64,
        radius: usize,
        height: usize,
        width: usize,
    },

    #[error("Invalid scan: {0}")]
    InvalidScan(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ReduceError {
    /// True for errors caused by a rejected input buffer or shape.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ReduceError::WrongRank { .. }
                | ReduceError::NonContiguous
                | ReduceError::EmptyDimension(_)
                | ReduceError::GeometryMismatch { .. }
                | ReduceError::BinCountMismatch { .. }
                | ReduceError::ShapeMismatch(_)
                | ReduceError::TrimOutOfBounds { .. }
                | ReduceError::InvalidScan(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReduceError>;
