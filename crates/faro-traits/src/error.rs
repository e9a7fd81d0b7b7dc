//! Error types for the Faro toolkit.
//!
//! Every fallible operation in the workspace returns [`FaroError`]. Missing
//! data is never an error: incomplete rows are dropped by the pipeline, so the
//! variants below describe configuration and input-shape problems only.

use thiserror::Error;

/// The main error type for Faro operations.
#[derive(Debug, Error)]
pub enum FaroError {
    /// Invalid or contradictory configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The factor and the price panel carry different time zones.
    #[error(
        "The timezone of 'factor' ({factor}) is not the same as the timezone of 'prices' \
         ({prices}). Convert both inputs to the same timezone before calling."
    )]
    TimezoneMismatch {
        /// Time zone of the factor's date axis.
        factor: String,
        /// Time zone of the price panel's date axis.
        prices: String,
    },

    /// Assets referenced by the factor have no entry in the group mapping.
    #[error("Assets {0:?} not in group mapping")]
    MissingGroupAssets(Vec<String>),

    /// Group codes have no entry in the display label mapping.
    #[error("Groups {0:?} not in passed group names")]
    MissingGroupLabels(Vec<String>),

    /// Bucket edges collided, usually because of heavily tied factor values.
    #[error("Bin edges must be unique: {edges:?}")]
    NonUniqueBinEdges {
        /// The computed (non-unique) edges.
        edges: Vec<f64>,
    },

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Error from ndarray shape construction.
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl FaroError {
    /// Returns true for the degenerate-bucketing error raised when bucket
    /// edges collide.
    pub const fn is_non_unique_bin_edges(&self) -> bool {
        matches!(self, Self::NonUniqueBinEdges { .. })
    }
}

impl From<String> for FaroError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for FaroError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for Faro operations.
pub type Result<T> = std::result::Result<T, FaroError>;
