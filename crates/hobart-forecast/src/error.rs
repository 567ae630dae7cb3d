//! Error types for forecasting.

use hobart_data::DataError;
use hobart_neural::NetworkError;
use hobart_stats::StatsError;
use thiserror::Error;

/// Result type for forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while training or running a forecast.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A column statistic could not be estimated
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    /// The network rejected its input
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Loading filings failed
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Model (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A vector does not have the expected length
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// No column statistics were supplied
    #[error("At least one column is required")]
    NoColumns,

    /// The model was produced by an earlier training call
    #[error("Stale model: engine is at version {expected}, model is version {actual}")]
    StaleModel {
        /// Current engine version
        expected: u64,
        /// Version of the supplied model
        actual: u64,
    },

    /// The model was produced by a different engine
    #[error("Foreign model: engine {expected:#x} cannot use a model from engine {actual:#x}")]
    ForeignModel {
        /// Identifier of this engine
        expected: u64,
        /// Engine identifier stamped on the model
        actual: u64,
    },

    /// Invalid configuration or argument
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
