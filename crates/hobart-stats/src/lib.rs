#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod robust;

pub use robust::{RobustStatistic, TrimConfig};

use thiserror::Error;

/// Result type for statistic construction.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors that can occur while summarizing a sample.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// Too few values survived outlier trimming to estimate a variance
    #[error("Insufficient sample: {retained} of {sample} values retained after trimming, need at least 2")]
    InsufficientSample {
        /// Values left after trimming
        retained: usize,
        /// Values supplied
        sample: usize,
    },

    /// The sample contained NaN or an infinity
    #[error("Non-finite value at index {index}")]
    NonFinite {
        /// Position of the offending value
        index: usize,
    },

    /// A trimming parameter is unusable
    #[error("Invalid trim configuration: {0}")]
    InvalidConfig(String),
}
