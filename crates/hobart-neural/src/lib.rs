#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod network;

pub use network::NeuralNetwork;

use thiserror::Error;

/// Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors that can occur when building or running a network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// A vector does not match the fixed topology
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Length required by the topology
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// The requested layer sizes cannot form a network
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
}
