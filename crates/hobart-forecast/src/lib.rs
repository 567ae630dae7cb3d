#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod growth;
pub mod interpolate;
pub mod valuation;

pub use config::ForecastConfig;
pub use engine::{
    ForecastEngine, ModelVersion, TrainedForecast, TrainingOutcome, select_input_quantities,
};
pub use error::{ForecastError, Result};
pub use growth::{GrowthVector, GrowthVectorBuilder};
pub use interpolate::Interpolator;
pub use valuation::{CASH_FLOW_QUANTITIES, CashFlowBase, CashFlowProjection, project_cash_flow};
