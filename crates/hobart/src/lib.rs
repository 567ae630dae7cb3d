#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export main types from sub-crates
pub use hobart_data as data;
pub use hobart_forecast as forecast;
pub use hobart_neural as neural;
pub use hobart_stats as stats;

// Re-export the types most callers need
pub use hobart_data::{FilingQuery, FilingStore, MemoryStore, SqliteStore};
pub use hobart_forecast::{ForecastConfig, ForecastEngine, TrainedForecast};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
