//! Forecast engine configuration

use crate::{ForecastError, Result};
use hobart_stats::TrimConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Forecast engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Hidden layer sizes of every output network (default: `[10]`)
    pub hidden_layers: Vec<usize>,

    /// Backpropagation step size (default: 1.0)
    pub learning_rate: f64,

    /// Standard scores beyond this magnitude mark a training pair as
    /// unreliable; also scales network targets onto the sigmoid range
    /// (default: 2.2)
    pub max_deviations: f64,

    /// Passes over the surviving training pairs per `train` call (default: 1)
    pub epochs: usize,

    /// Seed for initial network weights; entropy when absent (default: None)
    pub seed: Option<u64>,

    /// Outlier trimming for column statistics
    pub trim: TrimConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![10],
            learning_rate: 1.0,
            max_deviations: 2.2,
            epochs: 1,
            seed: None,
            trim: TrimConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ForecastError::InvalidConfig(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is usable.
    ///
    /// # Errors
    /// Returns [`ForecastError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.contains(&0) {
            return Err(ForecastError::InvalidConfig(
                "hidden layers must have at least one node".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.max_deviations.is_finite() && self.max_deviations > 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "max deviations must be positive, got {}",
                self.max_deviations
            )));
        }
        if self.epochs == 0 {
            return Err(ForecastError::InvalidConfig(
                "epochs must be at least 1".to_string(),
            ));
        }
        self.trim
            .validate()
            .map_err(|e| ForecastError::InvalidConfig(e.to_string()))
    }
}
