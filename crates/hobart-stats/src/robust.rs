//! Outlier-trimmed summary statistics
//!
//! Growth ratios computed from filings are heavy tailed: a restated line item
//! or a near-zero prior value easily produces growth factors in the hundreds.
//! [`RobustStatistic`] discards values outside an interquartile fence before
//! estimating the moments, so a handful of such values cannot dominate the
//! mean or blow up the standard deviation.
//!
//! The fence is `[Q1 - k * IQR, Q3 + k * IQR]` with `k = 1.8` by default,
//! slightly wider than Tukey's 1.5.

use crate::{Result, StatsError};
use serde::{Deserialize, Serialize};

/// z-value of a two-sided 95% confidence interval
const Z_95: f64 = 1.96;

/// Configuration for outlier trimming
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// IQR multiple defining the outlier fence (default: 1.8)
    pub fence_multiplier: f64,

    /// Standard deviation substituted when the retained sample has no spread
    /// (default: 1e-9)
    pub min_stdev: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            fence_multiplier: 1.8,
            min_stdev: 1e-9,
        }
    }
}

/// Trimmed mean and standard deviation of a sample, with the transforms
/// needed to move values in and out of standard-score space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustStatistic {
    mean: f64,
    stdev: f64,
    skewness: f64,
    kurtosis: f64,
    margin_of_error: f64,
    len: usize,
    lower_fence: f64,
    upper_fence: f64,
}

impl TrimConfig {
    /// Check that both parameters are usable.
    ///
    /// # Errors
    /// Returns [`StatsError::InvalidConfig`] unless the fence multiplier is
    /// finite and non-negative and the stdev floor is finite and positive.
    pub fn validate(&self) -> Result<()> {
        if !(self.fence_multiplier.is_finite() && self.fence_multiplier >= 0.0) {
            return Err(StatsError::InvalidConfig(format!(
                "fence multiplier must be non-negative, got {}",
                self.fence_multiplier
            )));
        }
        if !(self.min_stdev.is_finite() && self.min_stdev > 0.0) {
            return Err(StatsError::InvalidConfig(format!(
                "minimum stdev must be positive, got {}",
                self.min_stdev
            )));
        }
        Ok(())
    }
}

impl RobustStatistic {
    /// Summarize `values` with the default trimming configuration.
    ///
    /// # Errors
    /// Returns [`StatsError::InsufficientSample`] when fewer than two values
    /// survive trimming and [`StatsError::NonFinite`] when the sample holds
    /// NaN or an infinity.
    pub fn new(values: &[f64]) -> Result<Self> {
        Self::with_config(values, &TrimConfig::default())
    }

    /// Summarize `values` with a custom trimming configuration.
    ///
    /// # Errors
    /// As [`RobustStatistic::new`], plus [`StatsError::InvalidConfig`] when
    /// `config` fails [`TrimConfig::validate`].
    pub fn with_config(values: &[f64], config: &TrimConfig) -> Result<Self> {
        config.validate()?;
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(StatsError::NonFinite { index });
        }
        if values.is_empty() {
            return Err(StatsError::InsufficientSample {
                retained: 0,
                sample: 0,
            });
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let q1 = sorted[n / 4];
        let q3 = sorted[3 * n / 4];
        let iqr = q3 - q1;
        let lower_fence = q1 - config.fence_multiplier * iqr;
        let upper_fence = q3 + config.fence_multiplier * iqr;

        let retained: Vec<f64> = values
            .iter()
            .copied()
            .filter(|&v| v >= lower_fence && v <= upper_fence)
            .collect();

        let len = retained.len();
        if len < 2 {
            return Err(StatsError::InsufficientSample {
                retained: len,
                sample: n,
            });
        }

        let mean = central_moment(&retained, 0.0, 1);
        let bias = len as f64 / (len as f64 - 1.0);

        let mut stdev = (central_moment(&retained, mean, 2) * bias).sqrt();
        if stdev <= config.min_stdev {
            stdev = config.min_stdev;
        }

        let skewness = central_moment(&retained, mean, 3) * bias / stdev.powi(3);
        let kurtosis = central_moment(&retained, mean, 4) / stdev.powi(4);
        let margin_of_error = Z_95 * stdev / (len as f64).sqrt();

        Ok(Self {
            mean,
            stdev,
            skewness,
            kurtosis,
            margin_of_error,
            len,
            lower_fence,
            upper_fence,
        })
    }

    /// Trimmed mean
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Trimmed, bias-corrected standard deviation (never zero)
    pub const fn stdev(&self) -> f64 {
        self.stdev
    }

    /// Sample skewness of the retained values
    pub const fn skewness(&self) -> f64 {
        self.skewness
    }

    /// Kurtosis of the retained values (not excess kurtosis)
    pub const fn kurtosis(&self) -> f64 {
        self.kurtosis
    }

    /// Half-width of the 95% confidence interval of the mean
    pub const fn margin_of_error(&self) -> f64 {
        self.margin_of_error
    }

    /// Number of values retained after trimming
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no values were retained
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inclusive bounds of the outlier fence
    pub const fn fence(&self) -> (f64, f64) {
        (self.lower_fence, self.upper_fence)
    }

    /// Whether `value` lies inside the outlier fence
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_fence && value <= self.upper_fence
    }

    /// Convert a raw value into a standard score
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.mean) / self.stdev
    }

    /// Convert a standard score back into a raw value
    pub fn denormalize(&self, score: f64) -> f64 {
        score * self.stdev + self.mean
    }
}

fn central_moment(values: &[f64], mean: f64, moment: i32) -> f64 {
    values.iter().map(|v| (v - mean).powi(moment)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_skewed_sample_trims_outlier() {
        let stat = RobustStatistic::new(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();

        // Q1 = 2, Q3 = 4, IQR = 2 -> fence [-1.6, 7.6]
        let (lo, hi) = stat.fence();
        assert_relative_eq!(lo, -1.6, epsilon = 1e-12);
        assert_relative_eq!(hi, 7.6, epsilon = 1e-12);
        assert!(!stat.contains(100.0));

        assert_eq!(stat.len(), 4);
        assert_relative_eq!(stat.mean(), 2.5, epsilon = 1e-12);
        // Sample variance of [1,2,3,4] = 5/3
        assert_relative_eq!(stat.stdev(), (5.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[rstest]
    #[case::zero_floor(TrimConfig { min_stdev: 0.0, ..Default::default() })]
    #[case::negative_floor(TrimConfig { min_stdev: -1e-9, ..Default::default() })]
    #[case::nan_floor(TrimConfig { min_stdev: f64::NAN, ..Default::default() })]
    #[case::negative_fence(TrimConfig { fence_multiplier: -1.0, ..Default::default() })]
    fn test_unusable_trim_rejected(#[case] config: TrimConfig) {
        assert!(matches!(
            RobustStatistic::with_config(&[2.0, 2.0, 2.0], &config),
            Err(StatsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_trim_json_uses_defaults() {
        let config: TrimConfig = serde_json::from_str(r#"{"fence_multiplier": 2.0}"#).unwrap();
        assert_eq!(config.fence_multiplier, 2.0);
        assert_eq!(config.min_stdev, TrimConfig::default().min_stdev);
    }

    #[test]
    fn test_round_trip_on_retained_values() {
        let sample = [0.97, 1.02, 1.05, 0.99, 1.10, 1.01, 25.0, 0.93];
        let stat = RobustStatistic::new(&sample).unwrap();

        for &x in sample.iter().filter(|&&x| stat.contains(x)) {
            assert_relative_eq!(stat.denormalize(stat.normalize(x)), x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_sample_uses_stdev_floor() {
        let stat = RobustStatistic::new(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(stat.stdev(), 1e-9);
        assert_eq!(stat.normalize(5.0), 0.0);
        assert!(stat.normalize(6.0).is_finite());
    }

    #[rstest]
    #[case::empty(&[], 0)]
    #[case::single(&[1.0], 1)]
    fn test_insufficient_sample(#[case] sample: &[f64], #[case] retained: usize) {
        let err = RobustStatistic::new(sample).unwrap_err();
        assert_eq!(
            err,
            StatsError::InsufficientSample {
                retained,
                sample: sample.len()
            }
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = RobustStatistic::new(&[1.0, f64::NAN, 2.0]).unwrap_err();
        assert_eq!(err, StatsError::NonFinite { index: 1 });
    }

    #[rstest]
    #[case(1.5, 5)]
    #[case(1.8, 6)]
    fn test_fence_multiplier(#[case] k: f64, #[case] retained: usize) {
        // Q1 = 2, Q3 = 4, IQR = 2; 7.2 sits between the 1.5x and 1.8x fences
        let config = TrimConfig {
            fence_multiplier: k,
            ..Default::default()
        };
        let stat = RobustStatistic::with_config(&[2.0, 2.0, 3.0, 4.0, 4.0, 7.2], &config).unwrap();
        assert_eq!(stat.len(), retained);
    }

    #[test]
    fn test_margin_of_error() {
        let stat = RobustStatistic::new(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_relative_eq!(
            stat.margin_of_error(),
            1.96 * stat.stdev() / 2.0,
            epsilon = 1e-12
        );
        // Symmetric sample
        assert_relative_eq!(stat.skewness(), 0.0, epsilon = 1e-12);
    }
}
