//! Gap filling for growth vectors
//!
//! A missing growth value is estimated from how far the filing's observed
//! values sit from their column means: the average standard score `avg` over
//! all columns (a missing column counts as its mean, i.e. score zero) is
//! mapped back through the missing column's own statistic.

use crate::{ForecastError, Result};
use hobart_stats::RobustStatistic;

/// Fills gaps in growth vectors using per-column statistics.
#[derive(Debug, Clone, Copy)]
pub struct Interpolator<'a> {
    stats: &'a [RobustStatistic],
}

impl<'a> Interpolator<'a> {
    /// Create an interpolator over ordered column statistics.
    ///
    /// # Errors
    /// Returns [`ForecastError::NoColumns`] when `stats` is empty.
    pub fn new(stats: &'a [RobustStatistic]) -> Result<Self> {
        if stats.is_empty() {
            return Err(ForecastError::NoColumns);
        }
        Ok(Self { stats })
    }

    /// Number of columns
    pub const fn columns(&self) -> usize {
        self.stats.len()
    }

    /// Column statistics, in column order
    pub const fn stats(&self) -> &'a [RobustStatistic] {
        self.stats
    }

    /// Average standard score of `vector`; missing values and NaN scores
    /// count as zero.
    pub fn average_deviation(&self, vector: &[Option<f64>]) -> Result<f64> {
        self.check_len(vector)?;

        let total: f64 = self
            .stats
            .iter()
            .zip(vector)
            .map(|(stat, value)| {
                let z = stat.normalize(value.unwrap_or_else(|| stat.mean()));
                if z.is_nan() { 0.0 } else { z }
            })
            .sum();

        Ok(total / self.stats.len() as f64)
    }

    /// Fill the gaps of `vector`.
    ///
    /// Returns `[avg, x_1, .., x_n]` where `avg` is the average deviation and
    /// `x_i` is the raw value when present, `stat_i.denormalize(avg)`
    /// otherwise.
    ///
    /// # Errors
    /// Returns [`ForecastError::DimensionMismatch`] when `vector` does not have
    /// one slot per column.
    pub fn interpolate(&self, vector: &[Option<f64>]) -> Result<Vec<f64>> {
        let avg = self.average_deviation(vector)?;

        let mut filled = Vec::with_capacity(vector.len() + 1);
        filled.push(avg);
        filled.extend(
            self.stats
                .iter()
                .zip(vector)
                .map(|(stat, value)| value.unwrap_or_else(|| stat.denormalize(avg))),
        );
        Ok(filled)
    }

    /// Standard scores of the filled columns of an interpolated vector
    /// (without the leading `avg`).
    pub fn scores(&self, filled: &[f64]) -> Result<Vec<f64>> {
        let columns = filled.get(1..).unwrap_or_default();
        if columns.len() != self.stats.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.stats.len() + 1,
                actual: filled.len(),
            });
        }

        Ok(self
            .stats
            .iter()
            .zip(columns)
            .map(|(stat, &x)| stat.normalize(x))
            .collect())
    }

    fn check_len(&self, vector: &[Option<f64>]) -> Result<()> {
        if vector.len() != self.stats.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.stats.len(),
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stats() -> Vec<RobustStatistic> {
        vec![
            // mean 2.5, stdev sqrt(5/3)
            RobustStatistic::new(&[1.0, 2.0, 3.0, 4.0]).unwrap(),
            // mean 1.0, stdev 0.1
            RobustStatistic::new(&[0.9, 1.0, 1.1]).unwrap(),
        ]
    }

    #[test]
    fn test_dense_vector_is_returned_verbatim() {
        let stats = stats();
        let interpolator = Interpolator::new(&stats).unwrap();
        let filled = interpolator.interpolate(&[Some(3.0), Some(1.2)]).unwrap();

        assert_eq!(filled.len(), 3);
        assert_eq!(&filled[1..], &[3.0, 1.2]);

        let expected = (stats[0].normalize(3.0) + stats[1].normalize(1.2)) / 2.0;
        assert_relative_eq!(filled[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_gap_filled_from_average_deviation() {
        let stats = stats();
        let interpolator = Interpolator::new(&stats).unwrap();
        let filled = interpolator.interpolate(&[None, Some(1.2)]).unwrap();

        // Missing column counts as score zero
        let avg = stats[1].normalize(1.2) / 2.0;
        assert_relative_eq!(filled[0], avg, epsilon = 1e-12);
        assert_relative_eq!(filled[1], stats[0].denormalize(avg), epsilon = 1e-12);
        assert_eq!(filled[2], 1.2);
    }

    #[test]
    fn test_all_missing_fills_means() {
        let stats = stats();
        let interpolator = Interpolator::new(&stats).unwrap();
        let filled = interpolator.interpolate(&[None, None]).unwrap();

        assert_eq!(filled[0], 0.0);
        assert_relative_eq!(filled[1], 2.5, epsilon = 1e-12);
        assert_relative_eq!(filled[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scores_match_statistics() {
        let stats = stats();
        let interpolator = Interpolator::new(&stats).unwrap();
        let filled = interpolator.interpolate(&[Some(2.5), None]).unwrap();
        let scores = interpolator.scores(&filled).unwrap();

        assert_relative_eq!(scores[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(scores[1], 0.0, epsilon = 1e-12);
        assert!(interpolator.scores(&filled[..2]).is_err());
    }

    #[test]
    fn test_no_columns_rejected() {
        assert!(matches!(
            Interpolator::new(&[]),
            Err(ForecastError::NoColumns)
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let stats = stats();
        let interpolator = Interpolator::new(&stats).unwrap();
        assert!(matches!(
            interpolator.interpolate(&[Some(1.0)]),
            Err(ForecastError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }
}
