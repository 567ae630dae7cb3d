//! Annualized growth vectors
//!
//! A filing reports each line item for the current period and for one or
//! more comparative periods. The growth of a quantity is measured between
//! the most recent observation and the closest earlier observation of the
//! same duration, then annualized so that quarter-over-quarter and
//! year-over-year comparisons land on the same scale:
//!
//! - `growth = 1 + (new - old) / |old|`, with `|old|` replaced by `1` when
//!   `old == 0`
//! - `quarters = round(days / 365.569 * 4)`
//! - `annualized = growth` for `quarters <= 1`, otherwise
//!   `sign(growth) * |growth|^(1 / quarters)`

use hobart_data::{Fact, FilingSnapshot};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Days per year used to convert the gap between observations into quarters
pub const DAYS_PER_YEAR: f64 = 365.569;

/// Per-quantity growth, `None` where it could not be measured.
pub type GrowthVector = Vec<Option<f64>>;

/// Builds growth vectors for a fixed, ordered list of quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthVectorBuilder {
    quantities: Vec<String>,
}

impl GrowthVectorBuilder {
    /// Create a builder for `quantities`, in that order
    pub fn new<I, S>(quantities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            quantities: quantities.into_iter().map(Into::into).collect(),
        }
    }

    /// Quantity names, in vector order
    pub fn quantities(&self) -> &[String] {
        &self.quantities
    }

    /// Number of quantities
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    /// Whether there are no quantities
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Growth of every quantity in `snapshot`.
    ///
    /// The result always has one slot per quantity.
    pub fn build(&self, snapshot: &FilingSnapshot) -> GrowthVector {
        self.quantities
            .iter()
            .map(|name| quantity_growth(snapshot.facts_for(name)))
            .collect()
    }
}

/// Growth between the latest observation in `facts` that has an earlier
/// observation of the same duration, and that earlier observation.
pub fn quantity_growth(facts: &[Fact]) -> Option<f64> {
    let mut ordered: Vec<&Fact> = facts.iter().collect();
    ordered.sort_by_key(|f| (Reverse(f.end), Reverse(f.duration)));

    ordered.iter().enumerate().find_map(|(i, current)| {
        ordered[i + 1..]
            .iter()
            .find(|prior| prior.duration == current.duration && prior.end < current.end)
            .map(|prior| annualized_growth(current, prior))
    })?
}

/// Annualized growth from `prior` to `current`, `None` when not finite.
pub fn annualized_growth(current: &Fact, prior: &Fact) -> Option<f64> {
    let divisor = if prior.value == 0.0 {
        1.0
    } else {
        prior.value.abs()
    };
    let growth = 1.0 + (current.value - prior.value) / divisor;

    let days = (current.end - prior.end).num_days() as f64;
    let quarters = (days / DAYS_PER_YEAR * 4.0).round();

    let annualized = if quarters <= 1.0 {
        growth
    } else {
        growth.signum() * growth.abs().powf(1.0 / quarters)
    };

    annualized.is_finite().then_some(annualized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use hobart_data::{FilerStatus, Filing, FormType};
    use rstest::rstest;
    use std::collections::BTreeMap;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn fact(end: &str, duration: u32, value: f64) -> Fact {
        Fact::new(date(end), duration, value)
    }

    fn snapshot(facts: &[(&str, Fact)]) -> FilingSnapshot {
        let filing = Filing {
            accession: "0000000001-24-000001".to_string(),
            cik: 1,
            sic: 1311,
            form: FormType::TenK,
            filer_status: FilerStatus::Accelerated,
            fiscal_period: None,
            fiscal_year: None,
            filed: date("2024-02-15"),
        };
        let mut snapshot = FilingSnapshot::new(filing, BTreeMap::new());
        for (tag, f) in facts {
            snapshot.push_fact(*tag, *f);
        }
        snapshot
    }

    #[test]
    fn test_year_over_year_growth_is_annualized() {
        // 365 days apart -> 4 quarters
        let growth = annualized_growth(
            &fact("2023-12-31", 4, 110.0),
            &fact("2022-12-31", 4, 100.0),
        )
        .unwrap();
        assert_relative_eq!(growth, 1.1_f64.powf(0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_quarter_growth_not_annualized() {
        let growth =
            annualized_growth(&fact("2024-03-31", 1, 90.0), &fact("2023-12-31", 1, 100.0))
                .unwrap();
        assert_relative_eq!(growth, 0.9, epsilon = 1e-12);
    }

    #[rstest]
    #[case::zero_prior(0.0, 5.0, 6.0)]
    #[case::negative_prior(-100.0, -50.0, 1.5)]
    #[case::sign_flip(100.0, -50.0, -0.5)]
    fn test_growth_formula(#[case] old: f64, #[case] new: f64, #[case] expected: f64) {
        let growth =
            annualized_growth(&fact("2024-03-31", 1, new), &fact("2023-12-31", 1, old)).unwrap();
        assert_relative_eq!(growth, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_growth_keeps_sign_when_annualized() {
        let growth =
            annualized_growth(&fact("2023-12-31", 4, -50.0), &fact("2022-12-31", 4, 100.0))
                .unwrap();
        assert_relative_eq!(growth, -(0.5_f64.powf(0.25)), epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_growth_is_empty() {
        assert!(
            annualized_growth(&fact("2024-03-31", 1, f64::NAN), &fact("2023-12-31", 1, 1.0))
                .is_none()
        );
    }

    #[test]
    fn test_pairs_observations_of_same_duration() {
        // Year-to-date (2 quarters) and quarterly facts reported together
        let facts = [
            fact("2023-06-30", 1, 105.0),
            fact("2024-06-30", 2, 230.0),
            fact("2024-06-30", 1, 120.0),
            fact("2023-06-30", 2, 200.0),
        ];
        // The 2-quarter fact sorts first at the latest end date
        let growth = quantity_growth(&facts).unwrap();
        assert_relative_eq!(growth, 1.15_f64.powf(0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_skips_latest_fact_without_comparative() {
        let facts = [
            fact("2024-06-30", 2, 230.0),
            fact("2024-06-30", 1, 120.0),
            fact("2024-03-31", 1, 100.0),
        ];
        let growth = quantity_growth(&facts).unwrap();
        assert_relative_eq!(growth, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_builder_leaves_gaps() {
        let snapshot = snapshot(&[
            ("Revenues", fact("2023-12-31", 4, 110.0)),
            ("Revenues", fact("2022-12-31", 4, 100.0)),
            ("Assets", fact("2023-12-31", 0, 500.0)),
        ]);
        let builder = GrowthVectorBuilder::new(["Assets", "Revenues", "Liabilities"]);
        let vector = builder.build(&snapshot);

        assert_eq!(vector.len(), 3);
        assert_eq!(vector[0], None);
        assert_relative_eq!(vector[1].unwrap(), 1.1_f64.powf(0.25), epsilon = 1e-12);
        assert_eq!(vector[2], None);
    }
}
