//! EDGAR JSON documents and their conversion into filing snapshots.
//!
//! Document layout: <https://www.sec.gov/edgar/sec-api-documentation>

use crate::error::{DataError, Result};
use crate::model::{
    Fact, Filing, FilerStatus, FilingSnapshot, FiscalPeriod, FormType, PeriodKind, Registrant,
    TagMetadata,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// Average number of days in a quarter
const DAYS_PER_QUARTER: f64 = 91.3;

/// Document and entity information; never used as a model quantity
const DEI_TAXONOMY: &str = "dei";

/// EDGAR serializes the CIK as a number in `companyfacts` and as a string in
/// `submissions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CikValue {
    Number(u64),
    Text(String),
}

impl CikValue {
    fn parse(&self) -> Result<u64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| DataError::Parse(format!("Invalid CIK '{}': {}", s, e))),
        }
    }
}

fn deserialize_cik<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    CikValue::deserialize(deserializer)?
        .parse()
        .map_err(serde::de::Error::custom)
}

/// Response of `/api/xbrl/companyfacts/CIK##########.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    /// Registrant CIK
    #[serde(deserialize_with = "deserialize_cik")]
    pub cik: u64,
    /// Registrant name
    #[serde(default)]
    pub entity_name: Option<String>,
    /// Concepts keyed by taxonomy (`us-gaap`, `dei`, ..) and then tag name
    pub facts: BTreeMap<String, BTreeMap<String, Concept>>,
}

/// All reported values of one XBRL concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Human readable label
    #[serde(default)]
    pub label: Option<String>,
    /// Concept description
    #[serde(default)]
    pub description: Option<String>,
    /// Values keyed by unit of measure (`USD`, `shares`, ..)
    pub units: BTreeMap<String, Vec<UnitFact>>,
}

/// One reported value of a concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFact {
    /// Period start, absent for instant values
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Period end
    pub end: NaiveDate,
    /// Reported value
    pub val: f64,
    /// Accession number of the reporting filing
    pub accn: String,
    /// Fiscal year focus of the reporting filing
    #[serde(default)]
    pub fy: Option<i32>,
    /// Fiscal period focus of the reporting filing
    #[serde(default)]
    pub fp: Option<String>,
    /// Form type of the reporting filing
    pub form: String,
    /// Filing date of the reporting filing
    pub filed: NaiveDate,
}

impl UnitFact {
    /// Period length in quarters, `0` for instant values
    pub fn duration_quarters(&self) -> u32 {
        self.start.map_or(0, |start| {
            let days = (self.end - start).num_days().max(0) as f64;
            (days / DAYS_PER_QUARTER).round() as u32
        })
    }
}

impl CompanyFacts {
    /// Parse a `companyfacts` document.
    pub fn parse_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DataError::Parse(format!("Failed to parse company facts: {}", e)))
    }

    fn concepts(&self) -> impl Iterator<Item = (&String, &Concept)> {
        self.facts
            .iter()
            .filter(|(taxonomy, _)| taxonomy.as_str() != DEI_TAXONOMY)
            .flat_map(|(_, concepts)| concepts.iter())
    }

    /// Regroup the facts by reporting filing.
    ///
    /// Only periodic report forms are kept. Every snapshot carries the
    /// registrant's SIC code and `filer_status`. Snapshots are ordered by
    /// filing date, then accession number.
    pub fn into_snapshots(
        &self,
        registrant: &Registrant,
        filer_status: FilerStatus,
    ) -> Vec<FilingSnapshot> {
        let mut snapshots: BTreeMap<&str, FilingSnapshot> = BTreeMap::new();
        let mut seen: HashSet<(&str, &str, NaiveDate, u32)> = HashSet::new();

        for (tag, concept) in self.concepts() {
            for unit_fact in concept.units.values().flatten() {
                let Some(form) = FormType::parse(&unit_fact.form) else {
                    trace!(tag = %tag, form = %unit_fact.form, "Skipping non-periodic form");
                    continue;
                };

                let duration = unit_fact.duration_quarters();
                if !seen.insert((unit_fact.accn.as_str(), tag.as_str(), unit_fact.end, duration)) {
                    continue;
                }

                let snapshot = snapshots.entry(unit_fact.accn.as_str()).or_insert_with(|| {
                    let filing = Filing {
                        accession: unit_fact.accn.clone(),
                        cik: registrant.cik,
                        sic: registrant.sic,
                        form,
                        filer_status,
                        fiscal_period: unit_fact
                            .fp
                            .as_deref()
                            .and_then(|fp| fp.parse::<FiscalPeriod>().ok()),
                        fiscal_year: unit_fact.fy,
                        filed: unit_fact.filed,
                    };
                    FilingSnapshot::new(filing, BTreeMap::new())
                });

                snapshot.push_fact(
                    tag.as_str(),
                    Fact::new(unit_fact.end, duration, unit_fact.val),
                );
            }
        }

        let mut snapshots: Vec<FilingSnapshot> = snapshots.into_values().collect();
        snapshots.sort_by(|a, b| {
            (a.filing.filed, &a.filing.accession).cmp(&(b.filing.filed, &b.filing.accession))
        });

        debug!(
            cik = registrant.cik,
            filings = snapshots.len(),
            "Grouped company facts into filings"
        );
        snapshots
    }

    /// Metadata for every concept outside the `dei` taxonomy.
    pub fn tag_metadata(&self) -> Vec<TagMetadata> {
        self.concepts()
            .map(|(tag, concept)| {
                let period_kind = if concept
                    .units
                    .values()
                    .flatten()
                    .any(|fact| fact.start.is_some())
                {
                    PeriodKind::Duration
                } else {
                    PeriodKind::Instant
                };

                TagMetadata {
                    name: tag.clone(),
                    datatype: concept.units.keys().next().cloned(),
                    balance: None,
                    period_kind: Some(period_kind),
                    label: concept.label.clone(),
                    is_custom: false,
                    is_abstract: false,
                }
            })
            .collect()
    }
}

/// Response of `/submissions/CIK##########.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submissions {
    /// Registrant CIK
    #[serde(deserialize_with = "deserialize_cik")]
    pub cik: u64,
    /// Registrant name
    #[serde(default)]
    pub name: Option<String>,
    /// SIC code, empty for registrants without one
    #[serde(default)]
    pub sic: String,
    /// Filer category, e.g. `Large accelerated filer`
    #[serde(default)]
    pub category: Option<String>,
    /// Filing history
    pub filings: SubmissionHistory,
}

/// Container for the filing history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionHistory {
    /// Most recent filings
    pub recent: RecentFilings,
}

/// Column-oriented list of recent filings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    /// Accession numbers
    pub accession_number: Vec<String>,
    /// Filing dates
    pub filing_date: Vec<String>,
    /// Form types
    pub form: Vec<String>,
}

impl Submissions {
    /// Parse a `submissions` document.
    pub fn parse_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DataError::Parse(format!("Failed to parse submissions: {}", e)))
    }

    /// Registrant described by the document.
    ///
    /// # Errors
    /// Returns [`DataError::MissingData`] when the registrant has no SIC code.
    pub fn registrant(&self) -> Result<Registrant> {
        let sic = self.sic.trim();
        if sic.is_empty() {
            return Err(DataError::MissingData {
                cik: self.cik,
                reason: "No SIC code".to_string(),
            });
        }

        let sic = sic
            .parse()
            .map_err(|e| DataError::Parse(format!("Invalid SIC code '{}': {}", sic, e)))?;

        Ok(Registrant {
            cik: self.cik,
            name: self.name.clone(),
            sic,
        })
    }

    /// Current filer status. Unknown categories are treated as non-accelerated.
    pub fn filer_status(&self) -> FilerStatus {
        let category = self.category.as_deref().unwrap_or_default();
        FilerStatus::from_category(category).unwrap_or_else(|| {
            debug!(
                cik = self.cik,
                category, "Unknown filer category, assuming non-accelerated"
            );
            FilerStatus::NonAccelerated
        })
    }

    /// Number of recent periodic reports
    pub fn periodic_report_count(&self) -> usize {
        self.filings
            .recent
            .form
            .iter()
            .filter(|form| FormType::parse(form).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn unit_fact(start: Option<&str>, end: &str) -> UnitFact {
        UnitFact {
            start: start.map(|s| s.parse().unwrap()),
            end: end.parse().unwrap(),
            val: 1.0,
            accn: "a".to_string(),
            fy: None,
            fp: None,
            form: "10-Q".to_string(),
            filed: "2024-05-01".parse().unwrap(),
        }
    }

    #[rstest]
    #[case(None, "2024-03-31", 0)]
    #[case(Some("2024-01-01"), "2024-03-31", 1)]
    #[case(Some("2023-10-01"), "2024-03-31", 2)]
    #[case(Some("2023-07-01"), "2024-03-31", 3)]
    #[case(Some("2023-04-01"), "2024-03-31", 4)]
    fn test_duration_quarters(
        #[case] start: Option<&str>,
        #[case] end: &str,
        #[case] quarters: u32,
    ) {
        assert_eq!(unit_fact(start, end).duration_quarters(), quarters);
    }

    #[test]
    fn test_submissions_registrant() {
        let json = r#"{
            "cik": "0000320193",
            "name": "Apple Inc.",
            "sic": "3571",
            "category": "Large accelerated filer",
            "filings": {"recent": {
                "accessionNumber": ["a", "b", "c"],
                "filingDate": ["2024-05-03", "2024-02-02", "2024-01-10"],
                "form": ["10-Q", "10-Q", "8-K"]
            }}
        }"#;
        let submissions = Submissions::parse_json(json).unwrap();
        let registrant = submissions.registrant().unwrap();

        assert_eq!(registrant.cik, 320193);
        assert_eq!(registrant.sic, 3571);
        assert_eq!(submissions.filer_status(), FilerStatus::LargeAccelerated);
        assert_eq!(submissions.periodic_report_count(), 2);
    }

    #[test]
    fn test_submissions_without_sic() {
        let json = r#"{
            "cik": "42",
            "sic": "",
            "filings": {"recent": {"accessionNumber": [], "filingDate": [], "form": []}}
        }"#;
        let submissions = Submissions::parse_json(json).unwrap();
        assert!(matches!(
            submissions.registrant(),
            Err(DataError::MissingData { cik: 42, .. })
        ));
        assert_eq!(submissions.filer_status(), FilerStatus::NonAccelerated);
    }
}
