//! Filing data model.
//!
//! These types mirror the SEC financial statement data sets: a registrant
//! files submissions, each submission reports numbers for XBRL tags, and each
//! number is tagged with the end date and length of the period it covers.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A company registered with the SEC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    /// Central Index Key
    pub cik: u64,
    /// Conformed company name
    pub name: Option<String>,
    /// Standard Industrial Classification code
    pub sic: u32,
}

/// Form types used for training and prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormType {
    /// Annual report
    #[serde(rename = "10-K")]
    TenK,
    /// Amended annual report
    #[serde(rename = "10-K/A")]
    TenKAmended,
    /// Quarterly report
    #[serde(rename = "10-Q")]
    TenQ,
    /// Amended quarterly report
    #[serde(rename = "10-Q/A")]
    TenQAmended,
}

impl FormType {
    /// All periodic report forms
    pub const PERIODIC: [Self; 4] = [Self::TenK, Self::TenKAmended, Self::TenQ, Self::TenQAmended];

    /// Parse an EDGAR form string; other forms (8-K, S-1, ..) yield `None`.
    pub fn parse(form: &str) -> Option<Self> {
        match form {
            "10-K" => Some(Self::TenK),
            "10-K/A" => Some(Self::TenKAmended),
            "10-Q" => Some(Self::TenQ),
            "10-Q/A" => Some(Self::TenQAmended),
            _ => None,
        }
    }

    /// EDGAR form string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenK => "10-K",
            Self::TenKAmended => "10-K/A",
            Self::TenQ => "10-Q",
            Self::TenQAmended => "10-Q/A",
        }
    }

    /// Whether this is an annual report
    pub const fn is_annual(&self) -> bool {
        matches!(self, Self::TenK | Self::TenKAmended)
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filer status, ordered from the largest reporting tier to the smallest.
///
/// The ordinal is used directly as a model feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilerStatus {
    /// Large accelerated filer (`1-LAF`)
    LargeAccelerated,
    /// Accelerated filer (`2-ACC`)
    Accelerated,
    /// Smaller reporting accelerated filer (`3-SRA`)
    SmallerReportingAccelerated,
    /// Non-accelerated filer (`4-NON`)
    NonAccelerated,
    /// Smaller reporting filer (`5-SML`)
    SmallerReporting,
}

impl FilerStatus {
    /// Rank of the tier, `0` for large accelerated filers
    pub const fn ordinal(&self) -> usize {
        match self {
            Self::LargeAccelerated => 0,
            Self::Accelerated => 1,
            Self::SmallerReportingAccelerated => 2,
            Self::NonAccelerated => 3,
            Self::SmallerReporting => 4,
        }
    }

    /// Code used in the SEC financial statement data sets
    pub const fn code(&self) -> &'static str {
        match self {
            Self::LargeAccelerated => "1-LAF",
            Self::Accelerated => "2-ACC",
            Self::SmallerReportingAccelerated => "3-SRA",
            Self::NonAccelerated => "4-NON",
            Self::SmallerReporting => "5-SML",
        }
    }

    /// Parse a data set code such as `2-ACC`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1-LAF" => Some(Self::LargeAccelerated),
            "2-ACC" => Some(Self::Accelerated),
            "3-SRA" => Some(Self::SmallerReportingAccelerated),
            "4-NON" => Some(Self::NonAccelerated),
            "5-SML" => Some(Self::SmallerReporting),
            _ => None,
        }
    }

    /// Parse the free-text `category` of the EDGAR submissions API, e.g.
    /// `"Non-accelerated filer<br>Smaller reporting company"`.
    pub fn from_category(category: &str) -> Option<Self> {
        let category = category.to_lowercase();
        let smaller = category.contains("smaller reporting");

        if category.contains("large accelerated") {
            Some(Self::LargeAccelerated)
        } else if category.contains("non-accelerated") {
            Some(if smaller {
                Self::SmallerReporting
            } else {
                Self::NonAccelerated
            })
        } else if category.contains("accelerated") {
            Some(if smaller {
                Self::SmallerReportingAccelerated
            } else {
                Self::Accelerated
            })
        } else if smaller {
            Some(Self::SmallerReporting)
        } else {
            None
        }
    }
}

/// Fiscal period focus of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum FiscalPeriod {
    /// Full fiscal year
    FY,
    /// First quarter
    Q1,
    /// Second quarter
    Q2,
    /// Third quarter
    Q3,
    /// Fourth quarter
    Q4,
    /// First half
    H1,
    /// Second half
    H2,
    /// Nine months
    M9,
    /// First trimester
    T1,
    /// Second trimester
    T2,
    /// Third trimester
    T3,
    /// Eight months
    M8,
    /// Calendar year
    CY,
}

impl FiscalPeriod {
    /// Period focus as reported by EDGAR
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FY => "FY",
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::M9 => "M9",
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
            Self::M8 => "M8",
            Self::CY => "CY",
        }
    }
}

impl FromStr for FiscalPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "FY" => Self::FY,
            "Q1" => Self::Q1,
            "Q2" => Self::Q2,
            "Q3" => Self::Q3,
            "Q4" => Self::Q4,
            "H1" => Self::H1,
            "H2" => Self::H2,
            "M9" => Self::M9,
            "T1" => Self::T1,
            "T2" => Self::T2,
            "T3" => Self::T3,
            "M8" => Self::M8,
            "CY" => Self::CY,
            _ => return Err(DataError::Parse(format!("Invalid fiscal period: {}", s))),
        })
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission header: one filing by one registrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    /// Accession number, e.g. `0000311471-14-000006`
    pub accession: String,
    /// Registrant CIK
    pub cik: u64,
    /// Registrant SIC code
    pub sic: u32,
    /// Form type
    pub form: FormType,
    /// Filer status at the time of filing
    pub filer_status: FilerStatus,
    /// Fiscal period focus
    pub fiscal_period: Option<FiscalPeriod>,
    /// Fiscal year focus
    pub fiscal_year: Option<i32>,
    /// Date the filing was submitted
    pub filed: NaiveDate,
}

/// A single reported number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// End date of the reporting period
    pub end: NaiveDate,
    /// Length of the period in quarters, `0` for point-in-time values
    pub duration: u32,
    /// Reported value
    pub value: f64,
}

impl Fact {
    /// Create a new fact
    pub const fn new(end: NaiveDate, duration: u32, value: f64) -> Self {
        Self {
            end,
            duration,
            value,
        }
    }
}

/// A filing together with the facts it reports for a set of tags.
///
/// Filings report comparatives, so a single snapshot usually holds several
/// dated values for each tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingSnapshot {
    /// Submission header
    pub filing: Filing,
    /// Facts keyed by tag name
    pub facts: BTreeMap<String, Vec<Fact>>,
}

impl FilingSnapshot {
    /// Create a snapshot
    pub const fn new(filing: Filing, facts: BTreeMap<String, Vec<Fact>>) -> Self {
        Self { filing, facts }
    }

    /// Accession number of the filing
    pub fn accession(&self) -> &str {
        &self.filing.accession
    }

    /// Registrant CIK
    pub const fn cik(&self) -> u64 {
        self.filing.cik
    }

    /// Facts reported for `tag`, empty when the tag is absent
    pub fn facts_for(&self, tag: &str) -> &[Fact] {
        self.facts.get(tag).map_or(&[], Vec::as_slice)
    }

    /// Add a fact for `tag`
    pub fn push_fact(&mut self, tag: impl Into<String>, fact: Fact) {
        self.facts.entry(tag.into()).or_default().push(fact);
    }
}

/// Debit or credit balance of a monetary tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Balance {
    /// Debit balance (`D`)
    Debit,
    /// Credit balance (`C`)
    Credit,
}

impl Balance {
    /// Database representation
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Debit => "D",
            Self::Credit => "C",
        }
    }

    /// Parse from database representation
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "D" => Ok(Self::Debit),
            "C" => Ok(Self::Credit),
            _ => Err(DataError::Parse(format!("Invalid balance: {}", s))),
        }
    }
}

/// Whether a tag is reported at an instant or over a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodKind {
    /// Point in time (`I`), e.g. balance sheet items
    Instant,
    /// Over a period (`D`), e.g. income statement items
    Duration,
}

impl PeriodKind {
    /// Database representation
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Instant => "I",
            Self::Duration => "D",
        }
    }

    /// Parse from database representation
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "I" => Ok(Self::Instant),
            "D" => Ok(Self::Duration),
            _ => Err(DataError::Parse(format!("Invalid period kind: {}", s))),
        }
    }
}

/// Canonical metadata for an XBRL tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMetadata {
    /// Tag name, e.g. `Revenues`
    pub name: String,
    /// Data type, e.g. `monetary` or a unit such as `USD`
    pub datatype: Option<String>,
    /// Balance type for monetary tags
    pub balance: Option<Balance>,
    /// Instant or duration
    pub period_kind: Option<PeriodKind>,
    /// Human readable label
    pub label: Option<String>,
    /// Tag defined by the filer rather than a standard taxonomy
    pub is_custom: bool,
    /// Abstract tags never carry values
    pub is_abstract: bool,
}

impl TagMetadata {
    /// Metadata for a standard, non-abstract tag known only by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datatype: None,
            balance: None,
            period_kind: None,
            label: None,
            is_custom: false,
            is_abstract: false,
        }
    }

    /// Whether the tag can be used as a model quantity
    pub const fn is_standard(&self) -> bool {
        !self.is_custom && !self.is_abstract
    }
}
