//! Data-access boundary for filings.
//!
//! The forecasting engine never talks to a database directly. It asks a
//! [`FilingStore`] for the filings of an industry and for the facts those
//! filings report, so the same training code runs against fixtures in
//! memory or against the SQLite store built by the ingest command.

use crate::error::{DataError, Result};
use crate::model::{Fact, Filing, FilingSnapshot, FiscalPeriod, FormType, Registrant, TagMetadata};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Selects the filings of one industry over a range of filing dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingQuery {
    /// SIC code of the industry
    pub sic: u32,
    /// First filing date, inclusive
    pub start: NaiveDate,
    /// Last filing date, inclusive
    pub end: NaiveDate,
    /// Accepted form types (default: all periodic reports)
    pub forms: Vec<FormType>,
    /// Restrict to one fiscal period focus
    pub fiscal_period: Option<FiscalPeriod>,
}

impl FilingQuery {
    /// Query periodic reports filed by industry `sic` between `start` and `end`.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidDateRange`] when `start` is after `end`.
    pub fn new(sic: u32, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            sic,
            start,
            end,
            forms: FormType::PERIODIC.to_vec(),
            fiscal_period: None,
        })
    }

    /// Only accept filings with the given fiscal period focus.
    pub const fn with_fiscal_period(mut self, period: FiscalPeriod) -> Self {
        self.fiscal_period = Some(period);
        self
    }

    /// Only accept the given form types.
    pub fn with_forms(mut self, forms: &[FormType]) -> Self {
        self.forms = forms.to_vec();
        self
    }

    /// Whether `filing` satisfies the query
    pub fn matches(&self, filing: &Filing) -> bool {
        filing.sic == self.sic
            && filing.filed >= self.start
            && filing.filed <= self.end
            && self.forms.contains(&filing.form)
            && self
                .fiscal_period
                .is_none_or(|period| filing.fiscal_period == Some(period))
    }
}

/// Read access to filings, facts and tag metadata.
pub trait FilingStore {
    /// Filings matching `query`, ordered by CIK, then filing date, then
    /// accession number.
    fn filings(&self, query: &FilingQuery) -> Result<Vec<Filing>>;

    /// A single filing by accession number.
    fn filing(&self, accession: &str) -> Result<Option<Filing>>;

    /// The most recently filed periodic report of a registrant.
    fn latest_filing(&self, cik: u64) -> Result<Option<Filing>>;

    /// Facts reported in a filing for the requested tags. Tags without any
    /// fact are absent from the map.
    fn facts(&self, accession: &str, names: &[String]) -> Result<BTreeMap<String, Vec<Fact>>>;

    /// Metadata for the requested tags, in request order. Unknown tags are
    /// skipped.
    fn tag_metadata(&self, names: &[String]) -> Result<Vec<TagMetadata>>;

    /// The `limit` standard tags reported by the most filings in an industry,
    /// most common first.
    fn most_common_tags(&self, sic: u32, limit: usize) -> Result<Vec<TagMetadata>>;
}

/// Build the snapshot of `filing` restricted to `names`.
pub fn snapshot<S: FilingStore + ?Sized>(
    store: &S,
    filing: Filing,
    names: &[String],
) -> Result<FilingSnapshot> {
    let facts = store.facts(&filing.accession, names)?;
    Ok(FilingSnapshot::new(filing, facts))
}

/// Load snapshots for every filing matching `query`, in store order.
pub fn load_snapshots<S: FilingStore + ?Sized>(
    store: &S,
    query: &FilingQuery,
    names: &[String],
) -> Result<Vec<FilingSnapshot>> {
    store
        .filings(query)?
        .into_iter()
        .map(|filing| snapshot(store, filing, names))
        .collect()
}

/// Store that keeps everything in memory.
///
/// Used for fixtures and as the target of a one-off EDGAR download.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    registrants: BTreeMap<u64, Registrant>,
    snapshots: BTreeMap<String, FilingSnapshot>,
    tags: BTreeMap<String, TagMetadata>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a registrant
    pub fn insert_registrant(&mut self, registrant: Registrant) {
        self.registrants.insert(registrant.cik, registrant);
    }

    /// Add or replace a filing and its facts
    pub fn insert_snapshot(&mut self, snapshot: FilingSnapshot) {
        self.snapshots
            .insert(snapshot.accession().to_string(), snapshot);
    }

    /// Add or replace tag metadata
    pub fn insert_tag(&mut self, tag: TagMetadata) {
        self.tags.insert(tag.name.clone(), tag);
    }

    /// Registrant by CIK
    pub fn registrant(&self, cik: u64) -> Option<&Registrant> {
        self.registrants.get(&cik)
    }

    /// Number of stored filings
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store holds no filings
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// All stored snapshots, in accession order
    pub fn snapshots(&self) -> impl Iterator<Item = &FilingSnapshot> {
        self.snapshots.values()
    }

    fn metadata_or_named(&self, name: &str) -> TagMetadata {
        self.tags
            .get(name)
            .cloned()
            .unwrap_or_else(|| TagMetadata::named(name))
    }
}

impl FilingStore for MemoryStore {
    fn filings(&self, query: &FilingQuery) -> Result<Vec<Filing>> {
        let mut filings: Vec<Filing> = self
            .snapshots
            .values()
            .filter(|s| query.matches(&s.filing))
            .map(|s| s.filing.clone())
            .collect();
        filings.sort_by(|a, b| {
            (a.cik, a.filed, &a.accession).cmp(&(b.cik, b.filed, &b.accession))
        });
        Ok(filings)
    }

    fn filing(&self, accession: &str) -> Result<Option<Filing>> {
        Ok(self.snapshots.get(accession).map(|s| s.filing.clone()))
    }

    fn latest_filing(&self, cik: u64) -> Result<Option<Filing>> {
        Ok(self
            .snapshots
            .values()
            .map(|s| &s.filing)
            .filter(|f| f.cik == cik)
            .max_by(|a, b| (a.filed, &a.accession).cmp(&(b.filed, &b.accession)))
            .cloned())
    }

    fn facts(&self, accession: &str, names: &[String]) -> Result<BTreeMap<String, Vec<Fact>>> {
        let snapshot = self
            .snapshots
            .get(accession)
            .ok_or_else(|| DataError::FilingNotFound(accession.to_string()))?;

        Ok(names
            .iter()
            .filter_map(|name| {
                snapshot
                    .facts
                    .get(name)
                    .filter(|facts| !facts.is_empty())
                    .map(|facts| (name.clone(), facts.clone()))
            })
            .collect())
    }

    fn tag_metadata(&self, names: &[String]) -> Result<Vec<TagMetadata>> {
        Ok(names
            .iter()
            .filter_map(|name| self.tags.get(name).cloned())
            .collect())
    }

    fn most_common_tags(&self, sic: u32, limit: usize) -> Result<Vec<TagMetadata>> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for snapshot in self.snapshots.values().filter(|s| s.filing.sic == sic) {
            for (name, facts) in &snapshot.facts {
                if !facts.is_empty() {
                    *counts.entry(name.as_str()).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        Ok(ranked
            .into_iter()
            .map(|(name, _)| self.metadata_or_named(name))
            .filter(TagMetadata::is_standard)
            .take(limit)
            .collect())
    }
}
