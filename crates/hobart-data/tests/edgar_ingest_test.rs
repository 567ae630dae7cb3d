//! Integration tests for turning EDGAR company facts into stored filings

use chrono::NaiveDate;
use hobart_data::edgar::CompanyFacts;
use hobart_data::{
    FilerStatus, FilingQuery, FilingStore, FiscalPeriod, FormType, MemoryStore, PeriodKind,
    Registrant, SqliteStore, load_snapshots,
};

const COMPANY_FACTS: &str = include_str!("fixtures/companyfacts.json");

fn registrant() -> Registrant {
    Registrant {
        cik: 123,
        name: Some("Basin Petroleum Corp".to_string()),
        sic: 1311,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_company_facts_group_by_accession() {
    let facts = CompanyFacts::parse_json(COMPANY_FACTS).unwrap();
    assert_eq!(facts.cik, 123);

    let snapshots = facts.into_snapshots(&registrant(), FilerStatus::SmallerReporting);
    let accessions: Vec<&str> = snapshots.iter().map(|s| s.accession()).collect();
    // The 8-K is not a periodic report
    assert_eq!(
        accessions,
        vec!["0000000123-23-000010", "0000000123-23-000020"]
    );

    let q1 = &snapshots[0];
    assert_eq!(q1.filing.form, FormType::TenQ);
    assert_eq!(q1.filing.fiscal_period, Some(FiscalPeriod::Q1));
    assert_eq!(q1.filing.filed, date(2023, 5, 5));
    assert_eq!(q1.filing.sic, 1311);
    assert_eq!(q1.filing.filer_status, FilerStatus::SmallerReporting);
    assert_eq!(q1.facts_for("Revenues").len(), 2);
    assert_eq!(q1.facts_for("Assets").len(), 2);
    assert!(q1.facts_for("EntityCommonStockSharesOutstanding").is_empty());

    let q2 = &snapshots[1];
    let mut durations: Vec<u32> = q2.facts_for("Revenues").iter().map(|f| f.duration).collect();
    durations.sort_unstable();
    assert_eq!(durations, vec![1, 1, 2]);
    assert!(q2.facts_for("Assets").iter().all(|f| f.duration == 0));
}

#[test]
fn test_company_facts_tag_metadata() {
    let facts = CompanyFacts::parse_json(COMPANY_FACTS).unwrap();
    let tags = facts.tag_metadata();

    assert_eq!(tags.len(), 2);
    let assets = tags.iter().find(|t| t.name == "Assets").unwrap();
    let revenues = tags.iter().find(|t| t.name == "Revenues").unwrap();
    assert_eq!(assets.period_kind, Some(PeriodKind::Instant));
    assert_eq!(revenues.period_kind, Some(PeriodKind::Duration));
    assert_eq!(revenues.datatype.as_deref(), Some("USD"));
}

#[test]
fn test_ingested_filings_are_queryable() {
    let facts = CompanyFacts::parse_json(COMPANY_FACTS).unwrap();
    let snapshots = facts.into_snapshots(&registrant(), FilerStatus::Accelerated);

    let sqlite = SqliteStore::in_memory().unwrap();
    sqlite.put_registrant(&registrant()).unwrap();
    sqlite.put_snapshots(&snapshots).unwrap();
    sqlite.put_tags(&facts.tag_metadata()).unwrap();

    let mut memory = MemoryStore::new();
    memory.insert_registrant(registrant());
    for snapshot in snapshots {
        memory.insert_snapshot(snapshot);
    }

    let query = FilingQuery::new(1311, date(2023, 1, 1), date(2023, 12, 31)).unwrap();
    let names = vec!["Revenues".to_string(), "Assets".to_string()];

    let from_sqlite = load_snapshots(&sqlite, &query, &names).unwrap();
    let from_memory = load_snapshots(&memory, &query, &names).unwrap();
    assert_eq!(from_sqlite.len(), 2);
    assert_eq!(from_memory.len(), 2);
    for (a, b) in from_sqlite.iter().zip(&from_memory) {
        assert_eq!(a.filing, b.filing);
        assert_eq!(a.facts_for("Revenues").len(), b.facts_for("Revenues").len());
    }

    let common = sqlite.most_common_tags(1311, 10).unwrap();
    let names: Vec<&str> = common.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Assets", "Revenues"]);

    let stats = sqlite.get_stats().unwrap();
    assert_eq!(stats.registrants, 1);
    assert_eq!(stats.submissions, 2);
    assert_eq!(stats.numbers, 9);
}
