//! SQLite-backed filing store.
//!
//! The schema follows the SEC financial statement data sets: `registrants`,
//! `submissions` (one row per filing), `tags` (XBRL tag metadata) and
//! `numbers` (one row per reported fact).

use crate::error::{DataError, Result};
use crate::model::{
    Balance, Fact, Filing, FilerStatus, FilingSnapshot, FiscalPeriod, FormType, PeriodKind,
    Registrant, TagMetadata,
};
use crate::store::{FilingQuery, FilingStore};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;
use std::path::Path;

const FILING_COLUMNS: &str =
    "accession, cik, sic, form, filer_status, fiscal_period, fiscal_year, filed";

const TAG_COLUMNS: &str = "name, datatype, balance, period_kind, label, is_custom, is_abstract";

/// SQLite store for filings, facts and tag metadata.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS registrants (
                cik INTEGER PRIMARY KEY,
                name TEXT,
                sic INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS submissions (
                accession TEXT PRIMARY KEY,
                cik INTEGER NOT NULL,
                sic INTEGER NOT NULL,
                form TEXT NOT NULL,
                filer_status TEXT NOT NULL,
                fiscal_period TEXT,
                fiscal_year INTEGER,
                filed TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_submissions_sic_filed ON submissions(sic, filed)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_submissions_cik ON submissions(cik, filed)",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tags (
                name TEXT PRIMARY KEY,
                datatype TEXT,
                balance TEXT,
                period_kind TEXT,
                label TEXT,
                is_custom INTEGER NOT NULL DEFAULT 0,
                is_abstract INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS numbers (
                accession TEXT NOT NULL,
                tag TEXT NOT NULL,
                end_date TEXT NOT NULL,
                duration INTEGER NOT NULL,
                value REAL NOT NULL,
                PRIMARY KEY (accession, tag, end_date, duration)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_numbers_tag ON numbers(tag)",
            [],
        )?;

        Ok(())
    }

    /// Store a registrant.
    pub fn put_registrant(&self, registrant: &Registrant) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT OR REPLACE INTO registrants (cik, name, sic, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                registrant.cik as i64,
                registrant.name,
                registrant.sic,
                updated_at
            ],
        )?;

        Ok(())
    }

    /// Get a registrant by CIK.
    pub fn get_registrant(&self, cik: u64) -> Result<Option<Registrant>> {
        let result = self
            .conn
            .query_row(
                "SELECT cik, name, sic FROM registrants WHERE cik = ?1",
                params![cik as i64],
                |row| {
                    Ok(Registrant {
                        cik: row.get::<_, i64>(0)? as u64,
                        name: row.get(1)?,
                        sic: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Store a filing and its facts, replacing any facts previously stored
    /// for the same accession number.
    pub fn put_snapshot(&self, snapshot: &FilingSnapshot) -> Result<()> {
        self.put_snapshots(std::slice::from_ref(snapshot))
    }

    /// Store a batch of filings in a single transaction.
    pub fn put_snapshots(&self, snapshots: &[FilingSnapshot]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for snapshot in snapshots {
            let filing = &snapshot.filing;
            tx.execute(
                "INSERT OR REPLACE INTO submissions
                 (accession, cik, sic, form, filer_status, fiscal_period, fiscal_year, filed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    filing.accession,
                    filing.cik as i64,
                    filing.sic,
                    filing.form.as_str(),
                    filing.filer_status.code(),
                    filing.fiscal_period.map(|p| p.as_str()),
                    filing.fiscal_year,
                    filing.filed.to_string(),
                ],
            )?;

            tx.execute(
                "DELETE FROM numbers WHERE accession = ?1",
                params![filing.accession],
            )?;

            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO numbers (accession, tag, end_date, duration, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (tag, facts) in &snapshot.facts {
                for fact in facts {
                    stmt.execute(params![
                        filing.accession,
                        tag,
                        fact.end.to_string(),
                        fact.duration,
                        fact.value
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Store tag metadata.
    pub fn put_tags(&self, tags: &[TagMetadata]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for tag in tags {
            tx.execute(
                "INSERT OR REPLACE INTO tags
                 (name, datatype, balance, period_kind, label, is_custom, is_abstract)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    tag.name,
                    tag.datatype,
                    tag.balance.map(|b| b.to_db_str()),
                    tag.period_kind.map(|p| p.to_db_str()),
                    tag.label,
                    tag.is_custom,
                    tag.is_abstract,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_tag(&self, name: &str) -> Result<Option<TagMetadata>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = ?1"),
                params![name],
                row_to_tag,
            )
            .optional()?;

        Ok(result)
    }

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?;
            Ok(n as usize)
        };

        let industries: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT sic) FROM submissions", [], |row| {
                    row.get(0)
                })?;

        Ok(StoreStats {
            registrants: count("registrants")?,
            submissions: count("submissions")?,
            tags: count("tags")?,
            numbers: count("numbers")?,
            industries: industries as usize,
        })
    }
}

impl FilingStore for SqliteStore {
    fn filings(&self, query: &FilingQuery) -> Result<Vec<Filing>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILING_COLUMNS}
             FROM submissions
             WHERE sic = ?1 AND filed >= ?2 AND filed <= ?3
             ORDER BY cik ASC, filed ASC, accession ASC"
        ))?;

        let rows = stmt.query_map(
            params![query.sic, query.start.to_string(), query.end.to_string()],
            row_to_filing,
        )?;

        let mut filings = Vec::new();
        for row in rows {
            let filing = row?;
            if query.matches(&filing) {
                filings.push(filing);
            }
        }

        Ok(filings)
    }

    fn filing(&self, accession: &str) -> Result<Option<Filing>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {FILING_COLUMNS} FROM submissions WHERE accession = ?1"),
                params![accession],
                row_to_filing,
            )
            .optional()?;

        Ok(result)
    }

    fn latest_filing(&self, cik: u64) -> Result<Option<Filing>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {FILING_COLUMNS} FROM submissions
                     WHERE cik = ?1
                     ORDER BY filed DESC, accession DESC
                     LIMIT 1"
                ),
                params![cik as i64],
                row_to_filing,
            )
            .optional()?;

        Ok(result)
    }

    fn facts(&self, accession: &str, names: &[String]) -> Result<BTreeMap<String, Vec<Fact>>> {
        if self.filing(accession)?.is_none() {
            return Err(DataError::FilingNotFound(accession.to_string()));
        }

        let mut stmt = self.conn.prepare(
            "SELECT end_date, duration, value FROM numbers
             WHERE accession = ?1 AND tag = ?2
             ORDER BY end_date DESC, duration DESC",
        )?;

        let mut facts = BTreeMap::new();
        for name in names {
            let rows = stmt.query_map(params![accession, name], |row| {
                Ok(Fact {
                    end: parse_date(&row.get::<_, String>(0)?)?,
                    duration: row.get(1)?,
                    value: row.get(2)?,
                })
            })?;

            let values = rows.collect::<std::result::Result<Vec<Fact>, _>>()?;
            if !values.is_empty() {
                facts.insert(name.clone(), values);
            }
        }

        Ok(facts)
    }

    fn tag_metadata(&self, names: &[String]) -> Result<Vec<TagMetadata>> {
        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            if let Some(tag) = self.get_tag(name)? {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    fn most_common_tags(&self, sic: u32, limit: usize) -> Result<Vec<TagMetadata>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.tag, COUNT(DISTINCT n.accession) AS filings
             FROM numbers n
             JOIN submissions s ON s.accession = n.accession
             LEFT JOIN tags t ON t.name = n.tag
             WHERE s.sic = ?1
               AND COALESCE(t.is_custom, 0) = 0
               AND COALESCE(t.is_abstract, 0) = 0
             GROUP BY n.tag
             ORDER BY filings DESC, n.tag ASC
             LIMIT ?2",
        )?;

        let names = stmt
            .query_map(params![sic, limit as i64], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let tag = self.get_tag(&name)?;
            tags.push(tag.unwrap_or_else(|| TagMetadata::named(name)));
        }
        Ok(tags)
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of registrants
    pub registrants: usize,
    /// Number of filings
    pub submissions: usize,
    /// Number of tags with metadata
    pub tags: usize,
    /// Number of reported facts
    pub numbers: usize,
    /// Number of distinct SIC codes among filings
    pub industries: usize,
}

fn conversion_error(e: DataError) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn row_to_filing(row: &Row<'_>) -> rusqlite::Result<Filing> {
    let form: String = row.get(3)?;
    let status: String = row.get(4)?;
    let period: Option<String> = row.get(5)?;

    Ok(Filing {
        accession: row.get(0)?,
        cik: row.get::<_, i64>(1)? as u64,
        sic: row.get(2)?,
        form: FormType::parse(&form)
            .ok_or_else(|| conversion_error(DataError::Parse(format!("Invalid form: {}", form))))?,
        filer_status: FilerStatus::from_code(&status).ok_or_else(|| {
            conversion_error(DataError::Parse(format!("Invalid filer status: {}", status)))
        })?,
        fiscal_period: period
            .map(|p| p.parse::<FiscalPeriod>())
            .transpose()
            .map_err(conversion_error)?,
        fiscal_year: row.get(6)?,
        filed: parse_date(&row.get::<_, String>(7)?)?,
    })
}

fn row_to_tag(row: &Row<'_>) -> rusqlite::Result<TagMetadata> {
    let balance: Option<String> = row.get(2)?;
    let period_kind: Option<String> = row.get(3)?;

    Ok(TagMetadata {
        name: row.get(0)?,
        datatype: row.get(1)?,
        balance: balance
            .map(|b| Balance::from_db_str(&b))
            .transpose()
            .map_err(conversion_error)?,
        period_kind: period_kind
            .map(|p| PeriodKind::from_db_str(&p))
            .transpose()
            .map_err(conversion_error)?,
        label: row.get(4)?,
        is_custom: row.get(5)?,
        is_abstract: row.get(6)?,
    })
}
