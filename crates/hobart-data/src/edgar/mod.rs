//! SEC EDGAR ingest.
//!
//! Filings are downloaded from the public JSON API:
//! - `companyfacts` holds every XBRL fact a company has reported, tagged
//!   with the accession number of the filing that reported it
//! - `submissions` holds the registrant's SIC code and filer category
//!
//! [`CompanyFacts::into_snapshots`] regroups the facts by accession number
//! into [`FilingSnapshot`](crate::FilingSnapshot)s ready for a store.
//!
//! # Example
//!
//! ```no_run
//! use hobart_data::edgar::EdgarClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgarClient::new()?;
//!     let company = client.fetch_company(320193).await?;
//!     println!(
//!         "{} filings for SIC {}",
//!         company.snapshots.len(),
//!         company.registrant.sic
//!     );
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod facts;

pub use client::{CompanyDownload, EdgarClient};
pub use facts::{CompanyFacts, Concept, RecentFilings, Submissions, UnitFact};
