//! EDGAR ingest pipeline.
//!
//! Downloads registrants one at a time (the client enforces the SEC rate
//! limit) and writes each download to the filing store before moving on, so
//! an interrupted run keeps everything fetched so far.

use hobart_data::edgar::{CompanyDownload, EdgarClient};
use hobart_data::{DataError, SqliteStore};
use indicatif::ProgressBar;
use tracing::{info, warn};

/// Error type for ingest operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum IngestError {
    /// Download or storage failure for one registrant.
    #[error("CIK {cik}: {source}")]
    Company {
        /// Registrant that failed
        cik: u64,
        /// Underlying failure
        #[source]
        source: DataError,
    },
}

/// Result of an ingest run.
#[derive(Debug, Default)]
pub(crate) struct IngestSummary {
    /// Registrants stored
    pub companies: usize,
    /// Filings stored
    pub filings: usize,
    /// Registrants that could not be ingested
    pub failures: Vec<IngestError>,
}

/// Write one downloaded registrant to the store.
///
/// Returns the number of filings written.
pub(crate) fn store_download(
    store: &SqliteStore,
    download: &CompanyDownload,
) -> Result<usize, DataError> {
    store.put_registrant(&download.registrant)?;
    store.put_tags(&download.tags)?;
    store.put_snapshots(&download.snapshots)?;
    Ok(download.snapshots.len())
}

/// Download and store every registrant in `ciks`.
///
/// Failures are collected and do not stop the run.
pub(crate) async fn ingest_companies(
    client: &EdgarClient,
    store: &SqliteStore,
    ciks: &[u64],
    progress: Option<&ProgressBar>,
) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for &cik in ciks {
        if let Some(pb) = progress {
            pb.set_message(format!("CIK {cik}"));
        }

        let result = match client.fetch_company(cik).await {
            Ok(download) => store_download(store, &download),
            Err(e) => Err(e),
        };

        match result {
            Ok(filings) => {
                info!(cik, filings, "Stored company");
                summary.companies += 1;
                summary.filings += filings;
            }
            Err(source) => {
                let error = IngestError::Company { cik, source };
                match progress {
                    Some(pb) => pb.suspend(|| warn!("{error}")),
                    None => warn!("{error}"),
                }
                summary.failures.push(error);
            }
        }

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    summary
}
