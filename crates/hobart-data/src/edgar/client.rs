//! SEC EDGAR API client with rate limiting.

use super::facts::{CompanyFacts, Submissions};
use crate::error::{DataError, Result};
use crate::model::{FilingSnapshot, Registrant, TagMetadata};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// Default rate limit: 10 requests per second (SEC requirement)
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// User agent for SEC EDGAR requests (SEC requires identifying information)
const USER_AGENT: &str = "Hobart-GrowthForecast/0.1 (contact@example.com)";

/// Rate limiter to ensure we don't exceed SEC's rate limits
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// Everything downloaded for one registrant.
#[derive(Debug, Clone)]
pub struct CompanyDownload {
    /// Registrant with its SIC code
    pub registrant: Registrant,
    /// Periodic filings, oldest first
    pub snapshots: Vec<FilingSnapshot>,
    /// Metadata for every tag the registrant reported
    pub tags: Vec<TagMetadata>,
}

/// SEC EDGAR API client with rate limiting
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
}

impl EdgarClient {
    /// Create a new EDGAR client with default settings (10 req/sec)
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(DEFAULT_RATE_LIMIT)
    }

    /// Create a new EDGAR client with custom rate limit
    ///
    /// # Arguments
    /// * `min_interval` - Minimum duration between requests
    ///
    /// # Example
    /// ```no_run
    /// use hobart_data::edgar::EdgarClient;
    /// use std::time::Duration;
    ///
    /// # fn example() -> hobart_data::Result<()> {
    /// // 5 requests per second
    /// let client = EdgarClient::with_rate_limit(Duration::from_millis(200))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_rate_limit(min_interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            base_url: EDGAR_BASE_URL.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.lock().await.wait().await;

        debug!(url, "Fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DataError::Network)?;

        if !response.status().is_success() {
            return Err(DataError::EdgarApi(format!(
                "Request to {} failed: HTTP {}",
                url,
                response.status()
            )));
        }

        let body = response.text().await.map_err(DataError::Network)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch every XBRL fact a registrant has reported.
    pub async fn fetch_company_facts(&self, cik: u64) -> Result<CompanyFacts> {
        let url = format!(
            "{}/api/xbrl/companyfacts/CIK{}.json",
            self.base_url,
            padded_cik(cik)
        );
        self.get_json(&url).await
    }

    /// Fetch registrant information and recent filings.
    pub async fn fetch_submissions(&self, cik: u64) -> Result<Submissions> {
        let url = format!("{}/submissions/CIK{}.json", self.base_url, padded_cik(cik));
        self.get_json(&url).await
    }

    /// Download a registrant and regroup its facts into filing snapshots.
    ///
    /// # Errors
    /// Returns [`DataError::MissingData`] for registrants without a SIC code.
    pub async fn fetch_company(&self, cik: u64) -> Result<CompanyDownload> {
        let submissions = self.fetch_submissions(cik).await?;
        let registrant = submissions.registrant()?;
        let filer_status = submissions.filer_status();

        let facts = self.fetch_company_facts(cik).await?;
        let snapshots = facts.into_snapshots(&registrant, filer_status);
        let tags = facts.tag_metadata();

        info!(
            cik,
            sic = registrant.sic,
            filings = snapshots.len(),
            tags = tags.len(),
            "Downloaded company"
        );

        Ok(CompanyDownload {
            registrant,
            snapshots,
            tags,
        })
    }
}

impl std::fmt::Debug for EdgarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgarClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// CIK zero-padded to the 10 digits EDGAR URLs use
fn padded_cik(cik: u64) -> String {
    format!("{:0>10}", cik)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_cik() {
        assert_eq!(padded_cik(320193), "0000320193");
        assert_eq!(padded_cik(1234567890), "1234567890");
    }

    #[test]
    fn test_custom_rate_limit() {
        let client = EdgarClient::with_rate_limit(Duration::from_millis(50)).unwrap();
        assert!(format!("{client:?}").contains("data.sec.gov"));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();

        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;

        // 2 intervals between 3 requests
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
