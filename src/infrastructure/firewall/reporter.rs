//! Reporting abusive addresses to an external blocklist.

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const ABUSEIPDB_URL: &str = "https://api.abuseipdb.com";
/// AbuseIPDB "Brute-Force" category.
const CATEGORY_BRUTE_FORCE: &str = "18";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Sink for addresses that crossed the abuse threshold.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FirewallReporter: Send + Sync {
    async fn report(&self, ip: IpAddr, comment: &str) -> Result<(), ReportError>;

    fn name(&self) -> &'static str;
}

/// Reports to AbuseIPDB's v2 API.
pub struct AbuseIpDbReporter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AbuseIpDbReporter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ReportError> {
        Self::with_base_url(api_key, ABUSEIPDB_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl FirewallReporter for AbuseIpDbReporter {
    async fn report(&self, ip: IpAddr, comment: &str) -> Result<(), ReportError> {
        let ip = ip.to_string();
        self.client
            .post(format!("{}/api/v2/report", self.base_url))
            .header("Key", &self.api_key)
            .header("Accept", "application/json")
            .form(&[
                ("ip", ip.as_str()),
                ("categories", CATEGORY_BRUTE_FORCE),
                ("comment", comment),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "abuseipdb"
    }
}

/// Reporter that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

#[async_trait]
impl FirewallReporter for NullReporter {
    async fn report(&self, ip: IpAddr, comment: &str) -> Result<(), ReportError> {
        info!(%ip, comment, "Abuse report skipped (no reporter configured)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
