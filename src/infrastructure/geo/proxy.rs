//! Proxy and anycast detection via ipinfo.io.

use scraper::{ElementRef, Html, Selector};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("ipinfo request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Scrapes an ipinfo.io style address page for anycast and privacy flags.
#[derive(Clone)]
pub struct ProxyDetector {
    client: reqwest::Client,
    base_url: String,
}

impl ProxyDetector {
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Whether the address is an anycast address or flagged by the privacy block.
    pub async fn is_proxy(&self, ip: IpAddr) -> Result<bool, ProxyError> {
        let html = self
            .client
            .get(format!("{}/{}", self.base_url, ip))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let flagged = page_flags_proxy(&html)?;
        debug!(%ip, flagged, "Proxy check");
        Ok(flagged)
    }
}

fn selector(css: &str) -> Result<Selector, ProxyError> {
    Selector::parse(css).map_err(|e| ProxyError::Selector(e.to_string()))
}

fn page_flags_proxy(html: &str) -> Result<bool, ProxyError> {
    let document = Html::parse_document(html);
    let title = selector(".title")?;
    let privacy_img = selector("#block-privacy img")?;

    let is_anycast = document
        .select(&title)
        .filter(|e| e.text().collect::<String>().contains("Anycast"))
        .filter_map(|e| e.parent().and_then(ElementRef::wrap))
        .any(|parent| parent.text().collect::<String>().contains("True"));

    let is_private = document
        .select(&privacy_img)
        .any(|img| img.html().contains("right"));

    Ok(is_anycast || is_private)
}
