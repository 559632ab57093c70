//! Mailgun HTTP API sender.

use async_trait::async_trait;
use chrono::Local;
use moka::future::Cache;
use reqwest::multipart::Form;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{MailError, MailRecord, MailSender, mail_log_key};
use crate::config::MailgunConfig;
use crate::infrastructure::cache::CacheService;

const MAIL_LOG_TTL: Duration = Duration::from_secs(86_400);
const BOUNCE_CACHE_TTL: Duration = Duration::from_secs(600);
const BLOCKLIST_REASON: &str = "Blocklisted address";

#[derive(Deserialize)]
struct BounceList {
    #[serde(default)]
    items: Vec<BounceItem>,
}

#[derive(Deserialize)]
struct BounceItem {
    address: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

/// Sends mail through Mailgun and records each message in the daily mail log.
pub struct MailgunSender {
    client: reqwest::Client,
    api_key: String,
    from: String,
    domain_url: String,
    cache: Arc<dyn CacheService>,
    bounce_list: Cache<(), Vec<String>>,
    bounced: Cache<String, bool>,
}

impl MailgunSender {
    pub fn new(config: &MailgunConfig, cache: Arc<dyn CacheService>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let domain = sender_domain(&config.from);
        let domain_url = format!("{}/v3/{}", config.base_url.trim_end_matches('/'), domain);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            domain_url,
            cache,
            bounce_list: Cache::builder().time_to_live(BOUNCE_CACHE_TTL).build(),
            bounced: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(BOUNCE_CACHE_TTL)
                .build(),
        })
    }

    async fn fetch_bounces(&self) -> Result<Vec<String>, MailError> {
        let list: BounceList = self
            .client
            .get(format!("{}/bounces", self.domain_url))
            .basic_auth("api", Some(&self.api_key))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.items.into_iter().map(|i| i.address).collect())
    }

    async fn fetch_bounced(&self, address: &str) -> Result<bool, MailError> {
        let body: serde_json::Value = self
            .client
            .get(format!(
                "{}/bounces/{}",
                self.domain_url,
                urlencoding::encode(address)
            ))
            .basic_auth("api", Some(&self.api_key))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.get("error").is_some())
    }
}

/// Domain part of a sender such as `Blog <noreply@mg.example.com>`.
fn sender_domain(from: &str) -> &str {
    from.rsplit('@')
        .next()
        .unwrap_or(from)
        .trim_end_matches('>')
        .trim()
}

#[async_trait]
impl MailSender for MailgunSender {
    async fn send(
        &self,
        title: &str,
        content: &str,
        tos: &str,
        client_ip: &str,
    ) -> Result<(), MailError> {
        let form = Form::new()
            .text("from", self.from.clone())
            .text("to", tos.to_string())
            .text("subject", title.to_string())
            .text("html", content.to_string());

        let response = self
            .client
            .post(format!("{}/messages", self.domain_url))
            .basic_auth("api", Some(&self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let now = Local::now();
        let record = MailRecord {
            title: title.to_string(),
            content: content.to_string(),
            tos: tos.to_string(),
            time: now,
            client_ip: client_ip.to_string(),
        };
        match serde_json::to_string(&record) {
            Ok(json) => {
                if let Err(e) = self
                    .cache
                    .add_to_set(&mail_log_key(now), &json, MAIL_LOG_TTL)
                    .await
                {
                    warn!("Failed to record mail log entry: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize mail record: {}", e),
        }

        metrics::counter!("mails_sent_total").increment(1);
        info!(to = tos, subject = title, "Mail sent");
        Ok(())
    }

    async fn bounces(&self) -> Vec<String> {
        self.bounce_list
            .get_with((), async {
                self.fetch_bounces().await.unwrap_or_else(|e| {
                    warn!("Failed to fetch bounce list: {}", e);
                    Vec::new()
                })
            })
            .await
    }

    async fn has_bounced(&self, address: &str) -> bool {
        self.bounced
            .get_with(address.to_lowercase(), async {
                self.fetch_bounced(address).await.unwrap_or(false)
            })
            .await
    }

    async fn add_recipient(&self, address: &str) -> String {
        let form = Form::new()
            .text("address", address.to_string())
            .text("error", BLOCKLIST_REASON);

        let result = self
            .client
            .post(format!("{}/bounces", self.domain_url))
            .basic_auth("api", Some(&self.api_key))
            .multipart(form)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                self.bounce_list.invalidate(&()).await;
                self.bounced.invalidate(&address.to_lowercase()).await;
                response
                    .json::<ApiMessage>()
                    .await
                    .ok()
                    .and_then(|m| m.message)
                    .unwrap_or_default()
            }
            Ok(response) => {
                warn!(status = %response.status(), "Mailgun rejected bounce entry");
                "Add failed".to_string()
            }
            Err(e) => {
                warn!("Failed to add bounce entry: {}", e);
                "Add failed".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::MemoryCache;
    use httpmock::prelude::*;

    fn sender(base_url: String, cache: Arc<dyn CacheService>) -> MailgunSender {
        let config = MailgunConfig {
            api_key: "key-123".to_string(),
            from: "Blog <noreply@mg.example.com>".to_string(),
            base_url,
        };
        MailgunSender::new(&config, cache).unwrap()
    }

    #[test]
    fn test_sender_domain() {
        assert_eq!(sender_domain("Blog <noreply@mg.example.com>"), "mg.example.com");
        assert_eq!(sender_domain("noreply@example.org"), "example.org");
    }

    #[tokio::test]
    async fn test_send_posts_message_and_logs_it() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/mg.example.com/messages")
                    .header_exists("authorization")
                    .body_contains("Welcome");
                then.status(200)
                    .json_body(serde_json::json!({"id": "<1@mg>", "message": "Queued"}));
            })
            .await;

        let cache = Arc::new(MemoryCache::new());
        let mailer = sender(server.base_url(), cache.clone());
        mailer
            .send("Welcome", "<p>hi</p>", "a@example.com", "203.0.113.1")
            .await
            .unwrap();

        mock.assert_async().await;
        let log = cache.set_members(&mail_log_key(Local::now())).await.unwrap();
        assert_eq!(log.len(), 1);
        let record: MailRecord = serde_json::from_str(&log[0]).unwrap();
        assert_eq!(record.tos, "a@example.com");
        assert_eq!(record.client_ip, "203.0.113.1");
    }

    #[tokio::test]
    async fn test_send_rejected_is_error_and_not_logged() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/mg.example.com/messages");
                then.status(401).body("Forbidden");
            })
            .await;

        let cache = Arc::new(MemoryCache::new());
        let mailer = sender(server.base_url(), cache.clone());
        let err = mailer.send("t", "c", "a@example.com", "ip").await.unwrap_err();

        assert!(matches!(err, MailError::Rejected { status: 401, .. }));
        assert!(cache.set_members(&mail_log_key(Local::now())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bounces_lists_addresses_and_caches() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v3/mg.example.com/bounces");
                then.status(200).json_body(serde_json::json!({
                    "items": [{"address": "x@example.com"}, {"address": "y@example.com"}]
                }));
            })
            .await;

        let mailer = sender(server.base_url(), Arc::new(MemoryCache::new()));
        assert_eq!(mailer.bounces().await, vec!["x@example.com", "y@example.com"]);
        assert_eq!(mailer.bounces().await.len(), 2);
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_bounces_failure_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v3/mg.example.com/bounces");
                then.status(500);
            })
            .await;

        let mailer = sender(server.base_url(), Arc::new(MemoryCache::new()));
        assert!(mailer.bounces().await.is_empty());
    }

    #[tokio::test]
    async fn test_has_bounced_checks_error_field() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/v3/mg.example.com/bounces/x");
                then.status(200)
                    .json_body(serde_json::json!({"address": "x@example.com", "error": "550"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/v3/mg.example.com/bounces/ok");
                then.status(404)
                    .json_body(serde_json::json!({"message": "Address not found"}));
            })
            .await;

        let mailer = sender(server.base_url(), Arc::new(MemoryCache::new()));
        assert!(mailer.has_bounced("x@example.com").await);
        assert!(!mailer.has_bounced("ok@example.com").await);
    }

    #[tokio::test]
    async fn test_has_bounced_keeps_reserved_characters_in_path() {
        let server = MockServer::start_async().await;
        let full = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path_contains("/v3/mg.example.com/bounces/odd")
                    .path_contains("example.org");
                then.status(200)
                    .json_body(serde_json::json!({"address": "odd#tag?x@example.org", "error": "550"}));
            })
            .await;

        let mailer = sender(server.base_url(), Arc::new(MemoryCache::new()));
        assert!(mailer.has_bounced("odd#tag?x@example.org").await);
        full.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_recipient_returns_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/mg.example.com/bounces")
                    .body_contains("bad@example.com");
                then.status(200).json_body(serde_json::json!({
                    "address": "bad@example.com",
                    "message": "1 address has been added to the bounces table"
                }));
            })
            .await;

        let mailer = sender(server.base_url(), Arc::new(MemoryCache::new()));
        assert_eq!(
            mailer.add_recipient("bad@example.com").await,
            "1 address has been added to the bounces table"
        );
    }

    #[tokio::test]
    async fn test_add_recipient_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/mg.example.com/bounces");
                then.status(400);
            })
            .await;

        let mailer = sender(server.base_url(), Arc::new(MemoryCache::new()));
        assert_eq!(mailer.add_recipient("bad@example.com").await, "Add failed");
    }
}
