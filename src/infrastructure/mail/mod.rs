//! Outbound mail delivery.

mod mailgun;

pub use mailgun::MailgunSender;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// An entry of the daily mail log.
///
/// Field names match the entries already stored in existing mail logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailRecord {
    pub title: String,
    pub content: String,
    pub tos: String,
    pub time: DateTime<Local>,
    #[serde(rename = "clientip")]
    pub client_ip: String,
}

/// Cache set holding the mail log of a given day.
pub fn mail_log_key(day: DateTime<Local>) -> String {
    format!("Email:{}", day.format("%Y%m%d"))
}

/// Sends mail and manages the provider's bounce list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Sends an HTML message to a comma separated recipient list.
    async fn send(
        &self,
        title: &str,
        content: &str,
        tos: &str,
        client_ip: &str,
    ) -> Result<(), MailError>;

    /// Addresses on the bounce list; empty when the provider can't be reached.
    async fn bounces(&self) -> Vec<String>;

    /// Whether the address is on the bounce list.
    async fn has_bounced(&self, address: &str) -> bool;

    /// Puts an address on the bounce list and returns the provider's message.
    async fn add_recipient(&self, address: &str) -> String;
}
