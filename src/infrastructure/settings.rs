//! In-memory view of the `system_settings` table.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::repositories::SettingsRepository;
use crate::error::AppError;

pub const SETTING_TITLE: &str = "Title";
pub const SETTING_DENY_AREA: &str = "DenyArea";
pub const SETTING_WATERMARK: &str = "Watermark";

/// Site-wide settings shared by request handlers.
#[derive(Debug, Default)]
pub struct SystemSettings {
    values: RwLock<HashMap<String, String>>,
}

impl SystemSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }

    /// The value of a setting, or an empty string when unset.
    pub fn get_or_empty(&self, name: &str) -> String {
        self.get(name).unwrap_or_default()
    }

    pub fn set(&self, name: &str, value: &str) {
        self.values
            .write()
            .insert(name.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Replaces every setting with the repository's current contents.
    pub async fn refresh(&self, repository: &dyn SettingsRepository) -> Result<usize, AppError> {
        let pairs = repository.load_all().await?;
        let count = pairs.len();
        *self.values.write() = pairs.into_iter().collect();
        debug!(count, "System settings refreshed");
        Ok(count)
    }

    /// Refreshes from the repository on `interval`. Failed refreshes keep the
    /// previous values.
    pub fn spawn_refresher(
        self: Arc<Self>,
        repository: Arc<dyn SettingsRepository>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh(repository.as_ref()).await {
                    warn!("Failed to refresh system settings: {}", e);
                }
            }
        })
    }
}
