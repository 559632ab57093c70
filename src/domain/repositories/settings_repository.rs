//! Repository trait for system settings.

use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for the `system_settings` key/value table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Loads every setting as `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn load_all(&self) -> Result<Vec<(String, String)>, AppError>;

    /// Creates or replaces a setting.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn set(&self, name: &str, value: &str) -> Result<(), AppError>;
}
