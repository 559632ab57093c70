//! Repository trait for login audit records.

use crate::domain::entities::{LoginRecord, NewLoginRecord};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for login records written by the background worker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginRecordRepository: Send + Sync {
    /// Persists a login event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn insert(&self, record: NewLoginRecord) -> Result<LoginRecord, AppError>;

    /// Returns the most recent logins of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn recent_for_user(&self, user_id: i64, limit: i64)
    -> Result<Vec<LoginRecord>, AppError>;
}
