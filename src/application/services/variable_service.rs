//! Admin-managed key/value variables.

use serde_json::json;
use std::sync::Arc;

use crate::domain::entities::{UpsertVariable, Variable};
use crate::domain::repositories::VariableRepository;
use crate::error::AppError;

pub const MAX_KEY_LENGTH: usize = 255;

pub struct VariableService<R: VariableRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: VariableRepository + ?Sized> VariableService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> Result<Vec<Variable>, AppError> {
        self.repository.list().await
    }

    /// Creates or replaces the variable with the same key.
    ///
    /// Returns `true` when a row was written.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when the key is empty or longer than
    /// [`MAX_KEY_LENGTH`] characters.
    pub async fn save(&self, key: &str, value: &str) -> Result<bool, AppError> {
        let key = key.trim();
        let len = key.chars().count();
        if len == 0 || len > MAX_KEY_LENGTH {
            return Err(AppError::bad_request(
                "Invalid variable key",
                json!({"reason": format!("Key must be 1 to {MAX_KEY_LENGTH} characters")}),
            ));
        }

        let written = self
            .repository
            .upsert(UpsertVariable {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await?;
        Ok(written > 0)
    }

    /// Returns `true` when a variable was deleted.
    pub async fn delete(&self, id: i32) -> Result<bool, AppError> {
        self.repository.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockVariableRepository;

    #[tokio::test]
    async fn test_save_trims_key() {
        let mut repo = MockVariableRepository::new();
        repo.expect_upsert()
            .withf(|v| v.key == "footer" && v.value == "<b>hi</b>")
            .times(1)
            .returning(|_| Ok(1));

        let service = VariableService::new(Arc::new(repo));
        assert!(service.save("  footer ", "<b>hi</b>").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_rejects_bad_keys() {
        let service = VariableService::new(Arc::new(MockVariableRepository::new()));

        assert!(service.save("   ", "v").await.is_err());
        assert!(service.save(&"k".repeat(256), "v").await.is_err());
    }

    #[tokio::test]
    async fn test_save_reports_nothing_written() {
        let mut repo = MockVariableRepository::new();
        repo.expect_upsert().returning(|_| Ok(0));

        let service = VariableService::new(Arc::new(repo));
        assert!(!service.save("k", "v").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let mut repo = MockVariableRepository::new();
        repo.expect_delete().withf(|id| *id == 3).returning(|_| Ok(true));
        repo.expect_delete().withf(|id| *id == 4).returning(|_| Ok(false));

        let service = VariableService::new(Arc::new(repo));
        assert!(service.delete(3).await.unwrap());
        assert!(!service.delete(4).await.unwrap());
    }
}
