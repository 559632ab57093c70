//! PostgreSQL implementation of settings repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::repositories::SettingsRepository;
use crate::error::AppError;

/// PostgreSQL repository for the `system_settings` table.
pub struct PgSettingsRepository {
    pool: Arc<PgPool>,
}

impl PgSettingsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn load_all(&self) -> Result<Vec<(String, String)>, AppError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT name, value FROM system_settings ORDER BY name",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO system_settings (name, value)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
