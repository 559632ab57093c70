//! PostgreSQL implementation of variable repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{UpsertVariable, Variable};
use crate::domain::repositories::VariableRepository;
use crate::error::AppError;

/// PostgreSQL repository for key/value variables.
///
/// Keys are unique; saving an existing key replaces its value.
pub struct PgVariableRepository {
    pool: Arc<PgPool>,
}

impl PgVariableRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VariableRepository for PgVariableRepository {
    async fn list(&self) -> Result<Vec<Variable>, AppError> {
        let rows = sqlx::query_as::<_, Variable>("SELECT id, key, value FROM variables ORDER BY key")
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows)
    }

    async fn upsert(&self, variable: UpsertVariable) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO variables (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(&variable.key)
        .bind(&variable.value)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM variables WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
