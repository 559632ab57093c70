//! PostgreSQL implementation of login record repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{LoginRecord, NewLoginRecord};
use crate::domain::repositories::LoginRecordRepository;
use crate::error::AppError;

/// PostgreSQL repository for the login audit trail.
pub struct PgLoginRecordRepository {
    pool: Arc<PgPool>,
}

impl PgLoginRecordRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginRecordRepository for PgLoginRecordRepository {
    async fn insert(&self, record: NewLoginRecord) -> Result<LoginRecord, AppError> {
        let row = sqlx::query_as::<_, LoginRecord>(
            r#"
            INSERT INTO login_records (user_id, ip, physical_address, login_type, login_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, ip, physical_address, login_type, login_time
            "#,
        )
        .bind(record.user_id)
        .bind(&record.ip)
        .bind(&record.physical_address)
        .bind(record.login_type.as_str())
        .bind(record.login_time)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row)
    }

    async fn recent_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<LoginRecord>, AppError> {
        let rows = sqlx::query_as::<_, LoginRecord>(
            r#"
            SELECT id, user_id, ip, physical_address, login_type, login_time
            FROM login_records
            WHERE user_id = $1
            ORDER BY login_time DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }
}
