//! PostgreSQL implementation of [`MessageStore`].

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use super::types::{validate_message, HelloMessage};
use super::MessageStore;
use crate::error::{StoreError, StoreResult};

/// Message store backed by the `hello_worlds` table.
#[derive(Debug, Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool for `dsn`, failing if no connection is established within
    /// `connect_timeout`.
    pub async fn connect(dsn: &str, connect_timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(connect_timeout)
            .connect(dsn)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create(&self, text: &str) -> StoreResult<HelloMessage> {
        let text = validate_message(text)?;
        let record = sqlx::query_as::<_, HelloMessage>(
            r#"
            INSERT INTO hello_worlds (message)
            VALUES ($1)
            RETURNING id, message
            "#,
        )
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = record.id, "Inserted message");
        Ok(record)
    }

    async fn list(&self) -> StoreResult<Vec<HelloMessage>> {
        // Ids are monotonic, so id order is insertion order.
        let records = sqlx::query_as::<_, HelloMessage>(
            r#"
            SELECT id, message
            FROM hello_worlds
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get(&self, id: i64) -> StoreResult<HelloMessage> {
        sqlx::query_as::<_, HelloMessage>(
            r#"
            SELECT id, message
            FROM hello_worlds
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { id })
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM hello_worlds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }

        debug!(id, "Deleted message");
        Ok(())
    }

    async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hello_worlds")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hello_worlds (
                id BIGSERIAL PRIMARY KEY,
                message VARCHAR(255) NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Schema for hello_worlds is in place");
        Ok(())
    }
}
