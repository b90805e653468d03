use chrono::{DateTime, Utc};
use quiz_core::timer::timer_key;
use quiz_core::token::QuizToken;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{StorageError, TimerStateRepository};

#[async_trait::async_trait]
impl TimerStateRepository for SqliteRepository {
    async fn get_timer_start(
        &self,
        token: &QuizToken,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row = sqlx::query("SELECT started_at FROM timer_starts WHERE key = ?1")
            .bind(timer_key(token))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| row.try_get::<DateTime<Utc>, _>("started_at").map_err(ser))
            .transpose()
    }

    async fn put_timer_start(
        &self,
        token: &QuizToken,
        started_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO timer_starts (key, started_at)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET started_at = excluded.started_at
            ",
        )
        .bind(timer_key(token))
        .bind(started_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn clear_timer_start(&self, token: &QuizToken) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM timer_starts WHERE key = ?1")
            .bind(timer_key(token))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
