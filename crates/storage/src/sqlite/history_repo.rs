use quiz_core::model::{AttemptRecord, ScoreRecord, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_attempt_row, map_score_row};
use crate::repository::{AttemptRepository, ScoreRepository, StorageError};

#[async_trait::async_trait]
impl ScoreRepository for SqliteRepository {
    async fn append_score(&self, score: &ScoreRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO scores (user_id, email, score, total, exam, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(score.user_id.as_str())
        .bind(score.email.as_deref())
        .bind(i64::from(score.score))
        .bind(i64::from(score.total))
        .bind(&score.exam)
        .bind(score.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_scores(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<ScoreRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, email, score, total, exam, created_at
            FROM scores
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_score_row).collect()
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO attempts (user_id, question_id, question_text, correct, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(attempt.user_id.as_str())
        .bind(attempt.question_id.as_str())
        .bind(&attempt.question_text)
        .bind(i64::from(attempt.correct))
        .bind(attempt.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_attempts(&self, user: &UserId) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, question_id, question_text, correct, recorded_at
            FROM attempts
            WHERE user_id = ?1
            ORDER BY recorded_at DESC, id DESC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
