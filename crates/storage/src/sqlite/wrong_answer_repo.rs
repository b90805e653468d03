use chrono::{DateTime, Utc};
use quiz_core::model::{QuestionId, UserId, WrongAnswerRecord};

use super::SqliteRepository;
use super::mapping::{conn, map_wrong_answer_row};
use crate::repository::{StorageError, WrongAnswerRepository};

#[async_trait::async_trait]
impl WrongAnswerRepository for SqliteRepository {
    async fn list_wrong_answers(
        &self,
        user: &UserId,
    ) -> Result<Vec<WrongAnswerRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT question_id, count, last_wrong, last_correct, question_snapshot
            FROM wrong_answers
            WHERE user_id = ?1
            ORDER BY question_id ASC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_wrong_answer_row).collect()
    }

    async fn increment_miss(
        &self,
        user: &UserId,
        question_id: &QuestionId,
        snapshot: &str,
        at: DateTime<Utc>,
    ) -> Result<WrongAnswerRecord, StorageError> {
        let row = sqlx::query(
            r"
            UPDATE wrong_answers
            SET count = count + 1,
                last_wrong = ?3,
                question_snapshot = ?4
            WHERE user_id = ?1 AND question_id = ?2
            RETURNING question_id, count, last_wrong, last_correct, question_snapshot
            ",
        )
        .bind(user.as_str())
        .bind(question_id.as_str())
        .bind(at)
        .bind(snapshot)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_wrong_answer_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn create_miss(
        &self,
        user: &UserId,
        record: &WrongAnswerRecord,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO wrong_answers (user_id, question_id, count, last_wrong, last_correct, question_snapshot)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, question_id) DO UPDATE SET
                count = excluded.count,
                last_wrong = excluded.last_wrong,
                last_correct = excluded.last_correct,
                question_snapshot = excluded.question_snapshot
            ",
        )
        .bind(user.as_str())
        .bind(record.question_id.as_str())
        .bind(i64::from(record.count))
        .bind(record.last_wrong)
        .bind(record.last_correct)
        .bind(&record.question_snapshot)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn mark_correct(
        &self,
        user: &UserId,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<WrongAnswerRecord, StorageError> {
        let row = sqlx::query(
            r"
            UPDATE wrong_answers
            SET last_correct = ?3
            WHERE user_id = ?1 AND question_id = ?2
            RETURNING question_id, count, last_wrong, last_correct, question_snapshot
            ",
        )
        .bind(user.as_str())
        .bind(question_id.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => map_wrong_answer_row(&row),
            None => Err(StorageError::NotFound),
        }
    }
}
