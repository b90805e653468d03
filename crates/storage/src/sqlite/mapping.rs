use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptRecord, QuestionId, ScoreRecord, UserId, WrongAnswerRecord};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn map_wrong_answer_row(row: &SqliteRow) -> Result<WrongAnswerRecord, StorageError> {
    let question_id: String = row.try_get("question_id").map_err(ser)?;
    let count: i64 = row.try_get("count").map_err(ser)?;
    let last_wrong: Option<DateTime<Utc>> = row.try_get("last_wrong").map_err(ser)?;
    let last_correct: Option<DateTime<Utc>> = row.try_get("last_correct").map_err(ser)?;
    let question_snapshot: String = row.try_get("question_snapshot").map_err(ser)?;

    Ok(WrongAnswerRecord {
        question_id: QuestionId::new(question_id),
        count: u32_from_i64("count", count)?,
        last_wrong,
        last_correct,
        question_snapshot,
    })
}

pub(crate) fn map_score_row(row: &SqliteRow) -> Result<ScoreRecord, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let score: i64 = row.try_get("score").map_err(ser)?;
    let total: i64 = row.try_get("total").map_err(ser)?;

    Ok(ScoreRecord {
        user_id: UserId::new(user_id),
        email: row.try_get("email").map_err(ser)?,
        score: u32_from_i64("score", score)?,
        total: u32_from_i64("total", total)?,
        exam: row.try_get("exam").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRecord, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let question_id: String = row.try_get("question_id").map_err(ser)?;
    let correct: i64 = row.try_get("correct").map_err(ser)?;

    Ok(AttemptRecord {
        user_id: UserId::new(user_id),
        question_id: QuestionId::new(question_id),
        question_text: row.try_get("question_text").map_err(ser)?,
        correct: correct != 0,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}
