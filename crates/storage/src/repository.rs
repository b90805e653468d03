use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptRecord, QuestionId, ScoreRecord, UserId, WrongAnswerRecord};
use quiz_core::timer::timer_key;
use quiz_core::token::QuizToken;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// The record addressed by a conditional write does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}

/// Per-user wrong-answer records, one per (user, question).
///
/// Conditional writes report a missing record as `StorageError::NotFound`;
/// the caller decides what that means.
#[async_trait]
pub trait WrongAnswerRepository: Send + Sync {
    /// Every record held for `user`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn list_wrong_answers(&self, user: &UserId)
    -> Result<Vec<WrongAnswerRecord>, StorageError>;

    /// Atomically bump `count` and stamp `last_wrong` on an existing record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no record to increment.
    async fn increment_miss(
        &self,
        user: &UserId,
        question_id: &QuestionId,
        snapshot: &str,
        at: DateTime<Utc>,
    ) -> Result<WrongAnswerRecord, StorageError>;

    /// Write `record` as the whole record for (user, question).
    ///
    /// Overwrites whatever is there; concurrent creates are not deduplicated.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn create_miss(
        &self,
        user: &UserId,
        record: &WrongAnswerRecord,
    ) -> Result<(), StorageError>;

    /// Stamp `last_correct` on an existing record, leaving `count` alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no record to update.
    async fn mark_correct(
        &self,
        user: &UserId,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<WrongAnswerRecord, StorageError>;
}

/// Durable start instants for timed quizzes, keyed by token.
#[async_trait]
pub trait TimerStateRepository: Send + Sync {
    /// `None` means the countdown has not been started for this token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be read.
    async fn get_timer_start(
        &self,
        token: &QuizToken,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be written.
    async fn put_timer_start(
        &self,
        token: &QuizToken,
        started_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Forget the start instant. Clearing an absent entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be written.
    async fn clear_timer_start(&self, token: &QuizToken) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the score cannot be stored.
    async fn append_score(&self, score: &ScoreRecord) -> Result<i64, StorageError>;

    /// Most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the scores cannot be read.
    async fn list_scores(&self, user: &UserId, limit: u32)
    -> Result<Vec<ScoreRecord>, StorageError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// Most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempts cannot be read.
    async fn list_attempts(&self, user: &UserId) -> Result<Vec<AttemptRecord>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    wrong_answers: Arc<Mutex<HashMap<(UserId, QuestionId), WrongAnswerRecord>>>,
    timers: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    scores: Arc<Mutex<Vec<ScoreRecord>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl WrongAnswerRepository for InMemoryRepository {
    async fn list_wrong_answers(
        &self,
        user: &UserId,
    ) -> Result<Vec<WrongAnswerRecord>, StorageError> {
        let guard = self.wrong_answers.lock().map_err(poisoned)?;
        let mut out: Vec<_> = guard
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|(_, rec)| rec.clone())
            .collect();
        out.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        Ok(out)
    }

    async fn increment_miss(
        &self,
        user: &UserId,
        question_id: &QuestionId,
        snapshot: &str,
        at: DateTime<Utc>,
    ) -> Result<WrongAnswerRecord, StorageError> {
        let mut guard = self.wrong_answers.lock().map_err(poisoned)?;
        let rec = guard
            .get_mut(&(user.clone(), question_id.clone()))
            .ok_or(StorageError::NotFound)?;
        rec.record_miss(snapshot, at);
        Ok(rec.clone())
    }

    async fn create_miss(
        &self,
        user: &UserId,
        record: &WrongAnswerRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self.wrong_answers.lock().map_err(poisoned)?;
        guard.insert((user.clone(), record.question_id.clone()), record.clone());
        Ok(())
    }

    async fn mark_correct(
        &self,
        user: &UserId,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<WrongAnswerRecord, StorageError> {
        let mut guard = self.wrong_answers.lock().map_err(poisoned)?;
        let rec = guard
            .get_mut(&(user.clone(), question_id.clone()))
            .ok_or(StorageError::NotFound)?;
        rec.record_correct(at);
        Ok(rec.clone())
    }
}

#[async_trait]
impl TimerStateRepository for InMemoryRepository {
    async fn get_timer_start(
        &self,
        token: &QuizToken,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let guard = self.timers.lock().map_err(poisoned)?;
        Ok(guard.get(&timer_key(token)).copied())
    }

    async fn put_timer_start(
        &self,
        token: &QuizToken,
        started_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.timers.lock().map_err(poisoned)?;
        guard.insert(timer_key(token), started_at);
        Ok(())
    }

    async fn clear_timer_start(&self, token: &QuizToken) -> Result<(), StorageError> {
        let mut guard = self.timers.lock().map_err(poisoned)?;
        guard.remove(&timer_key(token));
        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn append_score(&self, score: &ScoreRecord) -> Result<i64, StorageError> {
        let mut guard = self.scores.lock().map_err(poisoned)?;
        guard.push(score.clone());
        i64::try_from(guard.len()).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list_scores(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<ScoreRecord>, StorageError> {
        let guard = self.scores.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard
            .iter()
            .rev()
            .filter(|s| &s.user_id == user)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        guard.push(attempt.clone());
        i64::try_from(guard.len()).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list_attempts(&self, user: &UserId) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let mut out: Vec<_> = guard
            .iter()
            .filter(|a| &a.user_id == user)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(out)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub wrong_answers: Arc<dyn WrongAnswerRepository>,
    pub timers: Arc<dyn TimerStateRepository>,
    pub scores: Arc<dyn ScoreRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            wrong_answers: Arc::new(repo.clone()),
            timers: Arc::new(repo.clone()),
            scores: Arc::new(repo.clone()),
            attempts: Arc::new(repo),
        }
    }
}
