//! Saved scores, per-question attempts, and the profile summary built from them.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use quiz_core::Clock;
use quiz_core::grading::{GradeResult, Outcome};
use quiz_core::model::{AttemptRecord, Question, QuestionId, ScoreRecord, UserId};
use storage::repository::{AttemptRepository, ScoreRepository, StorageError};
use tracing::warn;

/// Attempts shown per question in the profile.
pub const ATTEMPTS_PER_QUESTION: usize = 10;

/// Attempts for one question, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAttempts {
    pub question_id: QuestionId,
    pub question_text: String,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub total: usize,
    pub correct: usize,
    /// Rounded percentage; zero when there are no attempts.
    pub accuracy: u32,
    pub by_question: Vec<QuestionAttempts>,
}

impl ProfileStats {
    /// Summarize attempts given newest first.
    #[must_use]
    pub fn from_attempts(attempts: &[AttemptRecord]) -> Self {
        let total = attempts.len();
        let correct = attempts.iter().filter(|a| a.correct).count();
        let accuracy = if total == 0 {
            0
        } else {
            u32::try_from((correct * 100 + total / 2) / total).unwrap_or(100)
        };

        let mut index: HashMap<&QuestionId, usize> = HashMap::new();
        let mut by_question: Vec<QuestionAttempts> = Vec::new();
        for attempt in attempts {
            let slot = *index.entry(&attempt.question_id).or_insert_with(|| {
                let question_text = if attempt.question_text.is_empty() {
                    attempt.question_id.to_string()
                } else {
                    attempt.question_text.clone()
                };
                by_question.push(QuestionAttempts {
                    question_id: attempt.question_id.clone(),
                    question_text,
                    attempts: Vec::new(),
                });
                by_question.len() - 1
            });
            let group = &mut by_question[slot];
            if group.attempts.len() < ATTEMPTS_PER_QUESTION {
                group.attempts.push(attempt.clone());
            }
        }

        Self {
            total,
            correct,
            accuracy,
            by_question,
        }
    }
}

#[derive(Clone)]
pub struct HistoryService {
    clock: Clock,
    scores: Arc<dyn ScoreRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(
        clock: Clock,
        scores: Arc<dyn ScoreRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            scores,
            attempts,
        }
    }

    /// Persist a graded quiz's score.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the score cannot be stored.
    pub async fn save_score(
        &self,
        user: &UserId,
        email: Option<String>,
        result: &GradeResult,
        exam: &str,
    ) -> Result<ScoreRecord, StorageError> {
        let record = ScoreRecord {
            user_id: user.clone(),
            email,
            score: u32::try_from(result.correct).unwrap_or(u32::MAX),
            total: u32::try_from(result.total).unwrap_or(u32::MAX),
            exam: exam.to_owned(),
            created_at: self.clock.now(),
        };
        self.scores.append_score(&record).await?;
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the scores cannot be read.
    pub async fn recent_scores(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<ScoreRecord>, StorageError> {
        self.scores.list_scores(user, limit).await
    }

    /// Append one attempt per graded question. Best effort: failures are
    /// logged and counted, never returned.
    pub async fn record_attempts(
        &self,
        user: &UserId,
        questions: &[Question],
        result: &GradeResult,
    ) -> usize {
        let recorded_at = self.clock.now();
        let writes = questions.iter().zip(&result.questions).map(|(question, grade)| {
            let attempt = AttemptRecord {
                user_id: user.clone(),
                question_id: question.id.clone(),
                question_text: question.prompt.clone(),
                correct: grade.outcome == Outcome::Correct,
                recorded_at,
            };
            async move { (attempt.question_id.clone(), self.attempts.append_attempt(&attempt).await) }
        });

        let mut failed = 0;
        for (question_id, outcome) in join_all(writes).await {
            if let Err(err) = outcome {
                warn!(user = %user, question = %question_id, error = %err, "failed to record attempt");
                failed += 1;
            }
        }
        failed
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the attempts cannot be read.
    pub async fn profile(&self, user: &UserId) -> Result<ProfileStats, StorageError> {
        let attempts = self.attempts.list_attempts(user).await?;
        Ok(ProfileStats::from_attempts(&attempts))
    }
}
