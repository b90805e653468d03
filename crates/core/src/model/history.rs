use chrono::{DateTime, Utc};

use crate::model::ids::{QuestionId, UserId};

/// A saved quiz score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub user_id: UserId,
    pub email: Option<String>,
    pub score: u32,
    pub total: u32,
    pub exam: String,
    pub created_at: DateTime<Utc>,
}

/// One graded answer to one question, kept for the profile view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub question_text: String,
    pub correct: bool,
    pub recorded_at: DateTime<Utc>,
}
