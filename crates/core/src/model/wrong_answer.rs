use chrono::{DateTime, Utc};

use crate::model::ids::QuestionId;

/// Per-user history of misses and corrections for one question.
///
/// `count` only ever grows. A correction stamps `last_correct` and leaves the
/// count alone, so the history survives the question being answered right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrongAnswerRecord {
    pub question_id: QuestionId,
    pub count: u32,
    pub last_wrong: Option<DateTime<Utc>>,
    pub last_correct: Option<DateTime<Utc>>,
    pub question_snapshot: String,
}

impl WrongAnswerRecord {
    /// A freshly created record for a first miss.
    #[must_use]
    pub fn first_miss(
        question_id: QuestionId,
        question_snapshot: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            question_id,
            count: 1,
            last_wrong: Some(at),
            last_correct: None,
            question_snapshot: question_snapshot.into(),
        }
    }

    /// Apply another miss on top of an existing record.
    pub fn record_miss(&mut self, question_snapshot: &str, at: DateTime<Utc>) {
        self.count = self.count.saturating_add(1);
        self.last_wrong = Some(at);
        question_snapshot.clone_into(&mut self.question_snapshot);
    }

    pub fn record_correct(&mut self, at: DateTime<Utc>) {
        self.last_correct = Some(at);
    }

    /// True when the most recent evaluation was correct.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match (self.last_correct, self.last_wrong) {
            (Some(correct), Some(wrong)) => correct > wrong,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
