use chrono::{DateTime, Utc};
use quiz_core::grading::{GradeResult, Selections};
use quiz_core::model::Question;
use quiz_core::selection::ExamFilter;
use quiz_core::share::ShareLink;
use quiz_core::token::QuizToken;

use crate::error::SessionError;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Where the orchestrator is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No question bank yet.
    Empty,
    /// Bank available, no question set drawn.
    Loaded,
    /// A question set is accepting selections.
    Active,
    /// The current set has been graded.
    Graded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKind {
    /// Untokened random quiz.
    Casual,
    /// Tokened, shareable, and under a countdown.
    Timed { token: QuizToken },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz attempt over a fixed question set.
#[derive(Debug, Clone)]
pub struct QuizSession {
    kind: SessionKind,
    filter: ExamFilter,
    questions: Vec<Question>,
    selections: Selections,
    result: Option<GradeResult>,
    started_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    pub(crate) fn casual(filter: ExamFilter, questions: Vec<Question>) -> Self {
        Self {
            kind: SessionKind::Casual,
            filter,
            questions,
            selections: Selections::new(),
            result: None,
            started_at: None,
        }
    }

    pub(crate) fn timed(
        token: QuizToken,
        filter: ExamFilter,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: SessionKind::Timed { token },
            filter,
            questions,
            selections: Selections::new(),
            result: None,
            started_at: Some(started_at),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    #[must_use]
    pub fn token(&self) -> Option<&QuizToken> {
        match &self.kind {
            SessionKind::Timed { token } => Some(token),
            SessionKind::Casual => None,
        }
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        matches!(self.kind, SessionKind::Timed { .. })
    }

    #[must_use]
    pub fn filter(&self) -> &ExamFilter {
        &self.filter
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    #[must_use]
    pub fn result(&self) -> Option<&GradeResult> {
        self.result.as_ref()
    }

    /// Persisted start instant; timed sessions only.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.result.is_some() {
            Phase::Graded
        } else {
            Phase::Active
        }
    }

    /// The link that reopens this exact question set.
    #[must_use]
    pub fn share_link(&self) -> Option<ShareLink> {
        self.token()
            .map(|token| ShareLink::new(token.clone(), self.filter.clone()))
    }

    pub(crate) fn choose(&mut self, position: usize, option: usize) -> Result<(), SessionError> {
        if self.result.is_some() {
            return Err(SessionError::AlreadyGraded);
        }
        let valid = self
            .questions
            .get(position)
            .is_some_and(|q| option < q.options.len());
        if !valid {
            return Err(SessionError::InvalidSelection { position, option });
        }
        self.selections.choose(position, option);
        Ok(())
    }

    pub(crate) fn set_result(&mut self, result: GradeResult) {
        self.result = Some(result);
    }

    /// Back to a fresh attempt over the same questions.
    pub(crate) fn reset(&mut self, started_at: Option<DateTime<Utc>>) {
        self.selections.clear();
        self.result = None;
        self.started_at = started_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    fn question() -> Question {
        Question {
            id: QuestionId::new("q1"),
            exam: "A".into(),
            year: None,
            prompt: "p".into(),
            options: vec!["x".into(), "y".into()],
            answer: Some(1),
            explanation: String::new(),
            image: None,
        }
    }

    #[test]
    fn rejects_out_of_range_choices() {
        let mut session = QuizSession::casual(ExamFilter::All, vec![question()]);
        assert!(matches!(
            session.choose(0, 2),
            Err(SessionError::InvalidSelection { position: 0, option: 2 })
        ));
        assert!(matches!(
            session.choose(1, 0),
            Err(SessionError::InvalidSelection { position: 1, option: 0 })
        ));
        session.choose(0, 1).unwrap();
        assert_eq!(session.selections().get(0), Some(1));
    }

    #[test]
    fn graded_session_refuses_edits_until_reset() {
        let mut session = QuizSession::casual(ExamFilter::All, vec![question()]);
        session.set_result(GradeResult {
            correct: 0,
            total: 1,
            questions: Vec::new(),
        });
        assert_eq!(session.phase(), Phase::Graded);
        assert!(matches!(session.choose(0, 0), Err(SessionError::AlreadyGraded)));

        session.reset(None);
        assert_eq!(session.phase(), Phase::Active);
        assert!(session.selections().is_empty());
    }
}
