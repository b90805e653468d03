//! Grading of a submitted question set.
//!
//! Unanswered questions score as wrong and are tracked as misses, but they are
//! never shown with a "wrong" marker: only the correct option is marked.

use std::collections::BTreeMap;

use crate::model::{Question, QuestionId};

//
// ─── SELECTIONS ────────────────────────────────────────────────────────────────
//

/// Chosen option per question position. Entries only come from user input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections(BTreeMap<usize, usize>);

impl Selections {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a choice, replacing any earlier choice for the same position.
    pub fn choose(&mut self, position: usize, option: usize) {
        self.0.insert(position, option);
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<usize> {
        self.0.get(&position).copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
}

impl Outcome {
    /// Incorrect and unanswered both count against the score.
    #[must_use]
    pub fn is_wrong(self) -> bool {
        !matches!(self, Outcome::Correct)
    }
}

/// How one option is shown after grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Plain,
    Correct,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionGrade {
    pub position: usize,
    pub question_id: QuestionId,
    pub outcome: Outcome,
    pub chosen: Option<usize>,
    /// One mark per option of the question.
    pub marks: Vec<OptionMark>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    pub correct: usize,
    pub total: usize,
    pub questions: Vec<QuestionGrade>,
}

impl GradeResult {
    /// Score in `[0, 1]`; zero for an empty set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Score as a rounded percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }

    /// `"3 / 5"`.
    #[must_use]
    pub fn score_label(&self) -> String {
        format!("{} / {}", self.correct, self.total)
    }
}

/// Wrong-answer tracking work produced by one grading pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Answered wrong or left blank.
    Missed {
        question_id: QuestionId,
        snapshot: String,
    },
    /// Answered right after having been missed before.
    Corrected { question_id: QuestionId },
}

impl SyncEvent {
    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        match self {
            SyncEvent::Missed { question_id, .. } | SyncEvent::Corrected { question_id } => {
                question_id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graded {
    pub result: GradeResult,
    pub events: Vec<SyncEvent>,
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Grade `questions` against `selections`.
///
/// `previously_missed` reports whether the wrong-answer cache currently marks
/// a question as missed; correct answers to those become `Corrected` events.
/// Questions are never modified.
pub fn grade(
    questions: &[Question],
    selections: &Selections,
    previously_missed: impl Fn(&QuestionId) -> bool,
) -> Graded {
    let mut graded = Vec::with_capacity(questions.len());
    let mut events = Vec::new();
    let mut correct = 0;

    for (position, question) in questions.iter().enumerate() {
        let chosen = selections.get(position);
        let outcome = match chosen {
            Some(choice) if question.is_correct(choice) => Outcome::Correct,
            Some(_) => Outcome::Incorrect,
            None => Outcome::Unanswered,
        };

        let mut marks = vec![OptionMark::Plain; question.options.len()];
        if let Some(idx) = question.correct_option() {
            marks[idx] = OptionMark::Correct;
        }
        if outcome == Outcome::Incorrect {
            if let Some(mark) = chosen.and_then(|c| marks.get_mut(c)) {
                *mark = OptionMark::Wrong;
            }
        }

        match outcome {
            Outcome::Correct => {
                correct += 1;
                if previously_missed(&question.id) {
                    events.push(SyncEvent::Corrected {
                        question_id: question.id.clone(),
                    });
                }
            }
            Outcome::Incorrect | Outcome::Unanswered => events.push(SyncEvent::Missed {
                question_id: question.id.clone(),
                snapshot: question.prompt.clone(),
            }),
        }

        graded.push(QuestionGrade {
            position,
            question_id: question.id.clone(),
            outcome,
            chosen,
            marks,
        });
    }

    Graded {
        result: GradeResult {
            correct,
            total: questions.len(),
            questions: graded,
        },
        events,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, answer: Option<usize>) -> Question {
        Question {
            id: QuestionId::new(id),
            exam: "A".into(),
            year: None,
            prompt: format!("prompt {id}"),
            options: vec!["w".into(), "x".into(), "y".into(), "z".into()],
            answer,
            explanation: String::new(),
            image: None,
        }
    }

    #[test]
    fn wrong_pick_marks_chosen_and_correct_options() {
        let questions = vec![question("q1", Some(2))];
        let mut selections = Selections::new();
        selections.choose(0, 1);

        let graded = grade(&questions, &selections, |_| false);
        let q = &graded.result.questions[0];

        assert_eq!(q.outcome, Outcome::Incorrect);
        assert_eq!(q.marks[2], OptionMark::Correct);
        assert_eq!(q.marks[1], OptionMark::Wrong);
        assert_eq!(q.marks[0], OptionMark::Plain);
        assert_eq!(graded.result.correct, 0);
    }

    #[test]
    fn unanswered_counts_wrong_without_wrong_marker() {
        let questions = vec![question("q1", Some(3))];
        let graded = grade(&questions, &Selections::new(), |_| false);
        let q = &graded.result.questions[0];

        assert_eq!(q.outcome, Outcome::Unanswered);
        assert!(q.outcome.is_wrong());
        assert!(!q.marks.contains(&OptionMark::Wrong));
        assert_eq!(q.marks[3], OptionMark::Correct);
        assert_eq!(
            graded.events,
            vec![SyncEvent::Missed {
                question_id: QuestionId::new("q1"),
                snapshot: "prompt q1".into()
            }]
        );
    }

    #[test]
    fn correct_answer_is_still_marked() {
        let questions = vec![question("q1", Some(0))];
        let mut selections = Selections::new();
        selections.choose(0, 0);

        let graded = grade(&questions, &selections, |_| false);
        assert_eq!(graded.result.questions[0].marks[0], OptionMark::Correct);
        assert_eq!(graded.result.percent(), 100);
        assert!(graded.events.is_empty());
    }

    #[test]
    fn previously_missed_correct_answer_becomes_correction() {
        let questions = vec![question("q1", Some(0)), question("q2", Some(0))];
        let mut selections = Selections::new();
        selections.choose(0, 0);
        selections.choose(1, 0);

        let graded = grade(&questions, &selections, |id| id.as_str() == "q2");
        assert_eq!(
            graded.events,
            vec![SyncEvent::Corrected {
                question_id: QuestionId::new("q2")
            }]
        );
    }

    #[test]
    fn malformed_answer_key_marks_nothing_correct() {
        let questions = vec![question("q1", Some(9)), question("q2", None)];
        let mut selections = Selections::new();
        selections.choose(0, 9);
        selections.choose(1, 0);

        let graded = grade(&questions, &selections, |_| false);
        for q in &graded.result.questions {
            assert_eq!(q.outcome, Outcome::Incorrect);
            assert!(!q.marks.contains(&OptionMark::Correct));
        }
    }

    #[test]
    fn score_is_fraction_and_rounded_percent() {
        let questions: Vec<_> = (0..3).map(|i| question(&format!("q{i}"), Some(0))).collect();
        let mut selections = Selections::new();
        selections.choose(0, 0);
        selections.choose(1, 1);

        let graded = grade(&questions, &selections, |_| false);
        assert_eq!(graded.result.correct, 1);
        assert_eq!(graded.result.total, 3);
        assert!((graded.result.fraction() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(graded.result.percent(), 33);
        assert_eq!(graded.result.score_label(), "1 / 3");
        assert_eq!(graded.events.len(), 2);
    }

    #[test]
    fn empty_set_scores_zero() {
        let graded = grade(&[], &Selections::new(), |_| false);
        assert_eq!(graded.result.percent(), 0);
    }
}
