use serde::Deserialize;
use serde::de::IgnoredAny;

use crate::model::ids::QuestionId;

/// Shown when the bank carries no explanation for a question.
pub const NO_EXPLANATION: &str = "No explanation provided.";

/// Shown in the meta line when a question has no exam label.
pub const UNKNOWN_EXAM: &str = "Unknown";

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as loaded from the bank.
///
/// Read-only from the engine's point of view. `answer` is expected to index
/// into `options`, but that is not enforced: an answer that is missing or out
/// of range simply means no option is ever marked correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub exam: String,
    pub year: Option<i32>,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: Option<usize>,
    pub explanation: String,
    pub image: Option<String>,
}

impl Question {
    /// Index of the correct option, if the answer key points at a real option.
    #[must_use]
    pub fn correct_option(&self) -> Option<usize> {
        self.answer.filter(|idx| *idx < self.options.len())
    }

    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        self.correct_option() == Some(choice)
    }

    #[must_use]
    pub fn has_exam(&self, exam: &str) -> bool {
        self.exam == exam
    }

    /// `"<exam> • <year>"`, with placeholders for missing parts.
    #[must_use]
    pub fn meta_line(&self) -> String {
        let exam = if self.exam.is_empty() {
            UNKNOWN_EXAM
        } else {
            self.exam.as_str()
        };
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        format!("{exam} • {year}")
    }

    #[must_use]
    pub fn explanation_text(&self) -> &str {
        if self.explanation.trim().is_empty() {
            NO_EXPLANATION
        } else {
            &self.explanation
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A scalar as an authored bank may spell it.
///
/// Banks are hand-edited, so a number may arrive quoted or as a float, and a
/// text field may hold a number. Anything else is kept as `Other` and read as
/// absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseScalar {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl LooseScalar {
    /// Integral numbers only: `1` and `1.0` count, `"1"` does not.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i64),
            _ => None,
        }
    }

    /// A year as a number or a numeric string.
    #[must_use]
    pub fn as_year(&self) -> Option<i32> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            other => other.as_index().and_then(|n| i32::try_from(n).ok()),
        }
    }

    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            Self::Integer(n) => Some(n.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Other(_) => None,
        }
    }
}

/// `options` as a list, or anything else (read as no options).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseOptions {
    List(Vec<LooseScalar>),
    Other(IgnoredAny),
}

/// Permissive shape of one bank entry.
///
/// Every field is optional and loosely typed so that a sparse or sloppy entry
/// still loads; defaults are filled in by [`QuestionDraft::into_question`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuestionDraft {
    pub id: Option<LooseScalar>,
    pub exam: Option<LooseScalar>,
    pub year: Option<LooseScalar>,
    #[serde(alias = "prompt")]
    pub question: Option<LooseScalar>,
    pub options: Option<LooseOptions>,
    pub answer: Option<LooseScalar>,
    pub explanation: Option<LooseScalar>,
    pub image: Option<LooseScalar>,
}

impl QuestionDraft {
    /// Fill defaults and produce a `Question`.
    ///
    /// `index` is the entry's position in the bank and only matters when the
    /// entry has no id: the id is then synthesized as `{exam}-{year}-{index}`,
    /// using `Q` and `0` for a missing exam or year.
    ///
    /// An answer that is not an integral number means no option is correct.
    /// An option that is not text or a number becomes an empty label, so the
    /// remaining options keep their positions.
    #[must_use]
    pub fn into_question(self, index: usize) -> Question {
        let exam = self.exam.and_then(LooseScalar::into_text).unwrap_or_default();
        let year = self.year.as_ref().and_then(LooseScalar::as_year);
        let id = match self.id.and_then(LooseScalar::into_text) {
            Some(id) => QuestionId::new(id),
            None => QuestionId::new(format!(
                "{}-{}-{index}",
                if exam.is_empty() { "Q" } else { exam.as_str() },
                year.unwrap_or(0)
            )),
        };
        let options = match self.options {
            Some(LooseOptions::List(items)) => items
                .into_iter()
                .map(|item| item.into_text().unwrap_or_default())
                .collect(),
            Some(LooseOptions::Other(_)) | None => Vec::new(),
        };

        Question {
            id,
            exam,
            year,
            prompt: self
                .question
                .and_then(LooseScalar::into_text)
                .unwrap_or_default(),
            options,
            answer: self
                .answer
                .as_ref()
                .and_then(LooseScalar::as_index)
                .and_then(|a| usize::try_from(a).ok()),
            explanation: self
                .explanation
                .and_then(LooseScalar::into_text)
                .unwrap_or_default(),
            image: self
                .image
                .and_then(LooseScalar::into_text)
                .filter(|s| !s.is_empty()),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(json: &str) -> QuestionDraft {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn full_entry_maps_fields() {
        let q = draft(
            r#"{"id":"x1","exam":"A","year":2021,"question":"2+2?",
                "options":["3","4"],"answer":1,"explanation":"basic"}"#,
        )
        .into_question(0);

        assert_eq!(q.id, QuestionId::new("x1"));
        assert_eq!(q.prompt, "2+2?");
        assert_eq!(q.correct_option(), Some(1));
        assert!(q.is_correct(1));
        assert_eq!(q.meta_line(), "A • 2021");
    }

    #[test]
    fn missing_id_is_synthesized_from_exam_year_and_index() {
        let q = draft(r#"{"exam":"B","year":2019}"#).into_question(7);
        assert_eq!(q.id.as_str(), "B-2019-7");

        let bare = QuestionDraft::default().into_question(3);
        assert_eq!(bare.id.as_str(), "Q-0-3");
    }

    #[test]
    fn numeric_id_is_stringified() {
        let q = draft(r#"{"id":42}"#).into_question(0);
        assert_eq!(q.id.as_str(), "42");
    }

    #[test]
    fn sparse_entry_degrades_instead_of_failing() {
        let q = draft(r#"{"question":"?","answer":-1}"#).into_question(0);
        assert!(q.options.is_empty());
        assert_eq!(q.answer, None);
        assert_eq!(q.correct_option(), None);
        assert_eq!(q.explanation_text(), NO_EXPLANATION);
        assert_eq!(q.meta_line(), "Unknown • ");
    }

    #[test]
    fn out_of_range_answer_marks_nothing_correct() {
        let q = draft(r#"{"options":["a","b"],"answer":5}"#).into_question(0);
        assert_eq!(q.answer, Some(5));
        assert_eq!(q.correct_option(), None);
        assert!(!q.is_correct(5));
    }

    #[test]
    fn quoted_or_float_answers_follow_strict_number_matching() {
        let quoted = draft(r#"{"options":["a","b"],"answer":"1"}"#).into_question(0);
        assert_eq!(quoted.correct_option(), None);

        let float = draft(r#"{"options":["a","b"],"answer":1.0}"#).into_question(0);
        assert_eq!(float.correct_option(), Some(1));

        let fractional = draft(r#"{"options":["a","b"],"answer":0.5}"#).into_question(0);
        assert_eq!(fractional.answer, None);
    }

    #[test]
    fn loosely_typed_fields_degrade_instead_of_failing() {
        let q = draft(
            r#"{"exam":"B","year":"2021","question":7,"options":["a",2,{"x":1}],
                "image":false,"explanation":null}"#,
        )
        .into_question(4);

        assert_eq!(q.year, Some(2021));
        assert_eq!(q.id.as_str(), "B-2021-4");
        assert_eq!(q.prompt, "7");
        assert_eq!(q.options, vec!["a".to_owned(), "2".to_owned(), String::new()]);
        assert_eq!(q.image, None);
        assert_eq!(q.explanation_text(), NO_EXPLANATION);

        let odd = draft(r#"{"year":"soon","options":"a,b","id":[1]}"#).into_question(2);
        assert_eq!(odd.year, None);
        assert!(odd.options.is_empty());
        assert_eq!(odd.id.as_str(), "Q-0-2");
    }
}
