//! Presentation-agnostic projection of the current session.
//!
//! Everything a front end needs to draw the quiz; no markup, no styling.

use quiz_core::grading::OptionMark;
use quiz_core::selection::ExamFilter;
use quiz_core::share::ShareLink;

use super::state::Phase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub index: usize,
    pub label: String,
    pub selected: bool,
    /// `Plain` until the set is graded.
    pub mark: OptionMark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 1-based, as shown to the user.
    pub number: usize,
    pub meta: String,
    pub prompt: String,
    pub image: Option<String>,
    pub options: Vec<OptionView>,
    /// Cumulative miss count when the question is currently missed.
    pub previously_missed: Option<u32>,
    /// Revealed once graded.
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreView {
    pub label: String,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub phase: Phase,
    pub filter: ExamFilter,
    pub share_link: Option<ShareLink>,
    /// `MM:SS` while a countdown is attached.
    pub remaining: Option<String>,
    pub score: Option<ScoreView>,
    pub questions: Vec<QuestionView>,
}
