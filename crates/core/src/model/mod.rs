mod history;
mod ids;
mod question;
mod wrong_answer;

pub use history::{AttemptRecord, ScoreRecord};
pub use ids::{QuestionId, UserId};
pub use question::{
    LooseOptions, LooseScalar, NO_EXPLANATION, Question, QuestionDraft, UNKNOWN_EXAM,
};
pub use wrong_answer::WrongAnswerRecord;
