mod orchestrator;
mod state;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use orchestrator::{EngineEvent, QuizOrchestrator, Submission, Wake};
pub use state::{Phase, QuizSession, SessionKind};
pub use view::{OptionView, QuestionView, ScoreView, SessionView};
