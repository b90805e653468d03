#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod sessions;
pub mod timer;
pub mod wrong_answers;

pub use quiz_core::Clock;
pub use sessions as session;

pub use config::QuizConfig;
pub use error::{SessionError, SyncError, SyncOperation, TimerError};
pub use history::{HistoryService, ProfileStats, QuestionAttempts};
pub use identity::{Identity, IdentityProvider, WatchIdentityProvider};
pub use sessions::{
    EngineEvent, Phase, QuizOrchestrator, QuizSession, SessionKind, SessionView, Submission,
    Wake,
};
pub use timer::{RunningCountdown, SessionTimer};
pub use wrong_answers::{SyncReport, WrongAnswerSync};
