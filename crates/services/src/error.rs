//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use quiz_core::model::QuestionId;
use quiz_core::selection::SelectionError;
use quiz_core::share::ShareLinkError;
use storage::bank::BankError;
use storage::repository::StorageError;

/// Which wrong-answer mutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    RecordMiss,
    RecordCorrection,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOperation::RecordMiss => f.write_str("record miss"),
            SyncOperation::RecordCorrection => f.write_str("record correction"),
        }
    }
}

/// Errors emitted by `WrongAnswerSync`. Never fatal to a quiz.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("failed to {operation} for question {question_id}: {source}")]
    Write {
        question_id: QuestionId,
        operation: SyncOperation,
        #[source]
        source: StorageError,
    },
    #[error("failed to refresh wrong answers: {0}")]
    Refresh(#[source] StorageError),
}

/// Errors emitted by `SessionTimer`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TimerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the quiz orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question bank loaded")]
    NoBank,
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("no quiz in progress")]
    NotActive,
    #[error("quiz already graded")]
    AlreadyGraded,
    #[error("question {position} has no option {option}")]
    InvalidSelection { position: usize, option: usize },
    #[error("quiz is not timed")]
    NotTimed,
    #[error("restart was not confirmed")]
    RestartNotConfirmed,
    #[error("sign in to save scores")]
    NotSignedIn,
    #[error("quiz has not been graded yet")]
    NotGraded,
    #[error("link does not carry a quiz token")]
    MissingToken,
    #[error(transparent)]
    Link(#[from] ShareLinkError),
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
