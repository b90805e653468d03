//! Question bank sources.
//!
//! A bank is a JSON array of question objects. Every entry is default-filled
//! at this boundary, so nothing downstream sees a missing field.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quiz_core::model::{Question, QuestionDraft};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("question bank request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("question bank request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("question bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("question bank is not a list of questions")]
    NotASequence,
}

/// Parse a bank document into default-filled questions, in document order.
///
/// # Errors
///
/// Returns `BankError::Parse` for invalid JSON and `BankError::NotASequence`
/// if the top level is not an array. A single bad entry never fails the bank:
/// an element that is not an object loads as an all-default question.
pub fn parse_bank(raw: &str) -> Result<Vec<Question>, BankError> {
    let doc: Value = serde_json::from_str(raw)?;
    let Value::Array(entries) = doc else {
        return Err(BankError::NotASequence);
    };

    let questions = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let draft = serde_json::from_value::<QuestionDraft>(entry).unwrap_or_else(|err| {
                warn!(index, error = %err, "question bank entry is not an object; using defaults");
                QuestionDraft::default()
            });
            draft.into_question(index)
        })
        .collect();
    Ok(questions)
}

/// Anything that can produce the question bank.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if the bank cannot be read or parsed.
    async fn fetch_questions(&self) -> Result<Vec<Question>, BankError>;

    /// Where the bank comes from, for log lines.
    fn describe(&self) -> String;
}

/// A bank stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl QuestionSource for JsonFileSource {
    async fn fetch_questions(&self) -> Result<Vec<Question>, BankError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let questions = parse_bank(&raw)?;
        info!(path = %self.path.display(), count = questions.len(), "loaded question bank");
        Ok(questions)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A bank served over HTTP. Every fetch bypasses caches.
#[derive(Debug, Clone)]
pub struct HttpQuestionSource {
    client: Client,
    url: String,
}

impl HttpQuestionSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch_questions(&self) -> Result<Vec<Question>, BankError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BankError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let questions = parse_bank(&body)?;
        info!(url = %self.url, count = questions.len(), "loaded question bank");
        Ok(questions)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// A fixed bank held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    questions: Vec<Question>,
}

impl StaticSource {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

#[async_trait]
impl QuestionSource for StaticSource {
    async fn fetch_questions(&self) -> Result<Vec<Question>, BankError> {
        Ok(self.questions.clone())
    }

    fn describe(&self) -> String {
        format!("{} built-in questions", self.questions.len())
    }
}

/// Pick a source for `location`: `http(s)://` URLs are fetched, anything else
/// is read as a file path.
#[must_use]
pub fn source_for(location: &str) -> Box<dyn QuestionSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpQuestionSource::new(location))
    } else {
        Box::new(JsonFileSource::new(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_sequence_documents() {
        let err = parse_bank(r#"{"questions": []}"#).unwrap_err();
        assert!(matches!(err, BankError::NotASequence));
    }

    #[test]
    fn fills_defaults_and_synthesizes_ids() {
        let questions = parse_bank(
            r#"[
                {"exam": "AWS", "year": 2021, "question": "Pick one", "options": ["a", "b"], "answer": 1},
                {"question": "Bare"},
                {"id": 42, "question": "Numbered", "answer": -1}
            ]"#,
        )
        .unwrap();

        assert_eq!(questions[0].id.as_str(), "AWS-2021-0");
        assert_eq!(questions[0].correct_option(), Some(1));
        assert_eq!(questions[1].id.as_str(), "Q-0-1");
        assert!(questions[1].options.is_empty());
        assert_eq!(questions[1].explanation_text(), "No explanation provided.");
        assert_eq!(questions[2].id.as_str(), "42");
        assert_eq!(questions[2].correct_option(), None);
    }

    #[test]
    fn loosely_typed_entries_load_instead_of_failing_the_bank() {
        let questions = parse_bank(
            r#"[
                {"id": "a", "options": ["x", "y"], "answer": "1"},
                {"id": "b", "options": ["x", "y"], "answer": 1.0},
                {"id": "c", "exam": "AWS", "year": "2021", "options": "not a list"},
                42
            ]"#,
        )
        .unwrap();

        assert_eq!(questions.len(), 4);
        assert_eq!(questions[0].correct_option(), None);
        assert_eq!(questions[1].correct_option(), Some(1));
        assert_eq!(questions[2].year, Some(2021));
        assert_eq!(questions[2].meta_line(), "AWS • 2021");
        assert!(questions[2].options.is_empty());
        assert_eq!(questions[3].id.as_str(), "Q-0-3");
        assert_eq!(questions[3].correct_option(), None);
    }

    #[test]
    fn picks_source_by_scheme() {
        assert_eq!(source_for("https://x.test/q.json").describe(), "https://x.test/q.json");
        assert_eq!(source_for("bank/q.json").describe(), "bank/q.json");
    }
}
