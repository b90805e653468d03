//! Shareable quiz links: `?quiz=TOKEN&exam=FILTER`.

use thiserror::Error;
use url::Url;

use crate::selection::ExamFilter;
use crate::token::QuizToken;

pub const QUIZ_PARAM: &str = "quiz";
pub const EXAM_PARAM: &str = "exam";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShareLinkError {
    #[error("invalid link: {0}")]
    Url(#[from] url::ParseError),
}

/// The state a link carries. Opening it reproduces the exact question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub token: QuizToken,
    pub filter: ExamFilter,
}

impl ShareLink {
    #[must_use]
    pub fn new(token: QuizToken, filter: ExamFilter) -> Self {
        Self { token, filter }
    }

    /// Write this link's state into `base`, keeping unrelated query pairs.
    ///
    /// The `exam` pair is left out when the filter is "all".
    #[must_use]
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        let kept: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(k, _)| k != QUIZ_PARAM && k != EXAM_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
            pairs.append_pair(QUIZ_PARAM, self.token.as_str());
            if !self.filter.is_all() {
                pairs.append_pair(EXAM_PARAM, self.filter.as_str());
            }
        }
        url
    }

    /// Read link state from a URL. `None` when there is no `quiz` pair.
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        let mut token = None;
        let mut filter = ExamFilter::All;
        for (k, v) in url.query_pairs() {
            if k == QUIZ_PARAM {
                token = Some(QuizToken::normalize(&v));
            } else if k == EXAM_PARAM {
                filter = ExamFilter::parse(&v);
            }
        }
        token.map(|token| Self { token, filter })
    }

    /// Parse a link string.
    ///
    /// # Errors
    ///
    /// Returns `ShareLinkError::Url` if `raw` is not an absolute URL.
    pub fn parse(raw: &str) -> Result<Option<Self>, ShareLinkError> {
        let url = Url::parse(raw)?;
        Ok(Self::from_url(&url))
    }
}
