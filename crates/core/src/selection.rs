//! Question selection: category filtering plus random or token-seeded shuffling.
//!
//! Deterministic selection is what makes a quiz link shareable. The same
//! token, filter and bank always produce the same questions in the same order,
//! on any client, without a server round trip.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::model::Question;
use crate::token::QuizToken;

/// Filter value that disables category filtering.
pub const ALL_EXAMS: &str = "all";

/// Questions in a casual (untimed) quiz.
pub const CASUAL_QUIZ_SIZE: usize = 5;

/// Questions in a timed, link-shareable quiz.
pub const TIMED_QUIZ_SIZE: usize = 10;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;
const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("not enough questions: found {found}, need {needed}")]
    InsufficientQuestions { found: usize, needed: usize },
}

//
// ─── FILTER ────────────────────────────────────────────────────────────────────
//

/// Category filter over the bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ExamFilter {
    #[default]
    All,
    Exam(String),
}

impl ExamFilter {
    /// Parse a user-facing filter value. Empty input and `"all"` disable filtering.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == ALL_EXAMS {
            Self::All
        } else {
            Self::Exam(raw.to_owned())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_EXAMS,
            Self::Exam(exam) => exam,
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        match self {
            Self::All => true,
            Self::Exam(exam) => question.has_exam(exam),
        }
    }

    /// The pool: bank entries passing this filter, in bank order.
    #[must_use]
    pub fn pool(&self, bank: &[Question]) -> Vec<Question> {
        bank.iter().filter(|q| self.matches(q)).cloned().collect()
    }
}

impl fmt::Display for ExamFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distinct, sorted, non-empty exam labels present in the bank.
#[must_use]
pub fn exam_catalogue(bank: &[Question]) -> Vec<String> {
    bank.iter()
        .filter(|q| !q.exam.is_empty())
        .map(|q| q.exam.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

//
// ─── SEEDED RANDOMNESS ─────────────────────────────────────────────────────────
//

/// FNV-1a over the UTF-16 code units of `input`, 32-bit throughout.
///
/// For ASCII this is the same as hashing the bytes.
#[must_use]
pub fn fnv1a_32(input: &str) -> u32 {
    input.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Seed for a tokened quiz. The filter is part of the seed, so one token
/// gives different quizzes under different categories.
#[must_use]
pub fn seed_for(token: &QuizToken, filter: &ExamFilter) -> u32 {
    fnv1a_32(&format!("{token}|{filter}"))
}

/// Mulberry32: a tiny 32-bit generator with good avalanche behaviour.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform index in `0..bound`: `floor(next / 2^32 * bound)` computed
    /// exactly in integer arithmetic.
    pub fn next_index(&mut self, bound: usize) -> usize {
        let scaled = (u128::from(self.next_u32()) * bound as u128) >> 32;
        // scaled < bound, so it always fits back into usize.
        #[allow(clippy::cast_possible_truncation)]
        let idx = scaled as usize;
        idx
    }
}

/// Fisher-Yates shuffle of a copy of `items`, driven by Mulberry32.
#[must_use]
pub fn seeded_shuffle<T: Clone>(items: &[T], seed: u32) -> Vec<T> {
    let mut out = items.to_vec();
    let mut rng = Mulberry32::new(seed);
    for i in (1..out.len()).rev() {
        let j = rng.next_index(i + 1);
        out.swap(i, j);
    }
    out
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// How the questions of a quiz are drawn from the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// Fresh shuffle on every call.
    Random,
    /// Reproducible shuffle seeded from the token and filter.
    Deterministic(QuizToken),
}

/// Draw `size` questions from the filtered bank.
///
/// # Errors
///
/// Returns `SelectionError::InsufficientQuestions` if the filtered pool has
/// fewer than `size` entries.
pub fn select(
    bank: &[Question],
    filter: &ExamFilter,
    mode: &SelectionMode,
    size: usize,
) -> Result<Vec<Question>, SelectionError> {
    select_with_rng(bank, filter, mode, size, &mut rand::rng())
}

/// Same as [`select`], with the source used for `SelectionMode::Random`
/// supplied by the caller.
///
/// # Errors
///
/// Returns `SelectionError::InsufficientQuestions` if the filtered pool has
/// fewer than `size` entries.
pub fn select_with_rng<R: Rng + ?Sized>(
    bank: &[Question],
    filter: &ExamFilter,
    mode: &SelectionMode,
    size: usize,
    rng: &mut R,
) -> Result<Vec<Question>, SelectionError> {
    let pool = filter.pool(bank);
    if pool.len() < size {
        return Err(SelectionError::InsufficientQuestions {
            found: pool.len(),
            needed: size,
        });
    }

    let mut shuffled = match mode {
        SelectionMode::Random => {
            let mut pool = pool;
            pool.as_mut_slice().shuffle(rng);
            pool
        }
        SelectionMode::Deterministic(token) => seeded_shuffle(&pool, seed_for(token, filter)),
    };
    shuffled.truncate(size);
    Ok(shuffled)
}

/// Result of drawing a tokened quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSelection {
    pub questions: Vec<Question>,
    /// True when the category was too small and the whole bank was used.
    pub widened: bool,
}

/// Draw a tokened quiz, widening to the whole bank when the category is too small.
///
/// The seed still comes from the requested filter, so a widened quiz is as
/// reproducible as any other.
///
/// # Errors
///
/// Returns `SelectionError::InsufficientQuestions` if even the whole bank has
/// fewer than `size` entries.
pub fn select_for_token(
    bank: &[Question],
    filter: &ExamFilter,
    token: &QuizToken,
    size: usize,
) -> Result<TokenSelection, SelectionError> {
    let mode = SelectionMode::Deterministic(token.clone());
    match select(bank, filter, &mode, size) {
        Ok(questions) => Ok(TokenSelection {
            questions,
            widened: false,
        }),
        Err(SelectionError::InsufficientQuestions { .. }) if !filter.is_all() => {
            if bank.len() < size {
                return Err(SelectionError::InsufficientQuestions {
                    found: bank.len(),
                    needed: size,
                });
            }
            let mut questions = seeded_shuffle(bank, seed_for(token, filter));
            questions.truncate(size);
            Ok(TokenSelection {
                questions,
                widened: true,
            })
        }
        Err(err) => Err(err),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(id: usize, exam: &str) -> Question {
        Question {
            id: QuestionId::new(format!("q{id}")),
            exam: exam.to_owned(),
            year: Some(2020),
            prompt: format!("Question {id}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            answer: Some(0),
            explanation: String::new(),
            image: None,
        }
    }

    /// 12 questions, 7 in "A" and 5 in "B".
    fn bank() -> Vec<Question> {
        (0..12)
            .map(|i| question(i, if i < 7 { "A" } else { "B" }))
            .collect()
    }

    fn ids(questions: &[Question]) -> Vec<String> {
        questions.iter().map(|q| q.id.to_string()).collect()
    }

    #[test]
    fn fnv_matches_reference_values() {
        assert_eq!(fnv1a_32(""), 2_166_136_261);
        assert_eq!(fnv1a_32("a"), 0xE40C_292C);
        assert_eq!(fnv1a_32("ABCD|all"), 817_385_126);
    }

    #[test]
    fn mulberry_matches_reference_sequence() {
        let mut rng = Mulberry32::new(0);
        assert_eq!(rng.next_u32(), 1_144_304_738);
        assert_eq!(rng.next_u32(), 1_416_247);
        assert_eq!(rng.next_u32(), 958_946_056);
    }

    #[test]
    fn seeded_shuffle_matches_reference_permutation() {
        let items: Vec<usize> = (0..12).collect();
        let token = QuizToken::normalize("ABCD");
        let shuffled = seeded_shuffle(&items, seed_for(&token, &ExamFilter::All));
        assert_eq!(shuffled, vec![5, 10, 1, 4, 2, 8, 7, 6, 11, 3, 0, 9]);
    }

    #[test]
    fn deterministic_selection_is_repeatable() {
        let bank = bank();
        let mode = SelectionMode::Deterministic(QuizToken::normalize("WXYZ"));
        let first = select(&bank, &ExamFilter::All, &mode, TIMED_QUIZ_SIZE).unwrap();
        let second = select(&bank, &ExamFilter::All, &mode, TIMED_QUIZ_SIZE).unwrap();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), TIMED_QUIZ_SIZE);
    }

    #[test]
    fn different_tokens_give_different_orders() {
        let bank = bank();
        let a = select(
            &bank,
            &ExamFilter::All,
            &SelectionMode::Deterministic(QuizToken::normalize("ABCD")),
            TIMED_QUIZ_SIZE,
        )
        .unwrap();
        let b = select(
            &bank,
            &ExamFilter::All,
            &SelectionMode::Deterministic(QuizToken::normalize("ABCE")),
            TIMED_QUIZ_SIZE,
        )
        .unwrap();
        assert_ne!(ids(&a), ids(&b));
    }

    #[test]
    fn filter_is_part_of_the_seed() {
        let token = QuizToken::normalize("ABCD");
        assert_ne!(
            seed_for(&token, &ExamFilter::All),
            seed_for(&token, &ExamFilter::parse("A"))
        );
    }

    #[test]
    fn insufficient_filtered_pool_is_reported() {
        let err = select(
            &bank(),
            &ExamFilter::parse("A"),
            &SelectionMode::Random,
            TIMED_QUIZ_SIZE,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientQuestions {
                found: 7,
                needed: 10
            }
        );
    }

    #[test]
    fn random_selection_respects_filter_and_size() {
        let mut rng = StdRng::seed_from_u64(99);
        let picked = select_with_rng(
            &bank(),
            &ExamFilter::parse("B"),
            &SelectionMode::Random,
            CASUAL_QUIZ_SIZE,
            &mut rng,
        )
        .unwrap();
        assert_eq!(picked.len(), CASUAL_QUIZ_SIZE);
        assert!(picked.iter().all(|q| q.exam == "B"));
        let mut unique = ids(&picked);
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), CASUAL_QUIZ_SIZE);
    }

    #[test]
    fn tokened_selection_widens_small_category() {
        let bank = bank();
        let token = QuizToken::normalize("ABCD");
        let picked =
            select_for_token(&bank, &ExamFilter::parse("A"), &token, TIMED_QUIZ_SIZE).unwrap();
        assert!(picked.widened);
        assert_eq!(picked.questions.len(), TIMED_QUIZ_SIZE);

        let again =
            select_for_token(&bank, &ExamFilter::parse("A"), &token, TIMED_QUIZ_SIZE).unwrap();
        assert_eq!(ids(&picked.questions), ids(&again.questions));
    }

    #[test]
    fn tokened_selection_fails_when_whole_bank_is_too_small() {
        let small: Vec<Question> = bank().into_iter().take(4).collect();
        let err = select_for_token(
            &small,
            &ExamFilter::All,
            &QuizToken::normalize("ABCD"),
            TIMED_QUIZ_SIZE,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SelectionError::InsufficientQuestions {
                found: 4,
                needed: 10
            }
        );
    }

    #[test]
    fn filter_parsing_treats_all_and_blank_alike() {
        assert_eq!(ExamFilter::parse("all"), ExamFilter::All);
        assert_eq!(ExamFilter::parse("  "), ExamFilter::All);
        assert_eq!(ExamFilter::parse("A").as_str(), "A");
    }

    #[test]
    fn catalogue_is_sorted_and_distinct() {
        let mut bank = bank();
        bank.push(question(99, ""));
        assert_eq!(exam_catalogue(&bank), vec!["A".to_owned(), "B".to_owned()]);
    }
}
