//! Four-letter quiz tokens.
//!
//! A token seeds a deterministic quiz. Anything a user can paste into a link
//! normalizes to a valid token, so opening a link never fails because of it.

use rand::Rng;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub const TOKEN_LEN: usize = 4;

/// Substituted for characters outside `A-Z` and used to pad short input.
pub const TOKEN_FILLER: char = 'A';

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Exactly four uppercase ASCII letters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuizToken(String);

impl QuizToken {
    /// Normalize arbitrary input into a token.
    ///
    /// Uppercases, keeps the first four characters, replaces anything outside
    /// `A-Z` with [`TOKEN_FILLER`] and pads with it when the input is short.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let mut token: String = raw
            .to_uppercase()
            .chars()
            .take(TOKEN_LEN)
            .map(|c| if c.is_ascii_uppercase() { c } else { TOKEN_FILLER })
            .collect();
        while token.len() < TOKEN_LEN {
            token.push(TOKEN_FILLER);
        }
        Self(token)
    }

    /// A fresh token drawn from the thread-local generator.
    #[must_use]
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    #[must_use]
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let token = (0..TOKEN_LEN)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();
        Self(token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for QuizToken {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::normalize(s))
    }
}

impl fmt::Display for QuizToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for QuizToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuizToken({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn is_valid(token: &QuizToken) -> bool {
        token.as_str().len() == TOKEN_LEN && token.as_str().bytes().all(|b| b.is_ascii_uppercase())
    }

    #[test]
    fn lowercase_is_folded() {
        assert_eq!(QuizToken::normalize("abcd").as_str(), "ABCD");
    }

    #[test]
    fn long_input_is_truncated() {
        assert_eq!(QuizToken::normalize("wxyzq").as_str(), "WXYZ");
    }

    #[test]
    fn non_letters_are_replaced_with_filler() {
        assert_eq!(QuizToken::normalize("a1-z").as_str(), "AAAZ");
        assert_eq!(QuizToken::normalize("é!x?").as_str(), "AAXA");
    }

    #[test]
    fn short_input_is_padded() {
        assert_eq!(QuizToken::normalize("").as_str(), "AAAA");
        assert_eq!(QuizToken::normalize("q").as_str(), "QAAA");
    }

    #[test]
    fn every_input_normalizes_to_four_letters() {
        let inputs = [
            "", " ", "ß", "ßßßß", "🙂🙂", "abc def", "\u{0}\u{1}", "ZZZZZZZZ", "12345", "ǅx",
        ];
        for input in inputs {
            let token = QuizToken::normalize(input);
            assert!(is_valid(&token), "{input:?} -> {token:?}");
        }
    }

    #[test]
    fn parse_never_fails() {
        let token: QuizToken = "?!".parse().unwrap();
        assert_eq!(token.as_str(), "AAAA");
    }

    #[test]
    fn random_tokens_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(is_valid(&QuizToken::random_with(&mut rng)));
        }
        assert!(is_valid(&QuizToken::random()));
    }
}
