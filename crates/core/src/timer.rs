//! Countdown arithmetic for timed quizzes.

use chrono::{DateTime, Duration, Utc};

use crate::token::QuizToken;

/// Length of a timed quiz.
pub const TIMED_QUIZ_MINUTES: i64 = 10;

/// How often a running countdown reports remaining time.
pub const POLL_INTERVAL_MILLIS: u64 = 500;

/// Storage key of the persisted start instant for a token.
#[must_use]
pub fn timer_key(token: &QuizToken) -> String {
    format!("timed_{token}_start")
}

/// A countdown anchored at a persisted start instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl Countdown {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + self.duration
    }

    /// Elapsed time at `now`; zero if `now` precedes the start.
    #[must_use]
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.started_at)
            .max(Duration::zero())
    }

    /// Remaining time at `now`, clamped at zero.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.duration - self.elapsed_at(now)).max(Duration::zero())
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_at(now) <= Duration::zero()
    }
}

/// `MM:SS`, truncating partial seconds. Negative input shows as `00:00`.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn countdown() -> Countdown {
        Countdown::new(fixed_now(), Duration::minutes(TIMED_QUIZ_MINUTES))
    }

    #[test]
    fn remaining_counts_down_from_duration() {
        let c = countdown();
        assert_eq!(c.remaining_at(fixed_now()), Duration::minutes(10));
        assert_eq!(
            c.remaining_at(fixed_now() + Duration::seconds(75)),
            Duration::seconds(525)
        );
    }

    #[test]
    fn remaining_never_goes_negative() {
        let c = countdown();
        let late = fixed_now() + Duration::minutes(30);
        assert_eq!(c.remaining_at(late), Duration::zero());
        assert!(c.is_expired_at(late));
        assert!(c.is_expired_at(c.deadline()));
        assert!(!c.is_expired_at(c.deadline() - Duration::milliseconds(1)));
    }

    #[test]
    fn clock_skew_before_start_reads_as_full_duration() {
        let c = countdown();
        assert_eq!(
            c.remaining_at(fixed_now() - Duration::minutes(1)),
            Duration::minutes(10)
        );
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(Duration::minutes(10)), "10:00");
        assert_eq!(format_remaining(Duration::milliseconds(65_900)), "01:05");
        assert_eq!(format_remaining(Duration::seconds(-3)), "00:00");
    }

    #[test]
    fn key_is_scoped_to_token() {
        assert_eq!(timer_key(&QuizToken::normalize("abcd")), "timed_ABCD_start");
    }
}
