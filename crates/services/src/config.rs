use std::time::Duration as StdDuration;

use chrono::Duration;
use quiz_core::selection::{CASUAL_QUIZ_SIZE, TIMED_QUIZ_SIZE};
use quiz_core::timer::{POLL_INTERVAL_MILLIS, TIMED_QUIZ_MINUTES};

/// Sizes and timings for quiz sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    casual_size: usize,
    timed_size: usize,
    timed_duration: Duration,
    poll_interval: StdDuration,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            casual_size: CASUAL_QUIZ_SIZE,
            timed_size: TIMED_QUIZ_SIZE,
            timed_duration: Duration::minutes(TIMED_QUIZ_MINUTES),
            poll_interval: StdDuration::from_millis(POLL_INTERVAL_MILLIS),
        }
    }
}

impl QuizConfig {
    #[must_use]
    pub fn with_casual_size(mut self, size: usize) -> Self {
        self.casual_size = size;
        self
    }

    #[must_use]
    pub fn with_timed_size(mut self, size: usize) -> Self {
        self.timed_size = size;
        self
    }

    #[must_use]
    pub fn with_timed_duration(mut self, duration: Duration) -> Self {
        self.timed_duration = duration;
        self
    }

    /// A zero interval is bumped to one millisecond; tokio intervals reject zero.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: StdDuration) -> Self {
        self.poll_interval = interval.max(StdDuration::from_millis(1));
        self
    }

    #[must_use]
    pub fn casual_size(&self) -> usize {
        self.casual_size
    }

    #[must_use]
    pub fn timed_size(&self) -> usize {
        self.timed_size
    }

    #[must_use]
    pub fn timed_duration(&self) -> Duration {
        self.timed_duration
    }

    #[must_use]
    pub fn poll_interval(&self) -> StdDuration {
        self.poll_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_quiz() {
        let config = QuizConfig::default();
        assert_eq!(config.casual_size(), 5);
        assert_eq!(config.timed_size(), 10);
        assert_eq!(config.timed_duration(), Duration::minutes(10));
        assert_eq!(config.poll_interval(), StdDuration::from_millis(500));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config = QuizConfig::default().with_poll_interval(StdDuration::ZERO);
        assert_eq!(config.poll_interval(), StdDuration::from_millis(1));
    }
}
