//! Persisted countdown for timed quizzes.
//!
//! The start instant lives in a `TimerStateRepository` keyed by token, so a
//! second `start` with the same token resumes the countdown instead of
//! resetting it. Remaining time is published on a `watch` channel at the poll
//! interval; expiry is signalled once, after which polling stops.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use quiz_core::timer::{Countdown, format_remaining};
use quiz_core::token::QuizToken;
use storage::repository::TimerStateRepository;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::Clock;
use crate::config::QuizConfig;
use crate::error::TimerError;

#[derive(Clone)]
pub struct SessionTimer {
    clock: Clock,
    store: Arc<dyn TimerStateRepository>,
    duration: Duration,
    poll_interval: StdDuration,
}

impl SessionTimer {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn TimerStateRepository>, config: &QuizConfig) -> Self {
        Self {
            clock,
            store,
            duration: config.timed_duration(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Start or resume the countdown for `token`.
    ///
    /// Must be called from within a tokio runtime; polling runs on a spawned task.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::Storage` if the start instant cannot be read or written.
    pub async fn start(&self, token: &QuizToken) -> Result<RunningCountdown, TimerError> {
        let now = self.clock.now();
        let started_at = match self.store.get_timer_start(token).await? {
            Some(started_at) => {
                debug!(%token, %started_at, "resuming timed quiz");
                started_at
            }
            None => {
                self.store.put_timer_start(token, now).await?;
                debug!(%token, started_at = %now, "starting timed quiz");
                now
            }
        };

        let countdown = Countdown::new(started_at, self.duration);
        let remaining = countdown.remaining_at(now);
        Ok(RunningCountdown::spawn(
            token.clone(),
            countdown,
            remaining,
            self.poll_interval,
        ))
    }

    /// Forget the persisted start and begin again from now.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::Storage` if the start instant cannot be cleared or written.
    pub async fn restart(&self, token: &QuizToken) -> Result<RunningCountdown, TimerError> {
        self.store.clear_timer_start(token).await?;
        debug!(%token, "timed quiz restarted");
        self.start(token).await
    }

    /// Time since the persisted start; zero if the countdown was never started.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::Storage` if the start instant cannot be read.
    pub async fn elapsed(&self, token: &QuizToken) -> Result<Duration, TimerError> {
        let started_at = self.store.get_timer_start(token).await?;
        Ok(started_at.map_or_else(Duration::zero, |s| {
            Countdown::new(s, self.duration).elapsed_at(self.clock.now())
        }))
    }
}

/// Handle to a countdown whose poll task is running.
///
/// Dropping the handle cancels polling.
#[derive(Debug)]
pub struct RunningCountdown {
    token: QuizToken,
    countdown: Countdown,
    remaining: watch::Receiver<StdDuration>,
    expiry: Option<oneshot::Receiver<()>>,
    expired: bool,
    task: JoinHandle<()>,
}

impl RunningCountdown {
    fn spawn(
        token: QuizToken,
        countdown: Countdown,
        remaining: Duration,
        poll_interval: StdDuration,
    ) -> Self {
        let initial = remaining.to_std().unwrap_or(StdDuration::ZERO);
        let deadline = Instant::now() + initial;
        let (remaining_tx, remaining_rx) = watch::channel(initial);
        let (expiry_tx, expiry_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let left = deadline.saturating_duration_since(Instant::now());
                remaining_tx.send_replace(left);
                if left.is_zero() {
                    let _ = expiry_tx.send(());
                    break;
                }
            }
        });

        Self {
            token,
            countdown,
            remaining: remaining_rx,
            expiry: Some(expiry_rx),
            expired: false,
            task,
        }
    }

    #[must_use]
    pub fn token(&self) -> &QuizToken {
        &self.token
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.countdown.started_at()
    }

    /// Latest remaining time published by the poll task.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        Duration::from_std(*self.remaining.borrow()).unwrap_or_else(|_| Duration::zero())
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn remaining_label(&self) -> String {
        format_remaining(self.remaining())
    }

    /// A receiver of remaining-time updates, for display loops.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StdDuration> {
        self.remaining.clone()
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.expired
    }

    /// Resolves once, when the countdown reaches zero. Pending forever after
    /// that, or if polling was cancelled first. Cancel safe.
    pub async fn expired(&mut self) {
        if let Some(rx) = self.expiry.as_mut() {
            let fired = rx.await.is_ok();
            self.expiry = None;
            if fired {
                self.expired = true;
                debug!(token = %self.token, "timed quiz expired");
                return;
            }
        }
        std::future::pending::<()>().await;
    }

    /// Stop polling. Expiry will not fire.
    pub fn stop(&mut self) {
        self.task.abort();
    }
}

impl Drop for RunningCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
