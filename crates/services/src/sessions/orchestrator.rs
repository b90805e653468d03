use std::sync::Arc;

use quiz_core::grading::{GradeResult, OptionMark, grade};
use quiz_core::model::{Question, ScoreRecord};
use quiz_core::selection::{
    ExamFilter, SelectionMode, TokenSelection, exam_catalogue, select_for_token, select_with_rng,
};
use quiz_core::share::ShareLink;
use quiz_core::token::QuizToken;
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::bank::QuestionSource;
use storage::repository::Storage;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use super::state::{Phase, QuizSession};
use super::view::{OptionView, QuestionView, ScoreView, SessionView};
use crate::Clock;
use crate::config::QuizConfig;
use crate::error::SessionError;
use crate::history::{HistoryService, ProfileStats};
use crate::identity::{Identity, IdentityProvider};
use crate::timer::{RunningCountdown, SessionTimer};
use crate::wrong_answers::{SyncReport, WrongAnswerSync};

/// Outcome of grading the current set.
#[derive(Debug)]
pub struct Submission {
    pub result: GradeResult,
    /// `None` when nobody was signed in.
    pub sync: Option<SyncReport>,
    pub failed_attempts: usize,
}

/// Something that happened while waiting in [`QuizOrchestrator::next_event`]
/// or was applied by [`QuizOrchestrator::apply_wake`].
#[derive(Debug)]
pub enum EngineEvent {
    IdentityChanged(Option<Identity>),
    /// The countdown ran out. Carries the forced submission, or `None` when
    /// the set had already been graded.
    TimerExpired(Option<Submission>),
}

/// What [`QuizOrchestrator::wait_wake`] woke up for. Nothing has been
/// applied yet; hand it to [`QuizOrchestrator::apply_wake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Identity,
    Expired,
}

/// Owns the quiz session context: bank, current set, identity, and timer.
///
/// All operations take `&mut self`, so engine logic never interleaves; the
/// only suspension points are bank fetches and storage calls.
pub struct QuizOrchestrator {
    config: QuizConfig,
    source: Arc<dyn QuestionSource>,
    timer: SessionTimer,
    sync: WrongAnswerSync,
    history: HistoryService,
    identity_rx: watch::Receiver<Option<Identity>>,
    identity_open: bool,
    identity: Option<Identity>,
    category: ExamFilter,
    bank: Option<Vec<Question>>,
    session: Option<QuizSession>,
    countdown: Option<RunningCountdown>,
    rng: StdRng,
}

impl QuizOrchestrator {
    #[must_use]
    pub fn new(
        config: QuizConfig,
        clock: Clock,
        storage: &Storage,
        source: Arc<dyn QuestionSource>,
        identity: &dyn IdentityProvider,
    ) -> Self {
        Self {
            timer: SessionTimer::new(clock, Arc::clone(&storage.timers), &config),
            sync: WrongAnswerSync::new(clock, Arc::clone(&storage.wrong_answers)),
            history: HistoryService::new(
                clock,
                Arc::clone(&storage.scores),
                Arc::clone(&storage.attempts),
            ),
            config,
            source,
            identity_rx: identity.subscribe(),
            identity_open: true,
            identity: None,
            category: ExamFilter::All,
            bank: None,
            session: None,
            countdown: None,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seed the source used for random quizzes and new tokens.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    //
    // ─── STATE ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn phase(&self) -> Phase {
        match (&self.bank, &self.session) {
            (None, _) => Phase::Empty,
            (Some(_), None) => Phase::Loaded,
            (Some(_), Some(session)) => session.phase(),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn category(&self) -> &ExamFilter {
        &self.category
    }

    #[must_use]
    pub fn wrong_answers(&self) -> &WrongAnswerSync {
        &self.sync
    }

    #[must_use]
    pub fn countdown(&self) -> Option<&RunningCountdown> {
        self.countdown.as_ref()
    }

    /// Distinct exam labels in the loaded bank.
    #[must_use]
    pub fn exams(&self) -> Vec<String> {
        self.bank.as_deref().map(exam_catalogue).unwrap_or_default()
    }

    //
    // ─── BANK ──────────────────────────────────────────────────────────────────
    //

    /// Fetch the question bank. On failure the previous bank and session are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Bank` if the source fails.
    pub async fn load_bank(&mut self) -> Result<usize, SessionError> {
        match self.source.fetch_questions().await {
            Ok(questions) => {
                let count = questions.len();
                info!(source = %self.source.describe(), count, "question bank ready");
                self.bank = Some(questions);
                Ok(count)
            }
            Err(err) => {
                warn!(source = %self.source.describe(), error = %err, "question bank failed to load");
                Err(err.into())
            }
        }
    }

    async fn ensure_bank(&mut self) -> Result<(), SessionError> {
        if self.bank.is_none() {
            self.load_bank().await?;
        }
        Ok(())
    }

    //
    // ─── STARTING ──────────────────────────────────────────────────────────────
    //

    /// Change the category used for new quizzes.
    ///
    /// While a timed quiz is open its link is re-derived with the new
    /// category; the questions on screen stay as they are.
    pub fn set_category(&mut self, filter: ExamFilter) -> Option<ShareLink> {
        self.category = filter;
        self.share_link()
    }

    /// Draw a fresh random quiz from the current category.
    ///
    /// Used for start, shuffle, and next alike. On error the current session
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Bank` if the bank cannot be loaded and
    /// `SessionError::Selection` if the category is too small.
    pub async fn start_random(&mut self) -> Result<&QuizSession, SessionError> {
        self.ensure_bank().await?;
        let bank = self.bank.as_deref().ok_or(SessionError::NoBank)?;
        let questions = select_with_rng(
            bank,
            &self.category,
            &SelectionMode::Random,
            self.config.casual_size(),
            &mut self.rng,
        )?;

        self.countdown = None;
        debug!(filter = %self.category, count = questions.len(), "random quiz drawn");
        let session = QuizSession::casual(self.category.clone(), questions);
        Ok(&*self.session.insert(session))
    }

    /// Create a timed quiz under a new random token.
    ///
    /// # Errors
    ///
    /// See [`QuizOrchestrator::open_timed`].
    pub async fn create_timed(&mut self) -> Result<ShareLink, SessionError> {
        let token = QuizToken::random_with(&mut self.rng);
        let filter = self.category.clone();
        self.open_timed(token, filter).await
    }

    /// Open the timed quiz a link points at.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Link` for an unparsable link,
    /// `SessionError::MissingToken` when it carries no quiz, and anything
    /// [`QuizOrchestrator::open_timed`] returns.
    pub async fn open_link(&mut self, raw: &str) -> Result<ShareLink, SessionError> {
        let link = ShareLink::parse(raw)?.ok_or(SessionError::MissingToken)?;
        self.open_timed(link.token, link.filter).await
    }

    /// Open (or resume) the timed quiz for `token` under `filter`.
    ///
    /// The same token and filter always produce the same questions in the
    /// same order. A category too small for the quiz widens to the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Bank` if the bank cannot be loaded,
    /// `SessionError::Selection` if even the whole bank is too small, and
    /// `SessionError::Timer` if the start instant cannot be persisted.
    pub async fn open_timed(
        &mut self,
        token: QuizToken,
        filter: ExamFilter,
    ) -> Result<ShareLink, SessionError> {
        self.ensure_bank().await?;
        let bank = self.bank.as_deref().ok_or(SessionError::NoBank)?;
        let TokenSelection { questions, widened } =
            select_for_token(bank, &filter, &token, self.config.timed_size())?;
        if widened {
            warn!(%token, %filter, "category too small for a timed quiz; drawing from the whole bank");
        }

        let countdown = self.timer.start(&token).await?;
        let link = ShareLink::new(token.clone(), filter.clone());
        let session = QuizSession::timed(token, filter.clone(), questions, countdown.started_at());

        self.category = filter;
        self.countdown = Some(countdown);
        self.session = Some(session);
        Ok(link)
    }

    /// Link for the open timed quiz under the current category.
    #[must_use]
    pub fn share_link(&self) -> Option<ShareLink> {
        let token = self.session.as_ref()?.token()?;
        Some(ShareLink::new(token.clone(), self.category.clone()))
    }

    #[must_use]
    pub fn share_url(&self, base: &Url) -> Option<Url> {
        self.share_link().map(|link| link.to_url(base))
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Choose `option` for the question at `position` (0-based).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` without a session,
    /// `SessionError::AlreadyGraded` once graded, and
    /// `SessionError::InvalidSelection` for an out-of-range choice.
    pub fn select(&mut self, position: usize, option: usize) -> Result<(), SessionError> {
        self.session
            .as_mut()
            .ok_or(SessionError::NotActive)?
            .choose(position, option)
    }

    /// Grade the current set and forward misses and corrections.
    ///
    /// The session is graded before any write is attempted; sync and attempt
    /// failures are logged and reported, never returned.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` without a session and
    /// `SessionError::AlreadyGraded` if it was already graded.
    pub async fn submit(&mut self) -> Result<Submission, SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::NotActive)?;
        if session.phase() == Phase::Graded {
            return Err(SessionError::AlreadyGraded);
        }

        let sync = &self.sync;
        let graded = grade(session.questions(), session.selections(), |id| {
            sync.is_missed(id)
        });
        session.set_result(graded.result.clone());
        info!(score = %graded.result.score_label(), percent = graded.result.percent(), "quiz graded");

        let Some(identity) = self.identity.as_ref() else {
            return Ok(Submission {
                result: graded.result,
                sync: None,
                failed_attempts: 0,
            });
        };

        let questions = session.questions();
        let (report, failed_attempts) = tokio::join!(
            self.sync.apply(&identity.id, &graded.events),
            self.history
                .record_attempts(&identity.id, questions, &graded.result),
        );

        Ok(Submission {
            result: graded.result,
            sync: Some(report),
            failed_attempts,
        })
    }

    /// Treat expiry as a submit. A no-op once the set is graded.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches [`QuizOrchestrator::submit`].
    pub async fn handle_expiry(&mut self) -> Result<Option<Submission>, SessionError> {
        let due = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_timed() && s.phase() == Phase::Active);
        if !due {
            debug!("timer expiry after grading ignored");
            return Ok(None);
        }
        self.submit().await.map(Some)
    }

    /// Reset the timed quiz: new start instant, selections cleared, same questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` without a session,
    /// `SessionError::NotTimed` for a casual quiz,
    /// `SessionError::RestartNotConfirmed` unless `confirmed`, and
    /// `SessionError::Timer` if the start instant cannot be reset.
    pub async fn restart(&mut self, confirmed: bool) -> Result<(), SessionError> {
        let session = self.session.as_ref().ok_or(SessionError::NotActive)?;
        let token = session.token().cloned().ok_or(SessionError::NotTimed)?;
        if !confirmed {
            return Err(SessionError::RestartNotConfirmed);
        }

        let countdown = self.timer.restart(&token).await?;
        let started_at = countdown.started_at();
        self.countdown = Some(countdown);
        if let Some(session) = self.session.as_mut() {
            session.reset(Some(started_at));
        }
        Ok(())
    }

    //
    // ─── IDENTITY & EVENTS ─────────────────────────────────────────────────────
    //

    /// Adopt whatever identity the provider currently reports.
    pub async fn sync_identity(&mut self) {
        let current = self.identity_rx.borrow_and_update().clone();
        self.set_identity(current).await;
    }

    /// Switch identity: refresh the wrong-answer cache on sign-in, drop it on sign-out.
    pub async fn set_identity(&mut self, identity: Option<Identity>) {
        match &identity {
            Some(user) => {
                if let Err(err) = self.sync.refresh(&user.id).await {
                    warn!(user = %user.id, error = %err, "could not load wrong answers");
                }
            }
            None => self.sync.clear(),
        }
        self.identity = identity;
    }

    /// Wait until the identity changes or the countdown runs out.
    ///
    /// Cancel safe: only wake-up sources are awaited and no engine state
    /// changes, so it can sit in a `tokio::select!` next to other input. A
    /// dropped call loses nothing; the next call reports the same wake.
    pub async fn wait_wake(&mut self) -> Wake {
        loop {
            tokio::select! {
                changed = self.identity_rx.changed(), if self.identity_open => {
                    if changed.is_ok() {
                        return Wake::Identity;
                    }
                    self.identity_open = false;
                }
                () = wait_for_expiry(self.countdown.as_mut()) => return Wake::Expired,
            }
        }
    }

    /// Apply a wake from [`QuizOrchestrator::wait_wake`].
    ///
    /// Not cancel safe: an expiry submits and then writes wrong answers and
    /// history. Await it to completion.
    ///
    /// # Errors
    ///
    /// Returns errors from the forced submission on expiry.
    pub async fn apply_wake(&mut self, wake: Wake) -> Result<EngineEvent, SessionError> {
        match wake {
            Wake::Identity => {
                self.sync_identity().await;
                Ok(EngineEvent::IdentityChanged(self.identity.clone()))
            }
            Wake::Expired => {
                let submission = self.handle_expiry().await?;
                Ok(EngineEvent::TimerExpired(submission))
            }
        }
    }

    /// Wait for the next identity change or timer expiry and apply it.
    ///
    /// Not cancel safe. Inside `tokio::select!`, race
    /// [`QuizOrchestrator::wait_wake`] instead and call
    /// [`QuizOrchestrator::apply_wake`] from the branch body.
    ///
    /// # Errors
    ///
    /// Returns errors from the forced submission on expiry.
    pub async fn next_event(&mut self) -> Result<EngineEvent, SessionError> {
        let wake = self.wait_wake().await;
        self.apply_wake(wake).await
    }

    //
    // ─── HISTORY ───────────────────────────────────────────────────────────────
    //

    /// Save the graded score for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn`, `SessionError::NotGraded`, or
    /// `SessionError::Storage` if the write fails.
    pub async fn save_score(&self) -> Result<ScoreRecord, SessionError> {
        let identity = self.identity.as_ref().ok_or(SessionError::NotSignedIn)?;
        let result = self
            .session
            .as_ref()
            .and_then(QuizSession::result)
            .ok_or(SessionError::NotGraded)?;
        let record = self
            .history
            .save_score(&identity.id, identity.email.clone(), result, self.category.as_str())
            .await?;
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotSignedIn` or `SessionError::Storage`.
    pub async fn profile(&self) -> Result<ProfileStats, SessionError> {
        let identity = self.identity.as_ref().ok_or(SessionError::NotSignedIn)?;
        Ok(self.history.profile(&identity.id).await?)
    }

    //
    // ─── RENDERING ─────────────────────────────────────────────────────────────
    //

    /// Project the current session for display.
    #[must_use]
    pub fn render(&self) -> Option<SessionView> {
        let session = self.session.as_ref()?;
        let result = session.result();

        let questions = session
            .questions()
            .iter()
            .enumerate()
            .map(|(position, question)| {
                let grade = result.and_then(|r| r.questions.get(position));
                let chosen = session.selections().get(position);
                let options = question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(index, label)| OptionView {
                        index,
                        label: label.clone(),
                        selected: chosen == Some(index),
                        mark: grade
                            .and_then(|g| g.marks.get(index).copied())
                            .unwrap_or(OptionMark::Plain),
                    })
                    .collect();

                QuestionView {
                    number: position + 1,
                    meta: question.meta_line(),
                    prompt: question.prompt.clone(),
                    image: question.image.clone(),
                    options,
                    previously_missed: self.sync.miss_count(&question.id),
                    explanation: grade.map(|_| question.explanation_text().to_owned()),
                }
            })
            .collect();

        Some(SessionView {
            phase: session.phase(),
            filter: self.category.clone(),
            share_link: self.share_link(),
            remaining: self.countdown.as_ref().map(RunningCountdown::remaining_label),
            score: result.map(|r| ScoreView {
                label: r.score_label(),
                percent: r.percent(),
            }),
            questions,
        })
    }
}

async fn wait_for_expiry(countdown: Option<&mut RunningCountdown>) {
    match countdown {
        Some(countdown) => countdown.expired().await,
        None => std::future::pending().await,
    }
}
