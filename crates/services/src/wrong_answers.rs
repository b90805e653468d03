//! Wrong-answer tracking: a local cache mirroring the per-user remote records.
//!
//! The cache is scoped to one identity. Every refresh or sign-out bumps a
//! generation counter; a mutation captures the generation before it awaits and
//! drops its result if the generation has moved on by the time it returns.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use quiz_core::Clock;
use quiz_core::grading::SyncEvent;
use quiz_core::model::{QuestionId, UserId, WrongAnswerRecord};
use storage::repository::{StorageError, WrongAnswerRepository};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncOperation};

#[derive(Debug, Default)]
struct WrongAnswerCache {
    identity: Option<UserId>,
    generation: u64,
    records: HashMap<QuestionId, WrongAnswerRecord>,
    missed: HashSet<QuestionId>,
}

impl WrongAnswerCache {
    fn reset(&mut self, identity: Option<UserId>) -> u64 {
        self.identity = identity;
        self.generation = self.generation.wrapping_add(1);
        self.records.clear();
        self.missed.clear();
        self.generation
    }

    fn is_current(&self, user: &UserId, generation: u64) -> bool {
        self.generation == generation && self.identity.as_ref() == Some(user)
    }

    fn store(&mut self, record: WrongAnswerRecord) {
        if record.is_resolved() {
            self.missed.remove(&record.question_id);
        } else {
            self.missed.insert(record.question_id.clone());
        }
        self.records.insert(record.question_id.clone(), record);
    }
}

/// What one batch of sync events achieved.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub misses_recorded: usize,
    pub corrections_recorded: usize,
    /// Corrections for questions that had no remote record.
    pub corrections_skipped: usize,
    pub failures: Vec<SyncError>,
}

impl SyncReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Applied {
    Miss,
    Correction,
    NoRecord,
}

#[derive(Clone)]
pub struct WrongAnswerSync {
    clock: Clock,
    repo: Arc<dyn WrongAnswerRepository>,
    cache: Arc<Mutex<WrongAnswerCache>>,
}

impl WrongAnswerSync {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn WrongAnswerRepository>) -> Self {
        Self {
            clock,
            repo,
            cache: Arc::new(Mutex::new(WrongAnswerCache::default())),
        }
    }

    fn cache(&self) -> MutexGuard<'_, WrongAnswerCache> {
        // A panic while holding the guard leaves plain data behind; keep using it.
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Replace the cache wholesale with the records held for `user`.
    ///
    /// The cache is emptied before the fetch, so a failed refresh leaves it
    /// empty rather than holding another identity's records.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Refresh` if the records cannot be fetched.
    pub async fn refresh(&self, user: &UserId) -> Result<usize, SyncError> {
        let generation = self.cache().reset(Some(user.clone()));
        let records = self
            .repo
            .list_wrong_answers(user)
            .await
            .map_err(SyncError::Refresh)?;

        let mut cache = self.cache();
        if !cache.is_current(user, generation) {
            debug!(user = %user, "dropping stale wrong-answer refresh");
            return Ok(0);
        }
        let count = records.len();
        for record in records {
            cache.store(record);
        }
        debug!(user = %user, records = count, missed = cache.missed.len(), "wrong answers refreshed");
        Ok(count)
    }

    /// Discard everything cached. Called on sign-out.
    pub fn clear(&self) {
        self.cache().reset(None);
        debug!("wrong-answer cache cleared");
    }

    #[must_use]
    pub fn identity(&self) -> Option<UserId> {
        self.cache().identity.clone()
    }

    /// True when the question is in the currently-missed set.
    #[must_use]
    pub fn is_missed(&self, question_id: &QuestionId) -> bool {
        self.cache().missed.contains(question_id)
    }

    /// Cumulative miss count for a currently-missed question.
    #[must_use]
    pub fn miss_count(&self, question_id: &QuestionId) -> Option<u32> {
        let cache = self.cache();
        if !cache.missed.contains(question_id) {
            return None;
        }
        cache.records.get(question_id).map(|r| r.count)
    }

    /// Currently-missed records, ordered by question id.
    #[must_use]
    pub fn missed_records(&self) -> Vec<WrongAnswerRecord> {
        let cache = self.cache();
        let mut out: Vec<_> = cache
            .missed
            .iter()
            .filter_map(|id| cache.records.get(id).cloned())
            .collect();
        out.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        out
    }

    /// Record a miss: increment the remote record, or create it with
    /// `count = 1` when there is nothing to increment.
    ///
    /// The cache is bumped when the write is dispatched and then reconciled
    /// with whatever the store returns.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Write` if both the increment and the create fail.
    pub async fn record_miss(
        &self,
        user: &UserId,
        question_id: &QuestionId,
        snapshot: &str,
    ) -> Result<WrongAnswerRecord, SyncError> {
        let at = self.clock.now();
        let generation = {
            let mut cache = self.cache();
            let generation = cache.generation;
            if cache.is_current(user, generation) {
                let record = match cache.records.get(question_id) {
                    Some(existing) => {
                        let mut bumped = existing.clone();
                        bumped.record_miss(snapshot, at);
                        bumped
                    }
                    None => WrongAnswerRecord::first_miss(question_id.clone(), snapshot, at),
                };
                cache.store(record);
            }
            generation
        };

        let write_failed = |source| SyncError::Write {
            question_id: question_id.clone(),
            operation: SyncOperation::RecordMiss,
            source,
        };

        let record = match self
            .repo
            .increment_miss(user, question_id, snapshot, at)
            .await
        {
            Ok(record) => record,
            Err(StorageError::NotFound) => {
                let record = WrongAnswerRecord::first_miss(question_id.clone(), snapshot, at);
                self.repo
                    .create_miss(user, &record)
                    .await
                    .map_err(write_failed)?;
                record
            }
            Err(err) => return Err(write_failed(err)),
        };

        let mut cache = self.cache();
        if cache.is_current(user, generation) {
            cache.store(record.clone());
        } else {
            debug!(user = %user, question = %question_id, "dropping stale miss result");
        }
        Ok(record)
    }

    /// Record a correct answer to a previously missed question.
    ///
    /// Returns `Ok(None)` when there is no remote record: nothing to correct.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Write` if the update fails for any other reason.
    pub async fn record_correction(
        &self,
        user: &UserId,
        question_id: &QuestionId,
    ) -> Result<Option<WrongAnswerRecord>, SyncError> {
        let at = self.clock.now();
        let generation = self.cache().generation;

        let record = match self.repo.mark_correct(user, question_id, at).await {
            Ok(record) => record,
            Err(StorageError::NotFound) => {
                debug!(user = %user, question = %question_id, "no wrong-answer record to correct");
                return Ok(None);
            }
            Err(source) => {
                return Err(SyncError::Write {
                    question_id: question_id.clone(),
                    operation: SyncOperation::RecordCorrection,
                    source,
                });
            }
        };

        let mut cache = self.cache();
        if cache.is_current(user, generation) {
            cache.missed.remove(question_id);
            cache.records.insert(question_id.clone(), record.clone());
        } else {
            debug!(user = %user, question = %question_id, "dropping stale correction result");
        }
        Ok(Some(record))
    }

    /// Apply every event from one grading pass concurrently.
    ///
    /// No failure aborts the others; failures are logged and collected.
    pub async fn apply(&self, user: &UserId, events: &[SyncEvent]) -> SyncReport {
        let outcomes = join_all(events.iter().map(|event| async move {
            match event {
                SyncEvent::Missed {
                    question_id,
                    snapshot,
                } => self
                    .record_miss(user, question_id, snapshot)
                    .await
                    .map(|_| Applied::Miss),
                SyncEvent::Corrected { question_id } => self
                    .record_correction(user, question_id)
                    .await
                    .map(|rec| rec.map_or(Applied::NoRecord, |_| Applied::Correction)),
            }
        }))
        .await;

        let mut report = SyncReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(Applied::Miss) => report.misses_recorded += 1,
                Ok(Applied::Correction) => report.corrections_recorded += 1,
                Ok(Applied::NoRecord) => report.corrections_skipped += 1,
                Err(err) => {
                    warn!(user = %user, error = %err, "wrong-answer sync failed");
                    report.failures.push(err);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn sync() -> (WrongAnswerSync, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        (WrongAnswerSync::new(fixed_clock(), repo.clone()), repo)
    }

    #[tokio::test]
    async fn miss_then_correction_keeps_history() {
        let (sync, repo) = sync();
        let user = UserId::new("u1");
        let qid = QuestionId::new("q1");
        sync.refresh(&user).await.unwrap();

        let first = sync.record_miss(&user, &qid, "2+2?").await.unwrap();
        assert_eq!(first.count, 1);
        let second = sync.record_miss(&user, &qid, "2+2?").await.unwrap();
        assert_eq!(second.count, 2);
        assert_eq!(sync.miss_count(&qid), Some(2));

        let corrected = sync.record_correction(&user, &qid).await.unwrap().unwrap();
        assert_eq!(corrected.count, 2);
        assert!(corrected.last_correct.is_some());
        assert!(!sync.is_missed(&qid));
        assert_eq!(sync.miss_count(&qid), None);

        let stored = repo.list_wrong_answers(&user).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].count, 2);
    }

    #[tokio::test]
    async fn correction_without_record_is_a_no_op() {
        let (sync, repo) = sync();
        let user = UserId::new("u1");
        sync.refresh(&user).await.unwrap();

        let out = sync
            .record_correction(&user, &QuestionId::new("never-missed"))
            .await
            .unwrap();
        assert!(out.is_none());
        assert!(repo.list_wrong_answers(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sign_out_discards_cache_and_stale_results() {
        let (sync, _repo) = sync();
        let user = UserId::new("u1");
        let qid = QuestionId::new("q1");
        sync.refresh(&user).await.unwrap();
        sync.record_miss(&user, &qid, "p").await.unwrap();
        assert!(sync.is_missed(&qid));

        sync.clear();
        assert!(!sync.is_missed(&qid));
        assert!(sync.identity().is_none());

        // Written remotely, but the cache belongs to nobody now.
        sync.record_miss(&user, &qid, "p").await.unwrap();
        assert!(!sync.is_missed(&qid));
    }

    #[tokio::test]
    async fn refresh_marks_only_unresolved_records_missed() {
        let (sync, repo) = sync();
        let user = UserId::new("u1");
        let now = fixed_clock().now();

        let open = WrongAnswerRecord::first_miss(QuestionId::new("open"), "p", now);
        let mut resolved = WrongAnswerRecord::first_miss(QuestionId::new("resolved"), "p", now);
        resolved.record_correct(now + chrono::Duration::minutes(1));
        repo.create_miss(&user, &open).await.unwrap();
        repo.create_miss(&user, &resolved).await.unwrap();

        assert_eq!(sync.refresh(&user).await.unwrap(), 2);
        assert!(sync.is_missed(&QuestionId::new("open")));
        assert!(!sync.is_missed(&QuestionId::new("resolved")));
        assert_eq!(sync.missed_records().len(), 1);
    }
}
