use chrono::Duration;
use quiz_core::model::{AttemptRecord, QuestionId, ScoreRecord, UserId, WrongAnswerRecord};
use quiz_core::time::fixed_now;
use quiz_core::token::QuizToken;
use storage::repository::{
    AttemptRepository, ScoreRepository, Storage, TimerStateRepository, WrongAnswerRepository,
};
use storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn wrong_answer_increment_requires_existing_record() {
    let repo = repo("memdb_wrong_missing").await;
    let user = UserId::new("u1");
    let qid = QuestionId::new("AWS-2021-3");

    let err = repo
        .increment_miss(&user, &qid, "prompt", fixed_now())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = repo.mark_correct(&user, &qid, fixed_now()).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(repo.list_wrong_answers(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn wrong_answer_history_survives_correction() {
    let repo = repo("memdb_wrong_history").await;
    let user = UserId::new("u1");
    let qid = QuestionId::new("q1");
    let t0 = fixed_now();

    repo.create_miss(&user, &WrongAnswerRecord::first_miss(qid.clone(), "old prompt", t0))
        .await
        .unwrap();
    let bumped = repo
        .increment_miss(&user, &qid, "new prompt", t0 + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(bumped.count, 2);
    assert_eq!(bumped.question_snapshot, "new prompt");

    let corrected = repo
        .mark_correct(&user, &qid, t0 + Duration::minutes(2))
        .await
        .unwrap();
    assert_eq!(corrected.count, 2);
    assert!(corrected.is_resolved());

    let listed = repo.list_wrong_answers(&user).await.unwrap();
    assert_eq!(listed, vec![corrected]);
}

#[tokio::test]
async fn create_miss_overwrites_existing_record() {
    let repo = repo("memdb_wrong_overwrite").await;
    let user = UserId::new("u1");
    let qid = QuestionId::new("q1");

    let mut rec = WrongAnswerRecord::first_miss(qid.clone(), "p", fixed_now());
    rec.count = 4;
    repo.create_miss(&user, &rec).await.unwrap();
    repo.create_miss(&user, &WrongAnswerRecord::first_miss(qid, "p", fixed_now()))
        .await
        .unwrap();

    let listed = repo.list_wrong_answers(&user).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].count, 1);
}

#[tokio::test]
async fn timer_start_persists_per_token() {
    let repo = repo("memdb_timers").await;
    let token = QuizToken::normalize("abcd");

    assert_eq!(repo.get_timer_start(&token).await.unwrap(), None);
    repo.put_timer_start(&token, fixed_now()).await.unwrap();
    assert_eq!(repo.get_timer_start(&token).await.unwrap(), Some(fixed_now()));

    let other = QuizToken::normalize("WXYZ");
    assert_eq!(repo.get_timer_start(&other).await.unwrap(), None);

    repo.clear_timer_start(&token).await.unwrap();
    assert_eq!(repo.get_timer_start(&token).await.unwrap(), None);
}

#[tokio::test]
async fn scores_and_attempts_list_newest_first() {
    let repo = repo("memdb_history").await;
    let user = UserId::new("u1");
    let t0 = fixed_now();

    for (i, score) in [3_u32, 5].into_iter().enumerate() {
        repo.append_score(&ScoreRecord {
            user_id: user.clone(),
            email: Some("a@b.test".into()),
            score,
            total: 5,
            exam: "all".into(),
            created_at: t0 + Duration::minutes(i64::try_from(i).unwrap()),
        })
        .await
        .unwrap();
    }
    let scores = repo.list_scores(&user, 10).await.unwrap();
    assert_eq!(scores.iter().map(|s| s.score).collect::<Vec<_>>(), vec![5, 3]);
    assert_eq!(repo.list_scores(&user, 1).await.unwrap().len(), 1);

    for (i, correct) in [false, true].into_iter().enumerate() {
        repo.append_attempt(&AttemptRecord {
            user_id: user.clone(),
            question_id: QuestionId::new("q1"),
            question_text: "2+2?".into(),
            correct,
            recorded_at: t0 + Duration::minutes(i64::try_from(i).unwrap()),
        })
        .await
        .unwrap();
    }
    let attempts = repo.list_attempts(&user).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[0].correct);
    assert!(!attempts[1].correct);
    assert!(repo.list_attempts(&UserId::new("u2")).await.unwrap().is_empty());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = repo("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_sqlite_wires_every_repository() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let token = QuizToken::normalize("QQQQ");
    storage.timers.put_timer_start(&token, fixed_now()).await.unwrap();
    assert!(storage.timers.get_timer_start(&token).await.unwrap().is_some());
    assert!(
        storage
            .wrong_answers
            .list_wrong_answers(&UserId::new("nobody"))
            .await
            .unwrap()
            .is_empty()
    );
}
