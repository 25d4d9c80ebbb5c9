use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;

use vocab_srs::services::{SeededPicker, UniformPicker};
use vocab_srs::{Grade, ReviewService, ReviewSession, SchedulerConfig, SessionPhase};

mod common;

fn grade(value: i64) -> Grade {
    Grade::new(value).unwrap()
}

#[tokio::test]
async fn session_walks_present_reveal_grade() {
    let (service, _clock) = common::memory_service(5);
    service.ingest_catalog(common::words(2)).await.unwrap();

    let mut session = ReviewSession::new("hana");
    assert_eq!(session.phase(), SessionPhase::Idle);

    let first = session.start(&service).await.unwrap().unwrap();
    assert_eq!(session.phase(), SessionPhase::AwaitingReveal);
    assert_eq!(session.current().unwrap().record.id, first.record.id);

    let revealed = session.reveal().unwrap();
    assert_eq!(revealed.item.translation, "word1");
    assert_eq!(session.phase(), SessionPhase::AwaitingGrade);

    let outcome = session.grade(&service, grade(4)).await.unwrap();
    assert_eq!(outcome.rescheduled.interval_days, 1);
    let next = outcome.next.unwrap();
    assert_eq!(next.item.term, "palabra2");
    assert_eq!(session.phase(), SessionPhase::AwaitingReveal);

    session.reveal().unwrap();
    let outcome = session.grade(&service, grade(5)).await.unwrap();
    assert!(outcome.next.is_none());
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.current().is_none());
}

#[tokio::test]
async fn out_of_order_actions_are_rejected() {
    let (service, _clock) = common::memory_service(5);
    service.ingest_catalog(common::words(1)).await.unwrap();

    let mut session = ReviewSession::new("ivan");
    assert!(session.reveal().unwrap_err().is_validation());
    assert!(session.grade(&service, grade(3)).await.unwrap_err().is_validation());

    session.start(&service).await.unwrap().unwrap();
    assert!(session.grade(&service, grade(3)).await.unwrap_err().is_validation());
    session.reveal().unwrap();
    assert!(session.reveal().unwrap_err().is_validation());

    session.cancel();
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn empty_session_stays_idle() {
    let (service, _clock) = common::memory_service(5);
    let mut session = ReviewSession::new("jin");
    assert!(session.start(&service).await.unwrap().is_none());
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn stale_in_flight_record_resets_session() {
    let db = common::sqlite_store().await;
    let clock = Arc::new(vocab_srs::FixedClock::new(common::morning()));
    let service = common::service_with(Arc::new(db.store.clone()), Arc::clone(&clock), 5);
    service.ingest_catalog(common::words(1)).await.unwrap();

    let mut session = ReviewSession::new("kai");
    session.start(&service).await.unwrap().unwrap();
    session.reveal().unwrap();

    sqlx::query("DELETE FROM progress_records WHERE external_id = 'kai'")
        .execute(db.store.pool())
        .await
        .unwrap();

    let err = session.grade(&service, grade(4)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.current().is_none());

    let restarted = session.start(&service).await.unwrap().unwrap();
    assert!(restarted.is_new);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_selects_for_one_user_admit_a_single_item() {
    let db = common::sqlite_store().await;
    let service = ReviewService::new(
        Arc::new(db.store.clone()),
        SchedulerConfig {
            default_daily_new_items: 3,
        },
    )
    .with_picker(Arc::new(UniformPicker));
    service.ingest_catalog(common::words(20)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..12 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.select_next("lena").await }));
    }

    let mut records = HashSet::new();
    for handle in handles {
        let card = handle.await.unwrap().unwrap().unwrap();
        records.insert(card.record.id);
    }
    // The first admitted item stays due until graded, so every caller sees it.
    assert_eq!(records.len(), 1);
    assert_eq!(service.store().count_progress("lena").await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_users_each_stop_at_their_cap() {
    let db = common::sqlite_store().await;
    let clock = Arc::new(vocab_srs::FixedClock::new(common::morning()));
    let service = common::service_with(Arc::new(db.store.clone()), clock, 3)
        .with_picker(Arc::new(UniformPicker));
    service.ingest_catalog(common::words(20)).await.unwrap();

    let mut handles = Vec::new();
    for user in ["olga", "pablo", "quinn", "rosa"] {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let mut seen = HashSet::new();
            while let Some(card) = service.select_next(user).await.unwrap() {
                assert!(card.is_new);
                assert!(seen.insert(card.item.id));
                service.schedule(&card.record, Grade::new(4).unwrap()).await.unwrap();
            }
            (user, seen.len())
        }));
    }

    for handle in handles {
        let (user, admitted) = handle.await.unwrap();
        assert_eq!(admitted, 3);
        assert_eq!(service.store().count_progress(user).await.unwrap(), 3);
    }
}

#[tokio::test]
async fn users_progress_independently() {
    let (service, clock) = common::memory_service(1);
    let service = service.with_picker(Arc::new(SeededPicker::new(11)));
    service.ingest_catalog(common::words(4)).await.unwrap();

    let a = service.select_next("mia").await.unwrap().unwrap();
    let b = service.select_next("noah").await.unwrap().unwrap();
    service.schedule(&a.record, grade(5)).await.unwrap();
    service.schedule(&b.record, grade(2)).await.unwrap();

    assert!(service.select_next("mia").await.unwrap().is_none());
    assert!(service.select_next("noah").await.unwrap().is_none());

    clock.advance(Duration::days(1));
    let mia_overview = service.overview("mia").await.unwrap();
    assert_eq!(mia_overview.due_now, 1);
    assert_eq!(mia_overview.new_today, 0);
    assert_eq!(mia_overview.remaining_new_today, 1);
    assert!(!mia_overview.registered);
}
