//! Property-based tests for the SM-2 review step.
//!
//! - lapses reset repetition and interval whatever the prior state
//! - the first two successes always yield 1 and 6 days
//! - later successes grow the interval by the previous ease factor
//! - the ease factor never drops below its floor

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use vocab_srs::models::{ProgressRecord, INITIAL_EASE_FACTOR};
use vocab_srs::services::sm2::{apply_grade, next_ease_factor, MAX_INTERVAL_DAYS, MIN_EASE_FACTOR};
use vocab_srs::Grade;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 6, 0, 0).unwrap()
}

fn arb_grade() -> impl Strategy<Value = Grade> {
    (0i64..=5).prop_map(|g| Grade::new(g).unwrap())
}

fn arb_passing_grade() -> impl Strategy<Value = Grade> {
    (3i64..=5).prop_map(|g| Grade::new(g).unwrap())
}

fn arb_lapse_grade() -> impl Strategy<Value = Grade> {
    (0i64..=2).prop_map(|g| Grade::new(g).unwrap())
}

fn arb_record() -> impl Strategy<Value = ProgressRecord> {
    (
        0i64..=40,                   // repetition_count
        0i64..=2_000,                // interval_days
        (1300u32..=4000u32),         // ease_factor * 1000
    )
        .prop_map(|(repetition_count, interval_days, ease_milli)| ProgressRecord {
            id: 1,
            external_id: "pbt".into(),
            item_id: 1,
            repetition_count,
            interval_days,
            ease_factor: ease_milli as f64 / 1000.0,
            next_review_at: now(),
            added_at: now() - Duration::days(30),
        })
}

fn fresh() -> ProgressRecord {
    ProgressRecord {
        id: 1,
        external_id: "pbt".into(),
        item_id: 1,
        repetition_count: 0,
        interval_days: 0,
        ease_factor: INITIAL_EASE_FACTOR,
        next_review_at: now(),
        added_at: now(),
    }
}

proptest! {
    #[test]
    fn lapse_always_resets(record in arb_record(), grade in arb_lapse_grade()) {
        let next = apply_grade(&record, grade, now());
        prop_assert_eq!(next.repetition_count, 0);
        prop_assert_eq!(next.interval_days, 1);
        prop_assert_eq!(next.next_review_at, now() + Duration::days(1));
    }

    #[test]
    fn first_success_is_one_day(record in arb_record(), grade in arb_passing_grade()) {
        let record = ProgressRecord { repetition_count: 0, ..record };
        let next = apply_grade(&record, grade, now());
        prop_assert_eq!((next.interval_days, next.repetition_count), (1, 1));
    }

    #[test]
    fn second_success_is_six_days(record in arb_record(), grade in arb_passing_grade()) {
        let record = ProgressRecord { repetition_count: 1, ..record };
        let next = apply_grade(&record, grade, now());
        prop_assert_eq!((next.interval_days, next.repetition_count), (6, 2));
    }

    #[test]
    fn later_success_grows_by_previous_ease(
        record in arb_record(),
        grade in arb_passing_grade(),
    ) {
        prop_assume!(record.repetition_count >= 2 && record.interval_days >= 1);
        let next = apply_grade(&record, grade, now());
        let expected = (record.interval_days as f64 * record.ease_factor)
            .round_ties_even()
            .min(MAX_INTERVAL_DAYS as f64) as i64;
        prop_assert_eq!(next.interval_days, expected);
        prop_assert_eq!(next.repetition_count, record.repetition_count + 1);
    }

    #[test]
    fn ease_update_is_applied_to_every_grade(record in arb_record(), grade in arb_grade()) {
        let next = apply_grade(&record, grade, now());
        prop_assert_eq!(next.ease_factor, next_ease_factor(record.ease_factor, grade));
        prop_assert_eq!(next.id, record.id);
        prop_assert_eq!(next.added_at, record.added_at);
    }

    #[test]
    fn ease_never_below_floor(grades in prop::collection::vec(arb_grade(), 1..60)) {
        let mut record = fresh();
        for grade in grades {
            record = apply_grade(&record, grade, now());
            prop_assert!(record.ease_factor >= MIN_EASE_FACTOR);
            prop_assert!(record.interval_days >= 1);
            prop_assert!(record.interval_days <= MAX_INTERVAL_DAYS);
        }
    }
}
