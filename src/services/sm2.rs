//! SM-2 review step.
//!
//! Grades are self-reported recall quality on a 0..=5 scale; anything below 3
//! is a lapse and restarts the repetition sequence.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReviewError;
use crate::models::ProgressRecord;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const PASSING_GRADE: u8 = 3;
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Recall quality in `0..=5`. Construction is the only validation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, ReviewError> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ReviewError::Validation(format!(
                "grade must be between 0 and {}, got {value}",
                Self::MAX
            )))
        }
    }

    pub fn all() -> impl Iterator<Item = Grade> {
        (0..=Self::MAX).map(Grade)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_lapse(self) -> bool {
        self.0 < PASSING_GRADE
    }
}

impl TryFrom<i64> for Grade {
    type Error = ReviewError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

/// Accepts a bare digit (`"4"`) or the keyboard callback form (`"rate:4"`).
impl FromStr for Grade {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw = trimmed.strip_prefix("rate:").unwrap_or(trimmed).trim();
        let value = raw
            .parse::<i64>()
            .map_err(|_| ReviewError::Validation(format!("grade is not a number: {s:?}")))?;
        Self::new(value)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn next_ease_factor(ease_factor: f64, grade: Grade) -> f64 {
    let miss = (Grade::MAX - grade.value()) as f64;
    let updated = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
    updated.max(MIN_EASE_FACTOR)
}

/// `(repetition_count, interval_days)` after a review with `grade`.
pub fn next_repetition(repetition_count: i64, interval_days: i64, ease_factor: f64, grade: Grade) -> (i64, i64) {
    if grade.is_lapse() {
        return (0, 1);
    }
    match repetition_count {
        0 => (1, 1),
        1 => (2, 6),
        n => (n + 1, grown_interval(interval_days, ease_factor)),
    }
}

// Ties round to even so a half-day product never drifts upward.
fn grown_interval(interval_days: i64, ease_factor: f64) -> i64 {
    let grown = (interval_days as f64 * ease_factor).round_ties_even();
    if grown >= MAX_INTERVAL_DAYS as f64 {
        MAX_INTERVAL_DAYS
    } else {
        (grown as i64).max(1)
    }
}

/// Pure state transition; the caller persists the result.
pub fn apply_grade(record: &ProgressRecord, grade: Grade, now: DateTime<Utc>) -> ProgressRecord {
    let (repetition_count, interval_days) = next_repetition(
        record.repetition_count,
        record.interval_days,
        record.ease_factor,
        grade,
    );
    let ease_factor = next_ease_factor(record.ease_factor, grade);

    ProgressRecord {
        repetition_count,
        interval_days,
        ease_factor,
        next_review_at: now + Duration::days(interval_days),
        ..record.clone()
    }
}

/// Interval each grade would produce, indexed by grade value.
pub fn preview_intervals(record: &ProgressRecord) -> [i64; 6] {
    let mut out = [0; 6];
    for grade in Grade::all() {
        out[grade.value() as usize] =
            next_repetition(record.repetition_count, record.interval_days, record.ease_factor, grade).1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::INITIAL_EASE_FACTOR;
    use chrono::TimeZone;

    fn fresh(now: DateTime<Utc>) -> ProgressRecord {
        ProgressRecord {
            id: 1,
            external_id: "42".into(),
            item_id: 7,
            repetition_count: 0,
            interval_days: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            next_review_at: now,
            added_at: now,
        }
    }

    fn grade(value: i64) -> Grade {
        Grade::new(value).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn three_good_reviews_expand_interval() {
        let now = t0();
        let first = apply_grade(&fresh(now), grade(4), now);
        assert_eq!((first.interval_days, first.repetition_count), (1, 1));

        let second = apply_grade(&first, grade(4), now);
        assert_eq!((second.interval_days, second.repetition_count), (6, 2));

        let third = apply_grade(&second, grade(4), now);
        assert_eq!((third.interval_days, third.repetition_count), (15, 3));
        assert!((third.ease_factor - 2.5).abs() < 1e-9);
        assert_eq!(third.next_review_at, now + Duration::days(15));
    }

    #[test]
    fn lapse_after_success_resets_and_penalizes_ease() {
        let now = t0();
        let first = apply_grade(&fresh(now), grade(5), now);
        assert_eq!(first.interval_days, 1);
        assert!((first.ease_factor - 2.6).abs() < 1e-9);

        let second = apply_grade(&first, grade(1), now);
        assert_eq!(second.repetition_count, 0);
        assert_eq!(second.interval_days, 1);
        assert!((second.ease_factor - 2.06).abs() < 1e-9);
    }

    #[test]
    fn ease_is_floored() {
        let now = t0();
        let mut record = fresh(now);
        for _ in 0..10 {
            record = apply_grade(&record, grade(0), now);
        }
        assert_eq!(record.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn grade_rejects_out_of_range_values() {
        assert!(Grade::new(-1).unwrap_err().is_validation());
        assert!(Grade::new(6).unwrap_err().is_validation());
        assert_eq!(Grade::new(0).unwrap().value(), 0);
    }

    #[test]
    fn grade_parses_plain_and_callback_forms() {
        assert_eq!("3".parse::<Grade>().unwrap().value(), 3);
        assert_eq!("rate:5".parse::<Grade>().unwrap().value(), 5);
        assert!("rate:x".parse::<Grade>().is_err());
        assert!("rate:9".parse::<Grade>().is_err());
    }

    #[test]
    fn grade_deserialization_is_validated() {
        assert_eq!(serde_json::from_str::<Grade>("4").unwrap().value(), 4);
        assert!(serde_json::from_str::<Grade>("7").is_err());
    }

    #[test]
    fn preview_matches_applied_intervals() {
        let now = t0();
        let mut record = fresh(now);
        record.repetition_count = 3;
        record.interval_days = 10;
        let preview = preview_intervals(&record);
        assert_eq!(preview[0], 1);
        assert_eq!(preview[2], 1);
        for g in 3..=5 {
            assert_eq!(preview[g as usize], apply_grade(&record, grade(g), now).interval_days);
        }
    }

    #[test]
    fn interval_growth_is_capped() {
        assert_eq!(grown_interval(30_000, 2.5), MAX_INTERVAL_DAYS);
    }

    #[test]
    fn zero_interval_still_moves_review_forward() {
        let now = t0();
        let mut record = fresh(now);
        record.repetition_count = 2;
        record.interval_days = 0;
        let next = apply_grade(&record, grade(5), now);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.next_review_at, now + Duration::days(1));
    }
}
