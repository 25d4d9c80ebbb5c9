#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use vocab_srs::config::{DbConfig, SchedulerConfig};
use vocab_srs::services::LowestIdPicker;
use vocab_srs::{FixedClock, MemoryStore, ReviewService, ReviewStore, SqliteStore};

pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 30, 0).unwrap()
}

pub struct TestDb {
    pub store: SqliteStore,
    _dir: TempDir,
}

pub async fn sqlite_store() -> TestDb {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("vocab.db");
    let config = DbConfig {
        url: format!("sqlite:{}?mode=rwc", path.display()),
        ..DbConfig::default()
    };
    let store = SqliteStore::connect(&config)
        .await
        .expect("failed to open sqlite store");
    TestDb { store, _dir: dir }
}

pub fn service_with(store: Arc<dyn ReviewStore>, clock: Arc<FixedClock>, daily_limit: i64) -> ReviewService {
    ReviewService::new(
        store,
        SchedulerConfig {
            default_daily_new_items: daily_limit,
        },
    )
    .with_picker(Arc::new(LowestIdPicker))
    .with_clock(clock)
}

pub fn memory_service(daily_limit: i64) -> (ReviewService, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(morning()));
    let service = service_with(Arc::new(MemoryStore::new()), Arc::clone(&clock), daily_limit);
    (service, clock)
}

pub fn words(n: usize) -> Vec<(String, String)> {
    (1..=n)
        .map(|i| (format!("palabra{i}"), format!("word{i}")))
        .collect()
}
